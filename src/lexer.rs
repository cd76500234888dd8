use crate::token::{Token, TokenKind};
use peekmore::{PeekMore, PeekMoreIterator};
use phf::phf_map;
use std::str::Chars;

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "let" => TokenKind::Let,
    "fn" => TokenKind::Function,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "return" => TokenKind::Return,
    "while" => TokenKind::While,
};

/// Turns source text into tokens. Never fails: anything the token grammar
/// does not recognize comes out as an `Illegal` token for the parser to
/// report.
pub struct Lexer<'a> {
    src: PeekMoreIterator<Chars<'a>>,
    reached_end: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.chars().peekmore(),
            reached_end: false,
        }
    }

    /// Produces the next token, or `EndOfFile` forever once the input is
    /// exhausted.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.src.next() {
            Some(c) => c,
            None => return Token::end_of_file(),
        };

        use TokenKind::*;
        match c {
            '+' => Token::new(Plus, "+"),
            '-' => Token::new(Minus, "-"),
            '*' => Token::new(Star, "*"),
            '/' => Token::new(Slash, "/"),
            '<' => Token::new(Less, "<"),
            '>' => Token::new(Greater, ">"),
            ',' => Token::new(Comma, ","),
            ';' => Token::new(Semicolon, ";"),
            '(' => Token::new(LeftParen, "("),
            ')' => Token::new(RightParen, ")"),
            '{' => Token::new(LeftBrace, "{"),
            '}' => Token::new(RightBrace, "}"),
            '[' => Token::new(LeftBracket, "["),
            ']' => Token::new(RightBracket, "]"),
            '=' => {
                if self.does_next_match('=') {
                    Token::new(EqualEqual, "==")
                } else {
                    Token::new(Assign, "=")
                }
            }
            '!' => {
                if self.does_next_match('=') {
                    Token::new(BangEqual, "!=")
                } else {
                    Token::new(Bang, "!")
                }
            }
            '"' => self.extract_string(),
            c if can_start_identifier(&c) => self.extract_identifier(c),
            c if c.is_ascii_digit() => self.extract_integer(c),
            c => Token::new(Illegal, c.to_string()),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.src.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.src.next();
                }
                _ => break,
            }
        }
    }

    fn does_next_match(&mut self, expected: char) -> bool {
        match self.src.peek() {
            Some(&c) if c == expected => {
                self.src.next();
                true
            }
            _ => false,
        }
    }

    fn extract_string(&mut self) -> Token {
        let mut literal = String::new();
        loop {
            match self.src.next() {
                Some('"') => return Token::new(TokenKind::Str, literal),
                Some(c) => literal.push(c),
                // Unterminated literal: hand the consumed text to the parser
                // as an illegal token.
                None => return Token::new(TokenKind::Illegal, literal),
            }
        }
    }

    fn extract_identifier(&mut self, first: char) -> Token {
        let literal = self.extract_run(first, is_part_of_identifier);
        match KEYWORDS.get(literal.as_str()) {
            Some(&kind) => Token::new(kind, literal),
            None => Token::new(TokenKind::Identifier, literal),
        }
    }

    fn extract_integer(&mut self, first: char) -> Token {
        let literal = self.extract_run(first, |c| c.is_ascii_digit());
        Token::new(TokenKind::Integer, literal)
    }

    fn extract_run(&mut self, first: char, keep_going: impl Fn(&char) -> bool) -> String {
        let mut literal = String::new();
        literal.push(first);
        while let Some(c) = self.src.peek() {
            if !keep_going(c) {
                break;
            }
            literal.push(*c);
            self.src.next();
        }
        literal
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    /// Emits the `EndOfFile` token exactly once, then `None`, so the stream
    /// can be collected for a token dump.
    fn next(&mut self) -> Option<Token> {
        if self.reached_end {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::EndOfFile {
            self.reached_end = true;
        }
        Some(token)
    }
}

fn can_start_identifier(c: &char) -> bool {
    c.is_ascii_alphabetic() || c == &'_'
}

fn is_part_of_identifier(c: &char) -> bool {
    can_start_identifier(c) || c.is_ascii_digit()
}
