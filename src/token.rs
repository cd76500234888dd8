use std::fmt::{self, Display};

#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
}

impl Token {
    pub fn new<S: Into<String>>(kind: TokenKind, literal: S) -> Self {
        Token { kind, literal: literal.into() }
    }

    pub fn end_of_file() -> Self {
        Token { kind: TokenKind::EndOfFile, literal: String::new() }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    EndOfFile,
    Illegal,

    Identifier,
    Integer,
    Str,

    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    Less,
    Greater,
    EqualEqual,
    BangEqual,

    Comma,
    Semicolon,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,

    Let,
    Function,
    True,
    False,
    If,
    Else,
    Return,
    While,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        let s = match self {
            EndOfFile => "end of input",
            Illegal => "illegal token",
            Identifier => "identifier",
            Integer => "integer literal",
            Str => "string literal",
            Assign => "'='",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            Slash => "'/'",
            Bang => "'!'",
            Less => "'<'",
            Greater => "'>'",
            EqualEqual => "'=='",
            BangEqual => "'!='",
            Comma => "','",
            Semicolon => "';'",
            LeftParen => "'('",
            RightParen => "')'",
            LeftBrace => "'{'",
            RightBrace => "'}'",
            LeftBracket => "'['",
            RightBracket => "']'",
            Let => "'let'",
            Function => "'fn'",
            True => "'true'",
            False => "'false'",
            If => "'if'",
            Else => "'else'",
            Return => "'return'",
            While => "'while'",
        };
        write!(f, "{}", s)
    }
}
