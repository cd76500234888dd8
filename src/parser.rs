use std::rc::Rc;

use crate::{
    ast::{Block, Expression, InfixOp, PrefixOp, Program, Statement},
    lexer::Lexer,
    token::{Token, TokenKind},
};

/// Binding power ladder for Pratt expression parsing, lowest first.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

fn precedence_of(kind: TokenKind) -> Precedence {
    use TokenKind::*;
    match kind {
        EqualEqual | BangEqual => Precedence::Equals,
        Less | Greater => Precedence::LessGreater,
        Plus | Minus => Precedence::Sum,
        Star | Slash => Precedence::Product,
        LeftParen => Precedence::Call,
        LeftBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

fn infix_op(kind: TokenKind) -> Option<InfixOp> {
    use TokenKind::*;
    match kind {
        Plus => Some(InfixOp::Plus),
        Minus => Some(InfixOp::Minus),
        Star => Some(InfixOp::Star),
        Slash => Some(InfixOp::Slash),
        Less => Some(InfixOp::Less),
        Greater => Some(InfixOp::Greater),
        EqualEqual => Some(InfixOp::Equal),
        BangEqual => Some(InfixOp::NotEqual),
        _ => None,
    }
}

/// Pratt parser over a two-token window. Syntax problems are recorded in
/// `errors` and parsing presses on; `parse_program` always yields a
/// `Program`, possibly with statements missing. Callers must check the
/// error list before evaluating.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Token,
    peek: Token,
    errors: Vec<String>,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let cur = lexer.next_token();
        let peek = lexer.next_token();
        Parser { lexer, cur, peek, errors: Vec::new() }
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();

        while self.cur.kind != TokenKind::EndOfFile {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
                self.advance();
            } else {
                self.synchronise();
                // Skip the token the failed statement stalled on so the
                // scan makes progress.
                if self.cur.kind != TokenKind::EndOfFile {
                    self.advance();
                }
            }
        }

        Program { statements }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }

    fn advance(&mut self) {
        self.cur = std::mem::replace(&mut self.peek, self.lexer.next_token());
    }

    /// On a recorded error, drop tokens until the next statement boundary.
    fn synchronise(&mut self) {
        use TokenKind::*;
        while !matches!(self.cur.kind, Semicolon | RightBrace | EndOfFile) {
            self.advance();
        }
    }

    fn expect_peek(&mut self, kind: TokenKind) -> Option<()> {
        if self.peek.kind == kind {
            self.advance();
            Some(())
        } else {
            self.errors
                .push(format!("expected {}, found {}", kind, self.peek.kind));
            None
        }
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.cur.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Identifier if self.peek.kind == TokenKind::Assign => {
                self.parse_assign_statement()
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Statement> {
        self.expect_peek(TokenKind::Identifier)?;
        let name = self.cur.literal.clone();
        self.expect_peek(TokenKind::Assign)?;
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.consume_optional_semicolon();
        Some(Statement::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        if self.peek.kind == TokenKind::Semicolon {
            self.advance();
            return Some(Statement::Return { value: None });
        }
        if matches!(self.peek.kind, TokenKind::RightBrace | TokenKind::EndOfFile) {
            return Some(Statement::Return { value: None });
        }
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.consume_optional_semicolon();
        Some(Statement::Return { value: Some(value) })
    }

    fn parse_assign_statement(&mut self) -> Option<Statement> {
        let name = self.cur.literal.clone();
        self.advance(); // onto '='
        self.advance(); // onto the value expression
        let value = self.parse_expression(Precedence::Lowest)?;
        self.consume_optional_semicolon();
        Some(Statement::Assign { name, value })
    }

    fn parse_while_statement(&mut self) -> Option<Statement> {
        self.expect_peek(TokenKind::LeftParen)?;
        self.advance();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RightParen)?;
        self.expect_peek(TokenKind::LeftBrace)?;
        let body = self.parse_block();
        Some(Statement::While { condition, body })
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let expression = self.parse_expression(Precedence::Lowest)?;
        self.consume_optional_semicolon();
        Some(Statement::Expression { expression })
    }

    fn consume_optional_semicolon(&mut self) {
        if self.peek.kind == TokenKind::Semicolon {
            self.advance();
        }
    }

    /// Statements run until the closing brace; a missing `}` is a recorded
    /// error, not a halt. Expects `cur` to be the opening `{`; leaves `cur`
    /// on the closing `}` when one is present.
    fn parse_block(&mut self) -> Block {
        let mut statements = Vec::new();
        self.advance();

        while !matches!(self.cur.kind, TokenKind::RightBrace | TokenKind::EndOfFile) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
                self.advance();
            } else {
                self.synchronise();
                if self.cur.kind == TokenKind::Semicolon {
                    self.advance();
                }
            }
        }

        if self.cur.kind != TokenKind::RightBrace {
            self.errors
                .push(format!("expected {}, found {}", TokenKind::RightBrace, self.cur.kind));
        }

        Block { statements }
    }

    fn parse_expression(&mut self, min_precedence: Precedence) -> Option<Expression> {
        let mut left = self.parse_prefix()?;

        while self.peek.kind != TokenKind::Semicolon
            && min_precedence < precedence_of(self.peek.kind)
        {
            self.advance();
            left = self.parse_infix(left)?;
        }

        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expression> {
        use TokenKind::*;
        match self.cur.kind {
            Identifier => Some(Expression::Identifier(self.cur.literal.clone())),
            Integer => self.parse_integer_literal(),
            Str => Some(Expression::StringLiteral(self.cur.literal.clone())),
            True => Some(Expression::BooleanLiteral(true)),
            False => Some(Expression::BooleanLiteral(false)),
            Bang => self.parse_prefix_expression(PrefixOp::Bang),
            Minus => self.parse_prefix_expression(PrefixOp::Minus),
            LeftParen => self.parse_grouped_expression(),
            LeftBracket => self.parse_array_literal(),
            If => self.parse_if_expression(),
            Function => self.parse_function_literal(),
            kind => {
                self.errors.push(format!("no prefix parse rule for {}", kind));
                None
            }
        }
    }

    fn parse_integer_literal(&mut self) -> Option<Expression> {
        match self.cur.literal.parse::<i64>() {
            Ok(value) => Some(Expression::IntegerLiteral(value)),
            Err(_) => {
                self.errors
                    .push(format!("could not parse '{}' as an integer", self.cur.literal));
                None
            }
        }
    }

    fn parse_prefix_expression(&mut self, op: PrefixOp) -> Option<Expression> {
        self.advance();
        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Expression::Prefix { op, right: Box::new(right) })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.advance();
        let expression = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RightParen)?;
        Some(expression)
    }

    fn parse_array_literal(&mut self) -> Option<Expression> {
        let elements = self.parse_expression_list(TokenKind::RightBracket)?;
        Some(Expression::ArrayLiteral(elements))
    }

    fn parse_if_expression(&mut self) -> Option<Expression> {
        self.expect_peek(TokenKind::LeftParen)?;
        self.advance();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RightParen)?;
        self.expect_peek(TokenKind::LeftBrace)?;
        let consequence = self.parse_block();

        let alternative = if self.peek.kind == TokenKind::Else {
            self.advance();
            self.expect_peek(TokenKind::LeftBrace)?;
            Some(self.parse_block())
        } else {
            None
        };

        Some(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_function_literal(&mut self) -> Option<Expression> {
        self.expect_peek(TokenKind::LeftParen)?;
        let params = self.parse_function_params()?;
        self.expect_peek(TokenKind::LeftBrace)?;
        let body = self.parse_block();
        Some(Expression::FunctionLiteral {
            params: Rc::new(params),
            body: Rc::new(body),
        })
    }

    fn parse_function_params(&mut self) -> Option<Vec<String>> {
        let mut params = Vec::new();

        if self.peek.kind == TokenKind::RightParen {
            self.advance();
            return Some(params);
        }

        self.advance();
        params.push(self.parse_param_name()?);

        while self.peek.kind == TokenKind::Comma {
            self.advance();
            if self.peek.kind == TokenKind::RightParen {
                break; // trailing comma
            }
            self.advance();
            params.push(self.parse_param_name()?);
        }

        self.expect_peek(TokenKind::RightParen)?;
        Some(params)
    }

    fn parse_param_name(&mut self) -> Option<String> {
        if self.cur.kind != TokenKind::Identifier {
            self.errors
                .push(format!("expected {}, found {}", TokenKind::Identifier, self.cur.kind));
            return None;
        }
        let name = self.cur.literal.clone();
        if !is_valid_param_name(&name) {
            self.errors.push(format!("invalid parameter name: {}", name));
            return None;
        }
        Some(name)
    }

    fn parse_infix(&mut self, left: Expression) -> Option<Expression> {
        match self.cur.kind {
            TokenKind::LeftParen => self.parse_call_expression(left),
            TokenKind::LeftBracket => self.parse_index_expression(left),
            kind => {
                // Only tokens with a registered precedence reach here, so
                // this lookup cannot miss; record it anyway rather than fail
                // silently if the tables ever drift apart.
                let op = match infix_op(kind) {
                    Some(op) => op,
                    None => {
                        self.errors.push(format!("no infix parse rule for {}", kind));
                        return None;
                    }
                };
                let precedence = precedence_of(kind);
                self.advance();
                let right = self.parse_expression(precedence)?;
                Some(Expression::Infix {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                })
            }
        }
    }

    fn parse_call_expression(&mut self, callee: Expression) -> Option<Expression> {
        let args = self.parse_expression_list(TokenKind::RightParen)?;
        Some(Expression::Call { callee: Box::new(callee), args })
    }

    fn parse_index_expression(&mut self, left: Expression) -> Option<Expression> {
        self.advance();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RightBracket)?;
        Some(Expression::Index {
            left: Box::new(left),
            index: Box::new(index),
        })
    }

    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expression>> {
        let mut items = Vec::new();

        if self.peek.kind == end {
            self.advance();
            return Some(items);
        }

        self.advance();
        items.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek.kind == TokenKind::Comma {
            self.advance();
            if self.peek.kind == end {
                break; // trailing comma
            }
            self.advance();
            items.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(end)?;
        Some(items)
    }
}

/// Parameters are stricter than general identifiers: a leading underscore
/// is lexable but not a legal parameter name.
fn is_valid_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
