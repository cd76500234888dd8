use std::fmt::{self, Display};
use std::rc::Rc;

/// Root of one parse. Owned by the caller that produced it; closures keep
/// the function-literal subtrees they capture alive through `Rc`, not
/// through the program.
#[derive(Debug, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    Let { name: String, value: Expression },
    Return { value: Option<Expression> },
    Expression { expression: Expression },
    Assign { name: String, value: Expression },
    While { condition: Expression, body: Block },
}

/// Brace-delimited statement list. Only ever a child of `if`, `while` and
/// function literals; the surface grammar has no free-standing block
/// statement.
#[derive(Debug, PartialEq, Clone)]
pub struct Block {
    pub statements: Vec<Statement>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Identifier(String),
    IntegerLiteral(i64),
    BooleanLiteral(bool),
    StringLiteral(String),
    ArrayLiteral(Vec<Expression>),
    Prefix {
        op: PrefixOp,
        right: Box<Expression>,
    },
    Infix {
        left: Box<Expression>,
        op: InfixOp,
        right: Box<Expression>,
    },
    If {
        condition: Box<Expression>,
        consequence: Block,
        alternative: Option<Block>,
    },
    // Parameter list and body are shared, never mutated, by every closure
    // created from this literal.
    FunctionLiteral {
        params: Rc<Vec<String>>,
        body: Rc<Block>,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },
    Index {
        left: Box<Expression>,
        index: Box<Expression>,
    },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PrefixOp {
    Bang,
    Minus,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InfixOp {
    Plus,
    Minus,
    Star,
    Slash,
    Less,
    Greater,
    Equal,
    NotEqual,
}

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{}", statement)?;
        }
        Ok(())
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let { name, value } => write!(f, "let {} = {};", name, value),
            Statement::Return { value: Some(value) } => write!(f, "return {};", value),
            Statement::Return { value: None } => write!(f, "return;"),
            Statement::Expression { expression } => write!(f, "{}", expression),
            Statement::Assign { name, value } => write!(f, "{} = {};", name, value),
            Statement::While { condition, body } => {
                write!(f, "while ({}) {{ {} }}", condition, body)
            }
        }
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for statement in &self.statements {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", statement)?;
            first = false;
        }
        Ok(())
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::IntegerLiteral(value) => write!(f, "{}", value),
            Expression::BooleanLiteral(value) => write!(f, "{}", value),
            Expression::StringLiteral(value) => write!(f, "\"{}\"", value),
            Expression::ArrayLiteral(elements) => {
                write!(f, "[{}]", join(elements))
            }
            Expression::Prefix { op, right } => write!(f, "({}{})", op, right),
            Expression::Infix { left, op, right } => {
                write!(f, "({} {} {})", left, op, right)
            }
            Expression::If { condition, consequence, alternative } => {
                write!(f, "if ({}) {{ {} }}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " else {{ {} }}", alternative)?;
                }
                Ok(())
            }
            Expression::FunctionLiteral { params, body } => {
                write!(f, "fn({}) {{ {} }}", params.join(", "), body)
            }
            Expression::Call { callee, args } => {
                write!(f, "{}({})", callee, join(args))
            }
            Expression::Index { left, index } => write!(f, "({}[{}])", left, index),
        }
    }
}

fn join<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOp::Bang => write!(f, "!"),
            PrefixOp::Minus => write!(f, "-"),
        }
    }
}

impl Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InfixOp::Plus => "+",
            InfixOp::Minus => "-",
            InfixOp::Star => "*",
            InfixOp::Slash => "/",
            InfixOp::Less => "<",
            InfixOp::Greater => ">",
            InfixOp::Equal => "==",
            InfixOp::NotEqual => "!=",
        };
        write!(f, "{}", s)
    }
}
