use std::cell::RefCell;
use std::fmt::{self, Debug, Display};
use std::rc::Rc;

use crate::ast::Block;
use crate::builtin::Builtin;
use crate::environment::Environment;

/// Runtime value. `ReturnValue` and `LoopControl` are the evaluator's
/// control-flow carriers; the public `evaluate` entry point flattens them
/// before a result ever reaches a collaborator.
#[derive(Debug, PartialEq, Clone)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    String(String),
    Array(Vec<Object>),
    Null,
    Function(Function),
    Builtin(Builtin),
    Error(String),
    ReturnValue(Box<Object>),
    LoopControl(LoopControl),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LoopControl {
    Break,
    Continue,
}

impl Object {
    pub fn kind(&self) -> &'static str {
        use Object::*;
        match self {
            Integer(_) => "INTEGER",
            Boolean(_) => "BOOLEAN",
            String(_) => "STRING",
            Array(_) => "ARRAY",
            Null => "NULL",
            Function(_) => "FUNCTION",
            Builtin(_) => "BUILTIN",
            Error(_) => "ERROR",
            ReturnValue(_) => "RETURN_VALUE",
            LoopControl(_) => "LOOP_CONTROL",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Object::Error(_))
    }
}

impl Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Object::*;
        match self {
            Integer(value) => write!(f, "{}", value),
            Boolean(value) => write!(f, "{}", value),
            String(value) => write!(f, "{}", value),
            Array(elements) => {
                let rendered: Vec<std::string::String> =
                    elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Null => write!(f, "NULL"),
            Function(function) => write!(f, "{}", function),
            Builtin(builtin) => write!(f, "builtin function {}", builtin.name()),
            Error(message) => write!(f, "Error: {}", message),
            ReturnValue(value) => write!(f, "{}", value),
            LoopControl(control) => match control {
                self::LoopControl::Break => write!(f, "break"),
                self::LoopControl::Continue => write!(f, "continue"),
            },
        }
    }
}

/// A user-defined function: shared parameter list and body from the AST
/// literal, plus the environment captured at the definition site. The
/// capture is by reference, so bindings added to that scope after the
/// closure is made stay visible to it.
#[derive(Clone)]
pub struct Function {
    pub params: Rc<Vec<String>>,
    pub body: Rc<Block>,
    pub env: Rc<RefCell<Environment>>,
}

impl PartialEq for Function {
    // Identity, not structure: two closures are the same function only if
    // they share one literal and one captured scope.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body) && Rc::ptr_eq(&self.env, &other.env)
    }
}

impl Debug for Function {
    // The captured environment is skipped: closure chains can be long and
    // may hold this very function.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("params", &self.params)
            .field("body", &self.body)
            .finish()
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn({}) {{ {} }}", self.params.join(", "), self.body)
    }
}
