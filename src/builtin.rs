use std::cell::RefCell;
use std::rc::Rc;

use crate::environment::{Environment, MAX_PRINTED_LINES};
use crate::object::Object;

/// Names the evaluator resolves outside the environment chain. `let` may
/// not rebind any of them.
pub const RESERVED_NAMES: &[&str] = &["len", "print", "break", "continue"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// The fixed builtin table. Process-wide, read-only configuration: there is
/// no way to add to or replace entries at runtime.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Builtin {
    Len,
    Print,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Builtin> {
        match name {
            "len" => Some(Builtin::Len),
            "print" => Some(Builtin::Print),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Print => "print",
        }
    }

    pub fn apply(&self, args: &[Object], env: &Rc<RefCell<Environment>>) -> Object {
        match self {
            Builtin::Len => len(args),
            Builtin::Print => print(args, env),
        }
    }
}

fn len(args: &[Object]) -> Object {
    if args.len() != 1 {
        return Object::Error(format!(
            "wrong number of arguments to `len`: expected 1, got {}",
            args.len()
        ));
    }
    match &args[0] {
        Object::String(value) => Object::Integer(value.chars().count() as i64),
        Object::Array(elements) => Object::Integer(elements.len() as i64),
        other => Object::Error(format!("argument to `len` not supported, got {}", other.kind())),
    }
}

/// Concatenates the display forms of all arguments into one buffered line.
fn print(args: &[Object], env: &Rc<RefCell<Environment>>) -> Object {
    let line: String = args.iter().map(|a| a.to_string()).collect();
    match env.borrow_mut().push_output(line) {
        Ok(()) => Object::Null,
        Err(_) => Object::Error(format!(
            "Cannot print more than {} statements currently.",
            MAX_PRINTED_LINES
        )),
    }
}
