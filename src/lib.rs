pub mod ast;
pub mod builtin;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod token;

pub use crate::environment::Environment;
pub use crate::lexer::Lexer;
pub use crate::object::Object;
pub use crate::parser::Parser;

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::Program;

/// A token stream over the source. The lexer never fails; unknown input
/// comes back as `Illegal` tokens.
pub fn tokenize(source: &str) -> Lexer<'_> {
    Lexer::new(source)
}

/// Parses the whole source, recovering at statement boundaries. Any
/// collected errors mean the program should not be evaluated.
pub fn parse(source: &str) -> (Program, Vec<String>) {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    let errors = parser.into_errors();
    (program, errors)
}

/// Runs a parsed program against the given scope chain. Reusing one
/// environment across calls gives session semantics; a fresh environment
/// per call gives one-shot semantics.
pub fn evaluate(program: &Program, env: &Rc<RefCell<Environment>>) -> Object {
    evaluator::evaluate(program, env)
}
