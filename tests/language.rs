use std::cell::RefCell;
use std::rc::Rc;

use sprig::token::TokenKind;
use sprig::{Environment, Object};

fn fresh_env() -> Rc<RefCell<Environment>> {
    Rc::new(RefCell::new(Environment::new()))
}

/// One-shot evaluation, the way a stateless caller would use the crate.
fn run(source: &str) -> Object {
    let (program, errors) = sprig::parse(source);
    assert!(errors.is_empty(), "parse errors: {:?}", errors);
    sprig::evaluate(&program, &fresh_env())
}

/// Evaluation against a caller-held environment, the way a session would.
fn run_in(source: &str, env: &Rc<RefCell<Environment>>) -> Object {
    let (program, errors) = sprig::parse(source);
    assert!(errors.is_empty(), "parse errors: {:?}", errors);
    sprig::evaluate(&program, env)
}

#[test]
fn tokenize_exposes_the_raw_stream() {
    let kinds: Vec<TokenKind> = sprig::tokenize("let x = 1;").map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Let,
            TokenKind::Identifier,
            TokenKind::Assign,
            TokenKind::Integer,
            TokenKind::Semicolon,
            TokenKind::EndOfFile,
        ]
    );
}

#[test]
fn parse_reports_errors_without_panicking() {
    let (_, errors) = sprig::parse("let = 5;");
    assert!(!errors.is_empty());
}

#[test]
fn a_small_program_end_to_end() {
    let result = run(
        "let fib = fn(n) {
             if (n < 2) { n } else { fib(n - 1) + fib(n - 2) }
         };
         fib(10);",
    );
    assert_eq!(result, Object::Integer(55));
}

#[test]
fn session_state_persists_across_evaluations() {
    let env = fresh_env();
    assert_eq!(run_in("let x = 10;", &env), Object::Null);
    assert_eq!(run_in("let double = fn(n) { n * 2 };", &env), Object::Null);
    assert_eq!(run_in("double(x)", &env), Object::Integer(20));
    assert_eq!(run_in("x = x + 1; x;", &env), Object::Integer(11));
}

#[test]
fn fresh_environments_are_independent() {
    let first = fresh_env();
    run_in("let x = 1;", &first);
    assert_eq!(
        run("x"),
        Object::Error("identifier not found: x".to_string())
    );
}

#[test]
fn printed_output_is_collected_per_session() {
    let env = fresh_env();
    run_in("print(\"hello \", \"world\");", &env);
    run_in("let n = 2; print(\"n = \", n);", &env);

    let output = env.borrow_mut().take_output();
    assert_eq!(output, vec!["hello world".to_string(), "n = 2".to_string()]);

    // Draining leaves the buffer ready for the next evaluation.
    run_in("print(\"again\");", &env);
    assert_eq!(env.borrow().output(), vec!["again".to_string()]);
}

#[test]
fn runtime_errors_come_back_as_values() {
    assert_eq!(
        run("let xs = [1, 2]; xs[5];"),
        Object::Error("Array index out of bounds for length 2: 5".to_string())
    );
    assert_eq!(
        run("1 / 0"),
        Object::Error("division by zero".to_string())
    );
}

#[test]
fn loops_and_builtins_compose() {
    let result = run(
        "let xs = [3, 1, 4, 1, 5];
         let i = 0; let total = 0;
         while (i < len(xs)) {
             total = total + xs[i];
             i = i + 1;
         }
         total;",
    );
    assert_eq!(result, Object::Integer(14));
}

#[test]
fn runaway_loops_are_cut_off() {
    assert_eq!(
        run("while (true) { print(\"spin\") }"),
        Object::Error("Can only perform 1000 iterations currently".to_string())
    );
}
