use std::cell::RefCell;
use std::rc::Rc;

use crate::{
    ast::{Block, Expression, InfixOp, PrefixOp, Program, Statement},
    builtin::{self, Builtin},
    environment::Environment,
    object::{Function, LoopControl, Object},
};

/// Cap on condition-true iterations of a single `while` loop.
const MAX_LOOP_ITERATIONS: usize = 1000;

type Env = Rc<RefCell<Environment>>;

/// Walks a parsed program against the given scope chain. Always returns a
/// plain value or an `Error` object; the internal control-flow carriers
/// (`ReturnValue`, `LoopControl`) are flattened here and never reach a
/// caller.
pub fn evaluate(program: &Program, env: &Env) -> Object {
    match eval_program(program, env) {
        Object::ReturnValue(value) => *value,
        Object::LoopControl(_) => Object::Null,
        object => object,
    }
}

fn eval_program(program: &Program, env: &Env) -> Object {
    let mut result = Object::Null;
    for statement in &program.statements {
        result = eval_statement(statement, env);
        match result {
            Object::ReturnValue(_) | Object::Error(_) => return result,
            _ => {}
        }
    }
    result
}

fn eval_statement(statement: &Statement, env: &Env) -> Object {
    match statement {
        Statement::Let { name, value } => {
            if builtin::is_reserved(name) {
                return Object::Error(format!("cannot redefine builtin: {}", name));
            }
            let value = eval_expression(value, env);
            if value.is_error() {
                return value;
            }
            env.borrow_mut().define(name.clone(), value);
            Object::Null
        }
        Statement::Return { value } => {
            let value = match value {
                Some(expression) => {
                    let value = eval_expression(expression, env);
                    if value.is_error() {
                        return value;
                    }
                    value
                }
                None => Object::Null,
            };
            Object::ReturnValue(Box::new(value))
        }
        Statement::Assign { name, value } => {
            let value = eval_expression(value, env);
            if value.is_error() {
                return value;
            }
            if env.borrow_mut().assign(name, value) {
                Object::Null
            } else {
                Object::Error(format!("identifier not declared: {}", name))
            }
        }
        Statement::Expression { expression } => eval_expression(expression, env),
        Statement::While { condition, body } => eval_while(condition, body, env),
    }
}

/// Statements run in order; errors and control-flow carriers bubble out
/// unchanged. The block's value is its last statement's value.
fn eval_block(block: &Block, env: &Env) -> Object {
    let mut result = Object::Null;
    for statement in &block.statements {
        result = eval_statement(statement, env);
        match result {
            Object::ReturnValue(_) | Object::Error(_) | Object::LoopControl(_) => return result,
            _ => {}
        }
    }
    result
}

fn eval_expression(expression: &Expression, env: &Env) -> Object {
    match expression {
        Expression::Identifier(name) => eval_identifier(name, env),
        Expression::IntegerLiteral(value) => Object::Integer(*value),
        Expression::BooleanLiteral(value) => Object::Boolean(*value),
        Expression::StringLiteral(value) => Object::String(value.clone()),
        Expression::ArrayLiteral(elements) => match eval_expressions(elements, env) {
            Ok(elements) => Object::Array(elements),
            Err(error) => error,
        },
        Expression::Prefix { op, right } => {
            let right = eval_expression(right, env);
            if right.is_error() {
                return right;
            }
            eval_prefix(*op, right)
        }
        Expression::Infix { left, op, right } => {
            let left = eval_expression(left, env);
            if left.is_error() {
                return left;
            }
            let right = eval_expression(right, env);
            if right.is_error() {
                return right;
            }
            eval_infix(*op, left, right)
        }
        Expression::If { condition, consequence, alternative } => {
            let condition = eval_expression(condition, env);
            if condition.is_error() {
                return condition;
            }
            if is_truthy(&condition) {
                eval_block(consequence, env)
            } else if let Some(alternative) = alternative {
                eval_block(alternative, env)
            } else {
                Object::Null
            }
        }
        Expression::FunctionLiteral { params, body } => Object::Function(Function {
            params: Rc::clone(params),
            body: Rc::clone(body),
            env: Rc::clone(env),
        }),
        Expression::Call { callee, args } => {
            let callee = eval_expression(callee, env);
            if callee.is_error() {
                return callee;
            }
            let args = match eval_expressions(args, env) {
                Ok(args) => args,
                Err(error) => return error,
            };
            apply_function(callee, args, env)
        }
        Expression::Index { left, index } => {
            let left = eval_expression(left, env);
            if left.is_error() {
                return left;
            }
            let index = eval_expression(index, env);
            if index.is_error() {
                return index;
            }
            eval_index(left, index)
        }
    }
}

/// Left-to-right evaluation, collapsing to the first error.
fn eval_expressions(expressions: &[Expression], env: &Env) -> Result<Vec<Object>, Object> {
    let mut results = Vec::with_capacity(expressions.len());
    for expression in expressions {
        let value = eval_expression(expression, env);
        if value.is_error() {
            return Err(value);
        }
        results.push(value);
    }
    Ok(results)
}

fn eval_identifier(name: &str, env: &Env) -> Object {
    if let Some(value) = env.borrow().get(name) {
        return value;
    }
    if let Some(builtin) = Builtin::lookup(name) {
        return Object::Builtin(builtin);
    }
    match name {
        "break" => Object::LoopControl(LoopControl::Break),
        "continue" => Object::LoopControl(LoopControl::Continue),
        _ => Object::Error(format!("identifier not found: {}", name)),
    }
}

fn eval_prefix(op: PrefixOp, right: Object) -> Object {
    match op {
        PrefixOp::Bang => Object::Boolean(!is_truthy(&right)),
        PrefixOp::Minus => match right {
            Object::Integer(value) => match value.checked_neg() {
                Some(negated) => Object::Integer(negated),
                None => Object::Error(format!("integer overflow: -({})", value)),
            },
            other => Object::Error(format!("unknown operator: -{}", other.kind())),
        },
    }
}

fn eval_infix(op: InfixOp, left: Object, right: Object) -> Object {
    match (left, right) {
        (Object::Integer(left), Object::Integer(right)) => eval_integer_infix(op, left, right),
        (Object::Boolean(left), Object::Boolean(right)) => match op {
            InfixOp::Equal => Object::Boolean(left == right),
            InfixOp::NotEqual => Object::Boolean(left != right),
            op => Object::Error(format!("unknown operator: BOOLEAN {} BOOLEAN", op)),
        },
        // `+` concatenates whenever either side is a string; the other side
        // contributes its display form. No other operator coerces.
        (Object::String(left), right) if op == InfixOp::Plus => {
            Object::String(format!("{}{}", left, right))
        }
        (left, Object::String(right)) if op == InfixOp::Plus => {
            Object::String(format!("{}{}", left, right))
        }
        (left, right) => {
            if left.kind() != right.kind() {
                Object::Error(format!("type mismatch: {} {} {}", left.kind(), op, right.kind()))
            } else {
                Object::Error(format!(
                    "unknown operator: {} {} {}",
                    left.kind(),
                    op,
                    right.kind()
                ))
            }
        }
    }
}

/// Arithmetic is checked: anything outside i64 comes back as an error
/// object, never a panic.
fn eval_integer_infix(op: InfixOp, left: i64, right: i64) -> Object {
    let result = match op {
        InfixOp::Plus => left.checked_add(right),
        InfixOp::Minus => left.checked_sub(right),
        InfixOp::Star => left.checked_mul(right),
        InfixOp::Slash => {
            if right == 0 {
                return Object::Error("division by zero".to_string());
            }
            floor_div(left, right)
        }
        InfixOp::Less => return Object::Boolean(left < right),
        InfixOp::Greater => return Object::Boolean(left > right),
        InfixOp::Equal => return Object::Boolean(left == right),
        InfixOp::NotEqual => return Object::Boolean(left != right),
    };
    match result {
        Some(value) => Object::Integer(value),
        None => Object::Error(format!("integer overflow: {} {} {}", left, op, right)),
    }
}

/// Division rounding toward negative infinity. `None` on `i64::MIN / -1`,
/// the one quotient that does not fit.
fn floor_div(left: i64, right: i64) -> Option<i64> {
    let quotient = left.checked_div(right)?;
    if left % right != 0 && (left < 0) != (right < 0) {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

fn eval_while(condition: &Expression, body: &Block, env: &Env) -> Object {
    let mut iterations = 0;
    loop {
        let cond = eval_expression(condition, env);
        if cond.is_error() {
            return cond;
        }
        if !is_truthy(&cond) {
            return Object::Null;
        }

        iterations += 1;
        if iterations > MAX_LOOP_ITERATIONS {
            return Object::Error(format!(
                "Can only perform {} iterations currently",
                MAX_LOOP_ITERATIONS
            ));
        }

        for statement in &body.statements {
            match eval_statement(statement, env) {
                error @ Object::Error(_) => return error,
                Object::ReturnValue(_) => {
                    return Object::Error(
                        "cannot have a return statement inside a while function".to_string(),
                    )
                }
                Object::LoopControl(LoopControl::Break) => return Object::Null,
                Object::LoopControl(LoopControl::Continue) => break,
                _ => {}
            }
        }
    }
}

fn apply_function(callee: Object, args: Vec<Object>, env: &Env) -> Object {
    match callee {
        Object::Function(function) => {
            if args.len() != function.params.len() {
                return Object::Error(format!(
                    "expected {} arguments but got {}",
                    function.params.len(),
                    args.len()
                ));
            }
            let mut scope = Environment::new_enclosed(&function.env);
            for (param, arg) in function.params.iter().zip(args) {
                scope.define(param.clone(), arg);
            }
            let scope = Rc::new(RefCell::new(scope));
            match eval_block(&function.body, &scope) {
                Object::ReturnValue(value) => *value,
                object => object,
            }
        }
        Object::Builtin(builtin) => builtin.apply(&args, env),
        other => Object::Error(format!("not a function: {}", other.kind())),
    }
}

fn eval_index(left: Object, index: Object) -> Object {
    match (left, index) {
        (Object::Array(elements), Object::Integer(index)) => {
            if index < 0 || index as usize >= elements.len() {
                Object::Error(format!(
                    "Array index out of bounds for length {}: {}",
                    elements.len(),
                    index
                ))
            } else {
                elements[index as usize].clone()
            }
        }
        (Object::Array(_), other) => Object::Error(format!(
            "cannot index ARRAY with non-integer types, got {}",
            other.kind()
        )),
        (other, _) => Object::Error(format!("{} cannot be subscripted", other.kind())),
    }
}

/// One truthiness rule shared by `!`, `if` and `while`: booleans are
/// themselves, integers are truthy only when strictly positive, NULL is
/// falsy, everything else is truthy.
fn is_truthy(object: &Object) -> bool {
    match object {
        Object::Boolean(value) => *value,
        Object::Integer(value) => *value > 0,
        Object::Null => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn eval_input(input: &str) -> Object {
        let mut parser = Parser::new(Lexer::new(input));
        let program = parser.parse_program();
        assert_eq!(parser.errors(), &[] as &[String], "parse errors for {:?}", input);
        let env = Rc::new(RefCell::new(Environment::new()));
        evaluate(&program, &env)
    }

    fn assert_integer(input: &str, expected: i64) {
        assert_eq!(eval_input(input), Object::Integer(expected), "input: {}", input);
    }

    fn assert_boolean(input: &str, expected: bool) {
        assert_eq!(eval_input(input), Object::Boolean(expected), "input: {}", input);
    }

    fn assert_error(input: &str, message: &str) {
        assert_eq!(
            eval_input(input),
            Object::Error(message.to_string()),
            "input: {}",
            input
        );
    }

    #[test]
    fn integer_arithmetic() {
        assert_integer("5", 5);
        assert_integer("-10", -10);
        assert_integer("5 + 5 * 2", 15);
        assert_integer("50 / 2 * 2 + 10", 60);
        assert_integer("2 * (5 + 10)", 30);
        assert_integer("(5 + 10 * 2 + 15 / 3) * 2 + -10", 50);
    }

    #[test]
    fn division_rounds_toward_negative_infinity() {
        assert_integer("7 / 2", 3);
        assert_integer("-7 / 2", -4);
        assert_integer("7 / -2", -4);
        assert_integer("-7 / -2", 3);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_error("5 / 0", "division by zero");
    }

    #[test]
    fn arithmetic_overflow_is_an_error() {
        assert_error(
            "9223372036854775807 + 1",
            "integer overflow: 9223372036854775807 + 1",
        );
        assert_error(
            "let max = 9223372036854775807; max * 2;",
            "integer overflow: 9223372036854775807 * 2",
        );
        assert_error(
            "let min = 0 - 9223372036854775807 - 1; min - 1;",
            "integer overflow: -9223372036854775808 - 1",
        );
    }

    #[test]
    fn dividing_the_minimum_by_negative_one_is_an_error() {
        // The one quotient outside i64; `/` must not panic on it.
        assert_error(
            "let min = 0 - 9223372036854775807 - 1; min / -1;",
            "integer overflow: -9223372036854775808 / -1",
        );
    }

    #[test]
    fn negating_the_minimum_is_an_error() {
        assert_error(
            "let min = 0 - 9223372036854775807 - 1; -min;",
            "integer overflow: -(-9223372036854775808)",
        );
    }

    #[test]
    fn boolean_operators() {
        assert_boolean("true", true);
        assert_boolean("1 < 2", true);
        assert_boolean("1 > 2", false);
        assert_boolean("1 == 1", true);
        assert_boolean("1 != 1", false);
        assert_boolean("true == true", true);
        assert_boolean("true != false", true);
        assert_boolean("(1 < 2) == true", true);
    }

    #[test]
    fn bang_uses_positive_integer_truthiness() {
        assert_boolean("!true", false);
        assert_boolean("!false", true);
        assert_boolean("!5", false);
        assert_boolean("!0", true);
        assert_boolean("!(-1)", true);
        assert_boolean("!!5", true);
        assert_boolean("!!0", false);
    }

    #[test]
    fn if_conditions_share_the_truthiness_rule() {
        assert_integer("if (5) { 10 }", 10);
        assert_integer("if (0) { 10 } else { 20 }", 20);
        assert_integer("if (-3) { 10 } else { 20 }", 20);
        assert_integer("if (1 < 2) { 10 } else { 20 }", 10);
        assert_eq!(eval_input("if (false) { 10 }"), Object::Null);
    }

    #[test]
    fn strings_and_concatenation() {
        assert_eq!(eval_input("\"hello\""), Object::String("hello".into()));
        assert_eq!(
            eval_input("\"Hello\" + \" \" + \"World\""),
            Object::String("Hello World".into())
        );
        // Either side being a string coerces the other to its display form.
        assert_eq!(eval_input("\"a\" + 1"), Object::String("a1".into()));
        assert_eq!(eval_input("1 + \"a\""), Object::String("1a".into()));
        assert_eq!(eval_input("\"is \" + true"), Object::String("is true".into()));
    }

    #[test]
    fn non_plus_string_operators_are_unknown() {
        assert_error("\"a\" - \"b\"", "unknown operator: STRING - STRING");
        assert_error("\"a\" == \"a\"", "unknown operator: STRING == STRING");
    }

    #[test]
    fn mixed_kind_operations_are_type_mismatches() {
        assert_error("5 + true", "type mismatch: INTEGER + BOOLEAN");
        assert_error("5 + true; 5;", "type mismatch: INTEGER + BOOLEAN");
        assert_error("true < false", "unknown operator: BOOLEAN < BOOLEAN");
        assert_error("-true", "unknown operator: -BOOLEAN");
    }

    #[test]
    fn let_and_identifier_lookup() {
        assert_integer("let a = 5; a;", 5);
        assert_integer("let a = 5 * 5; a;", 25);
        assert_integer("let a = 5; let b = a; b;", 5);
        assert_integer("let a = 5; let b = a; let c = a + b + 5; c;", 15);
        assert_error("foobar", "identifier not found: foobar");
    }

    #[test]
    fn let_may_not_shadow_builtins() {
        assert_error("let len = 5;", "cannot redefine builtin: len");
        assert_error("let print = fn(x) { x };", "cannot redefine builtin: print");
        assert_error("let break = 1;", "cannot redefine builtin: break");
    }

    #[test]
    fn assignment_rewrites_existing_bindings() {
        assert_integer("let x = 1; x = 2; x;", 2);
        assert_integer(
            "let x = 1; let bump = fn() { x = x + 1; }; bump(); bump(); x;",
            3,
        );
        assert_error("y = 3;", "identifier not declared: y");
    }

    #[test]
    fn return_statements() {
        assert_integer("return 10;", 10);
        assert_integer("return 10; 9;", 10);
        assert_integer("return 2 * 5; 9;", 10);
        assert_integer("9; return 2 * 5; 9;", 10);
        assert_eq!(eval_input("return;"), Object::Null);
        assert_integer(
            "if (10 > 1) { if (10 > 1) { return 10; } return 1; }",
            10,
        );
    }

    #[test]
    fn functions_and_calls() {
        assert_integer("let identity = fn(x) { x; }; identity(5);", 5);
        assert_integer("let identity = fn(x) { return x; }; identity(5);", 5);
        assert_integer("let double = fn(x) { x * 2; }; double(5);", 10);
        assert_integer("let add = fn(x, y) { x + y; }; add(5, 5);", 10);
        assert_integer("let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));", 20);
        assert_integer("fn(x) { x; }(5)", 5);
    }

    #[test]
    fn call_arity_is_exact() {
        assert_error("let f = fn(x) { x; }; f();", "expected 1 arguments but got 0");
        assert_error("let f = fn(x) { x; }; f(1, 2);", "expected 1 arguments but got 2");
    }

    #[test]
    fn calling_a_non_function_fails() {
        assert_error("5(3);", "not a function: INTEGER");
        assert_error("let x = true; x();", "not a function: BOOLEAN");
    }

    #[test]
    fn closures_capture_their_defining_scope() {
        assert_integer(
            "let adder = fn(x) { fn(y) { x + y; } }; let add2 = adder(2); add2(3);",
            5,
        );
    }

    #[test]
    fn closures_see_bindings_added_after_capture() {
        assert_integer("let f = fn() { x; }; let x = 5; f();", 5);
    }

    #[test]
    fn closures_share_mutable_captured_state() {
        assert_integer(
            "let make = fn() { let n = 0; fn() { n = n + 1; n; }; };
             let counter = make();
             counter(); counter(); counter();",
            3,
        );
    }

    #[test]
    fn recursion_through_the_environment() {
        assert_integer(
            "let fact = fn(n) { if (n < 2) { 1 } else { n * fact(n - 1) } }; fact(5);",
            120,
        );
    }

    #[test]
    fn first_error_in_an_argument_list_wins() {
        assert_error("len(5 + true)", "type mismatch: INTEGER + BOOLEAN");
        assert_error(
            "let f = fn(a, b) { a; }; f(1, -false);",
            "unknown operator: -BOOLEAN",
        );
    }

    #[test]
    fn array_literals_and_indexing() {
        assert_eq!(
            eval_input("[1, 2 * 2, 3 + 3]"),
            Object::Array(vec![
                Object::Integer(1),
                Object::Integer(4),
                Object::Integer(6),
            ])
        );
        assert_integer("[1, 2, 3][0]", 1);
        assert_integer("let arr = [1, 2, 3]; arr[1];", 2);
        assert_integer("let arr = [1, 2, 3]; arr[1 + 1];", 3);
        assert_integer("let arr = [1, 2, 3]; arr[0] + arr[1] + arr[2];", 6);
    }

    #[test]
    fn index_bounds_are_checked() {
        assert_error(
            "let arr = [1, 2, 3]; arr[3];",
            "Array index out of bounds for length 3: 3",
        );
        assert_error(
            "let arr = [1, 2, 3]; arr[-1];",
            "Array index out of bounds for length 3: -1",
        );
    }

    #[test]
    fn only_arrays_take_integer_indices() {
        assert_error("5[0]", "INTEGER cannot be subscripted");
        assert_error("[1][true]", "cannot index ARRAY with non-integer types, got BOOLEAN");
    }

    #[test]
    fn builtin_len_through_the_evaluator() {
        assert_integer("len(\"hello\")", 5);
        assert_integer("len(\"\")", 0);
        assert_integer("len([1, 2, 3])", 3);
        assert_error("len(1)", "argument to `len` not supported, got INTEGER");
        assert_error(
            "len(\"a\", \"b\")",
            "wrong number of arguments to `len`: expected 1, got 2",
        );
    }

    #[test]
    fn while_loops_run_until_falsy() {
        assert_integer(
            "let i = 0; let total = 0;
             while (i < 5) { total = total + i; i = i + 1; }
             total;",
            10,
        );
    }

    #[test]
    fn while_condition_errors_propagate() {
        assert_error("while (1 + true) { }", "type mismatch: INTEGER + BOOLEAN");
    }

    #[test]
    fn break_terminates_the_loop() {
        assert_integer(
            "let i = 0;
             while (true) { i = i + 1; if (i > 3) { break; } }
             i;",
            4,
        );
    }

    #[test]
    fn continue_skips_to_the_next_iteration() {
        assert_integer(
            "let i = 0; let total = 0;
             while (i < 10) {
                 i = i + 1;
                 if (i > 5) { continue; }
                 total = total + i;
             }
             total;",
            15,
        );
    }

    #[test]
    fn loop_iterations_are_bounded() {
        assert_error(
            "while (true) { }",
            "Can only perform 1000 iterations currently",
        );
        assert_error(
            "let i = 0; while (true) { i = i + 1; }",
            "Can only perform 1000 iterations currently",
        );
    }

    #[test]
    fn exactly_the_cap_is_allowed() {
        assert_integer(
            "let i = 0; while (i < 1000) { i = i + 1; } i;",
            1000,
        );
    }

    #[test]
    fn return_inside_a_while_body_is_rejected() {
        assert_error(
            "while (true) { return 5; }",
            "cannot have a return statement inside a while function",
        );
        assert_error(
            "while (true) { if (true) { return 5; } }",
            "cannot have a return statement inside a while function",
        );
    }

    #[test]
    fn loop_sentinels_are_inert_outside_loops() {
        assert_eq!(eval_input("break;"), Object::Null);
        assert_eq!(eval_input("continue;"), Object::Null);
    }

    #[test]
    fn print_appends_to_the_session_buffer() {
        let mut parser = Parser::new(Lexer::new(
            "print(\"x = \", 1 + 2); print(\"done\");",
        ));
        let program = parser.parse_program();
        assert_eq!(parser.errors(), &[] as &[String]);
        let env = Rc::new(RefCell::new(Environment::new()));
        assert_eq!(evaluate(&program, &env), Object::Null);
        assert_eq!(
            env.borrow().output(),
            vec!["x = 3".to_string(), "done".to_string()]
        );
    }

    #[test]
    fn print_is_capped_per_evaluation() {
        // Two prints per iteration hit the 1000-entry cap on iteration 501,
        // well before the loop bound.
        let result = eval_input(
            "let i = 0;
             while (i < 600) { print(i); print(i); i = i + 1; }",
        );
        assert_eq!(
            result,
            Object::Error("Cannot print more than 1000 statements currently.".to_string())
        );
    }

    #[test]
    fn output_survives_up_to_the_failure() {
        let mut parser = Parser::new(Lexer::new("print(\"before\"); 1 + true;"));
        let program = parser.parse_program();
        assert_eq!(parser.errors(), &[] as &[String]);
        let env = Rc::new(RefCell::new(Environment::new()));
        let result = evaluate(&program, &env);
        assert!(result.is_error());
        assert_eq!(env.borrow().output(), vec!["before".to_string()]);
    }

    #[test]
    fn builtins_resolve_as_values_but_env_wins() {
        assert_eq!(
            eval_input("len"),
            Object::Builtin(Builtin::Len)
        );
        // A parameter named like nothing reserved shadows nothing; env
        // lookup still runs first.
        assert_integer("let f = fn(n) { len(n) }; f(\"abc\");", 3);
    }
}
