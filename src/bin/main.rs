use sprig::{Environment, Object};
use std::{
    cell::RefCell,
    env,
    io::{self, Write},
    rc::Rc,
};

fn main() -> io::Result<()> {
    let mut stdout = io::stdout();

    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => run_prompt()?,
        2 => run_file(args[1].as_str())?,
        _ => {
            writeln!(stdout, "Usage: sprig [script]")?;
            std::process::exit(64);
        }
    };

    Ok(())
}

fn run_file(path: &str) -> io::Result<()> {
    let contents = std::fs::read_to_string(path)?;
    let env = Rc::new(RefCell::new(Environment::new()));
    if run(contents.as_str(), &env)? {
        std::process::exit(65);
    }
    Ok(())
}

fn run_prompt() -> io::Result<()> {
    let mut buffer = String::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    writeln!(stdout, "Welcome to sprig. Type in a program, or \"exit\" to leave.")?;

    // One environment for the whole session, so bindings persist between
    // lines.
    let env = Rc::new(RefCell::new(Environment::new()));

    loop {
        write!(stdout, ">> ")?;
        stdout.flush()?;

        buffer.clear();

        let num_bytes = stdin.read_line(&mut buffer)?;
        if num_bytes == 0 || buffer.trim() == "exit" {
            break;
        }

        run(buffer.as_str(), &env)?;
    }

    Ok(())
}

/// Returns whether anything went wrong, so file mode can pick an exit code.
fn run(source: &str, env: &Rc<RefCell<Environment>>) -> io::Result<bool> {
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    let (program, errors) = sprig::parse(source);
    if !errors.is_empty() {
        for e in &errors {
            writeln!(stderr, "parse error: {}", e)?;
        }
        return Ok(true);
    }

    let result = sprig::evaluate(&program, env);

    for line in env.borrow_mut().take_output() {
        writeln!(stdout, "{}", line)?;
    }

    match result {
        Object::Null => Ok(false),
        Object::Error(message) => {
            writeln!(stderr, "Error: {}", message)?;
            Ok(true)
        }
        object => {
            writeln!(stdout, "{}", object)?;
            Ok(false)
        }
    }
}
