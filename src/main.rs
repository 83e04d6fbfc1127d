use jlox::config::LoxConfig;
use jlox::{repl, Interpreter};
use std::io::stdout;

fn main() {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let trace = if let Some(pos) = args.iter().position(|a| a == "--trace") {
        args.remove(pos);
        true
    } else {
        false
    };
    let config = LoxConfig::new(trace);
    if trace {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
            .with_writer(std::io::stderr)
            .init();
    }

    let result = if args.is_empty() {
        repl(config)
    } else if args[0] == "-e" {
        let source = args[1..].join(" ");
        let mut interpreter = Interpreter::new();
        run_source(&mut interpreter, &source, config)
    } else if args.len() == 1 {
        match std::fs::read_to_string(&args[0]) {
            Ok(source) => {
                let mut interpreter = Interpreter::new();
                run_source(&mut interpreter, &source, config)
            }
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(66);
            }
        }
    } else {
        eprintln!("Usage: lox [--trace] [script | -e <text>]");
        std::process::exit(64);
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(66);
    }
}

fn run_source(interpreter: &mut Interpreter, source: &str, config: LoxConfig) -> std::io::Result<()> {
    let mut out = stdout();
    let mut ctx = jlox::context::LoxContext::new(&mut out, config);
    // Errors are already reported to the shared sink by `execute_source`;
    // a script always exits 0, per the external-interface contract.
    let _ = interpreter.execute_source(source, &mut ctx);
    Ok(())
}
