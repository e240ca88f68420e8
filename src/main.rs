use clap::Parser as ClapParser;
use rlox_walk::ast::AstPrinter;
use rlox_walk::interpreter::STACK_SIZE;
use rlox_walk::{Lox, LoxError};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(ClapParser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Config {
    #[clap(help = "Script to run; starts an interactive prompt when omitted")]
    pub script: Option<PathBuf>,

    #[clap(short, long, help = "Print debug log output (RUST_LOG takes precedence)")]
    pub verbose: bool,
    #[clap(long, help = "Print every token before running")]
    pub dump_tokens: bool,
    #[clap(long, help = "Print the parsed program before running")]
    pub dump_ast: bool,
}

fn main() -> ExitCode {
    let config: Config = Config::parse();
    init_tracing(config.verbose);

    // Room for MAX_CALL_DEPTH nested Lox calls.
    let worker = thread::Builder::new()
        .name("interpreter".to_string())
        .stack_size(STACK_SIZE)
        .spawn(move || match &config.script {
            Some(path) => run_file(path, &config),
            None => run_prompt(&config),
        });
    match worker.map(|handle| handle.join()) {
        Ok(Ok(code)) => code,
        Ok(Err(_)) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Could not start interpreter thread: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so they never interleave with program output.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn run_file(path: &Path, config: &Config) -> ExitCode {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("Could not read '{}': {}", path.display(), e);
            return ExitCode::from(74);
        }
    };
    let mut lox = Lox::new();
    match run(&mut lox, &contents, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run_prompt(config: &Config) -> ExitCode {
    let mut lox = Lox::new();
    let stdin = io::stdin();
    loop {
        print!("> ");
        if let Err(e) = io::stdout().flush() {
            eprintln!("{}", e);
            return ExitCode::from(74);
        }
        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => {
                debug!("end of input");
                return ExitCode::SUCCESS;
            }
            Ok(_) => {
                if let Err(e) = run(&mut lox, &line, config) {
                    eprintln!("{}", e);
                }
            }
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::from(74);
            }
        }
    }
}

fn run(lox: &mut Lox, source: &str, config: &Config) -> Result<(), LoxError> {
    let tokens = rlox_walk::scan(source)?;
    if config.dump_tokens {
        for token in &tokens {
            println!("{}", token);
        }
    }
    let statements = rlox_walk::parse(&tokens)?;
    if config.dump_ast {
        let printer = AstPrinter {};
        for stmt in &statements {
            println!("{}", printer.print_statement(stmt));
        }
    }
    lox.execute(&statements)
}
