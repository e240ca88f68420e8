//! A tree-walking interpreter for Lox: `scanner` turns source text into
//! tokens, `parser` builds statements from them, and `interpreter` executes
//! the statements against a chain of lexical scopes.

pub mod ast;
pub mod callable;
pub mod environment;
pub mod interpreter;
pub mod output;
pub mod parser;
pub mod scanner;
pub mod token;
pub mod value;

use crate::ast::Statement;
use crate::interpreter::{Interpreter, RuntimeError};
use crate::output::Output;
use crate::parser::ParseError;
use crate::scanner::ScanError;
use crate::token::Token;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoxError {
    #[error("{}", lines(.0))]
    Scan(Vec<ScanError>),
    #[error("{}", lines(.0))]
    Parse(Vec<ParseError>),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

fn lines<T: fmt::Display>(errors: &[T]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<String>>()
        .join("\n")
}

impl LoxError {
    /// Process exit status for a script that failed with this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoxError::Scan(_) | LoxError::Parse(_) => 65,
            LoxError::Runtime(RuntimeError::Output { .. }) => 74,
            LoxError::Runtime(_) => 70,
        }
    }
}

pub fn scan(source: &str) -> Result<Vec<Token>, LoxError> {
    let (tokens, errors) = scanner::scan_tokens(source);
    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(LoxError::Scan(errors))
    }
}

pub fn parse(tokens: &[Token]) -> Result<Vec<Statement>, LoxError> {
    let (statements, errors) = parser::parse(tokens);
    if errors.is_empty() {
        Ok(statements)
    } else {
        Err(LoxError::Parse(errors))
    }
}

/// One program run or one interactive session. Globals persist across calls
/// to [`Lox::run`], and a failed run leaves the session usable.
pub struct Lox {
    interpreter: Interpreter,
}

impl Lox {
    pub fn new() -> Lox {
        Lox::with_output(Output::Stdout)
    }
    pub fn with_output(output: Output) -> Lox {
        Lox {
            interpreter: Interpreter::with_output(output),
        }
    }
    /// Scans, parses and executes `source`. Nothing runs if scanning or
    /// parsing reported any error.
    pub fn run(&mut self, source: &str) -> Result<(), LoxError> {
        let tokens = scan(source)?;
        let statements = parse(&tokens)?;
        self.execute(&statements)
    }
    pub fn execute(&mut self, statements: &[Statement]) -> Result<(), LoxError> {
        Ok(self.interpreter.interpret(statements)?)
    }
    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }
    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }
}

impl Default for Lox {
    fn default() -> Self {
        Lox::new()
    }
}
