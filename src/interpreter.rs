use crate::ast::{Expression, Statement};
use crate::callable::{Callable, LoxFunction, NativeFunction};
use crate::environment::Environment;
use crate::output::Output;
use crate::token::{Token, TokenType};
use crate::value::Value;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

/// Deepest nesting of Lox calls before a call fails with `StackOverflow`.
pub const MAX_CALL_DEPTH: usize = 1000;

/// Native stack for a thread running the interpreter, sized so that
/// `MAX_CALL_DEPTH` is reached before the thread's stack is exhausted.
pub const STACK_SIZE: usize = 128 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("[line {line}] Error at '{name}': Undefined variable '{name}'.")]
    UndefinedVariable { name: String, line: usize },
    #[error("[line {line}] Error at '{lexeme}': {message}")]
    TypeMismatch {
        lexeme: String,
        line: usize,
        message: String,
    },
    #[error("[line {line}] Error at ')': Can only call functions.")]
    NotCallable { line: usize },
    #[error("[line {line}] Error at ')': Expected {expected} arguments but got {got}.")]
    ArityMismatch {
        expected: usize,
        got: usize,
        line: usize,
    },
    #[error("[line {line}] Error at ')': Stack overflow.")]
    StackOverflow { line: usize },
    #[error("Error: could not write output: {message}")]
    Output { message: String },
}

impl RuntimeError {
    pub fn undefined_variable(name: &Token) -> RuntimeError {
        RuntimeError::UndefinedVariable {
            name: name.lexeme.clone(),
            line: name.line,
        }
    }
    fn type_mismatch(operator: &Token, message: &str) -> RuntimeError {
        RuntimeError::TypeMismatch {
            lexeme: operator.lexeme.clone(),
            line: operator.line,
            message: message.to_string(),
        }
    }
    /// Source line the error points at. Output failures have none.
    pub fn line(&self) -> Option<usize> {
        match self {
            RuntimeError::UndefinedVariable { line, .. }
            | RuntimeError::TypeMismatch { line, .. }
            | RuntimeError::NotCallable { line }
            | RuntimeError::ArityMismatch { line, .. }
            | RuntimeError::StackOverflow { line } => Some(*line),
            RuntimeError::Output { .. } => None,
        }
    }
}

/// Why execution of a statement stopped early: a runtime error, or a
/// `return` travelling out to the enclosing call.
#[derive(Debug)]
pub(crate) enum Unwind {
    Error(RuntimeError),
    Return(Value),
}

impl From<RuntimeError> for Unwind {
    fn from(e: RuntimeError) -> Self {
        Unwind::Error(e)
    }
}

/// Tree-walking evaluator. Owns the global scope and tracks the scope that is
/// current while a statement runs; state persists across `interpret` calls.
pub struct Interpreter {
    globals: Environment,
    environment: Environment,
    output: Output,
    call_depth: usize,
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter::with_output(Output::Stdout)
    }
    pub fn with_output(output: Output) -> Interpreter {
        let globals = Environment::new();
        globals.define("clock", Value::Callable(Callable::Native(NativeFunction::clock())));
        Interpreter {
            environment: globals.clone(),
            globals,
            output,
            call_depth: 0,
        }
    }
    pub fn globals(&self) -> &Environment {
        &self.globals
    }
    pub fn output(&self) -> &Output {
        &self.output
    }
    pub fn output_mut(&mut self) -> &mut Output {
        &mut self.output
    }
    /// Runs `statements` in order, stopping at the first runtime error.
    /// Bindings made by statements that completed before the error are kept.
    pub fn interpret(&mut self, statements: &[Statement]) -> Result<(), RuntimeError> {
        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => (),
                Err(Unwind::Error(e)) => {
                    debug!(error = %e, "runtime error");
                    return Err(e);
                }
                // The parser rejects top-level `return`.
                Err(Unwind::Return(_)) => (),
            }
        }
        Ok(())
    }
    pub fn evaluate(&mut self, expr: &Expression) -> Result<Value, RuntimeError> {
        match expr {
            Expression::Literal(x) => Ok(x.clone()),
            Expression::Grouping(x) => self.evaluate(x),
            Expression::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match (&operator.tokentype, right) {
                    (TokenType::Bang, x) => Ok(Value::Boolean(!x.is_truthy())),
                    (TokenType::Minus, Value::Number(x)) => Ok(Value::Number(-x)),
                    _ => Err(RuntimeError::type_mismatch(
                        operator,
                        "Operand must be a number.",
                    )),
                }
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(operator, left, right)
            }
            Expression::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuit = match operator.tokentype {
                    TokenType::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            Expression::Variable(name) => self.environment.get(name),
            Expression::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.environment.assign(name, value.clone())?;
                Ok(value)
            }
            Expression::Call {
                callee,
                paren,
                arguments,
            } => {
                let function = match self.evaluate(callee)? {
                    Value::Callable(function) => function,
                    other => {
                        debug!(callee = other.type_name(), "not callable");
                        return Err(RuntimeError::NotCallable { line: paren.line });
                    }
                };
                let mut evaluated_arguments: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    evaluated_arguments.push(self.evaluate(argument)?);
                }
                if function.arity() != evaluated_arguments.len() {
                    return Err(RuntimeError::ArityMismatch {
                        expected: function.arity(),
                        got: evaluated_arguments.len(),
                        line: paren.line,
                    });
                }
                if self.call_depth >= MAX_CALL_DEPTH {
                    debug!(depth = self.call_depth, line = paren.line, "call depth exceeded");
                    return Err(RuntimeError::StackOverflow { line: paren.line });
                }
                self.call_depth += 1;
                let result = function.call(self, evaluated_arguments);
                self.call_depth -= 1;
                result
            }
        }
    }
    pub(crate) fn execute(&mut self, stmt: &Statement) -> Result<(), Unwind> {
        match stmt {
            Statement::Print(e) => {
                let val = self.evaluate(e)?;
                self.output
                    .println(&val.to_string())
                    .map_err(|err| RuntimeError::Output {
                        message: err.to_string(),
                    })?;
            }
            Statement::Expression(e) => {
                self.evaluate(e)?;
            }
            Statement::Var { name, initializer } => {
                let val = match initializer {
                    Some(x) => self.evaluate(x)?,
                    None => Value::Nil,
                };
                self.environment.define(&name.lexeme, val);
            }
            Statement::Block(stmts) => {
                let environment = self.environment.new_child();
                self.execute_block(stmts, environment)?;
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }
            }
            Statement::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
            }
            Statement::Function(declaration) => {
                debug!(function = %declaration.name.lexeme, "declare");
                let function = LoxFunction::new(Rc::clone(declaration), self.environment.clone());
                self.environment.define(
                    &declaration.name.lexeme,
                    Value::Callable(Callable::Function(function)),
                );
            }
            Statement::Return { keyword: _, value } => {
                let val = match value {
                    Some(x) => self.evaluate(x)?,
                    None => Value::Nil,
                };
                return Err(Unwind::Return(val));
            }
        }
        Ok(())
    }
    /// Runs `statements` with `environment` as the current scope, restoring
    /// the previous scope afterwards whether or not they completed.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Statement],
        environment: Environment,
    ) -> Result<(), Unwind> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));
        self.environment = previous;
        result
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (&operator.tokentype, left, right) {
        (TokenType::EqualEqual, l, r) => Ok(Value::Boolean(l.equals(&r))),
        (TokenType::BangEqual, l, r) => Ok(Value::Boolean(!l.equals(&r))),
        (TokenType::Plus, Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
        (TokenType::Plus, Value::String(l), Value::String(r)) => Ok(Value::String(l + &r)),
        (TokenType::Plus, _, _) => Err(RuntimeError::type_mismatch(
            operator,
            "Operands must be two numbers or two strings.",
        )),
        (TokenType::Minus, Value::Number(l), Value::Number(r)) => Ok(Value::Number(l - r)),
        (TokenType::Star, Value::Number(l), Value::Number(r)) => Ok(Value::Number(l * r)),
        // Division by zero yields inf or NaN, not an error.
        (TokenType::Slash, Value::Number(l), Value::Number(r)) => Ok(Value::Number(l / r)),
        (TokenType::Greater, Value::Number(l), Value::Number(r)) => Ok(Value::Boolean(l > r)),
        (TokenType::GreaterEqual, Value::Number(l), Value::Number(r)) => {
            Ok(Value::Boolean(l >= r))
        }
        (TokenType::Less, Value::Number(l), Value::Number(r)) => Ok(Value::Boolean(l < r)),
        (TokenType::LessEqual, Value::Number(l), Value::Number(r)) => Ok(Value::Boolean(l <= r)),
        _ => Err(RuntimeError::type_mismatch(
            operator,
            "Operands must be numbers.",
        )),
    }
}
