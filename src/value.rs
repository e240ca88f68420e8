use crate::callable::Callable;
use std::fmt;
use strum_macros::IntoStaticStr;

#[derive(Clone, Debug, IntoStaticStr)]
pub enum Value {
    Boolean(bool),
    Nil,
    Number(f64),
    String(String),
    Callable(Callable),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(x) => write!(f, "{}", x),
            Value::Number(x) => write!(f, "{}", x),
            Value::String(x) => write!(f, "{}", x),
            Value::Callable(x) => write!(f, "{}", x),
        }
    }
}

impl Value {
    /// `nil` and `false` are falsey; everything else, `0` and `""` included, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(x) => *x,
            Value::Nil => false,
            Value::Number(_) => true,
            Value::String(_) => true,
            Value::Callable(_) => true,
        }
    }
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.equals(b),
            _ => false,
        }
    }
    pub fn type_name(&self) -> &'static str {
        self.into()
    }
}
