use crate::interpreter::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A handle to one scope in a chain of lexical scopes.
///
/// Cloning the handle shares the scope rather than copying it, so a closure
/// holding a clone observes (and makes) the same mutations as every other
/// holder. A scope lives as long as its last handle.
#[derive(Clone)]
pub struct Environment {
    scope: Rc<RefCell<Scope>>,
}

struct Scope {
    values: BTreeMap<String, Value>,
    enclosing: Option<Environment>,
}

impl Environment {
    pub fn new() -> Environment {
        Environment {
            scope: Rc::new(RefCell::new(Scope {
                values: BTreeMap::new(),
                enclosing: None,
            })),
        }
    }
    pub fn new_child(&self) -> Environment {
        Environment {
            scope: Rc::new(RefCell::new(Scope {
                values: BTreeMap::new(),
                enclosing: Some(self.clone()),
            })),
        }
    }
    /// Binds `name` in this scope only, replacing any binding it already has here.
    pub fn define(&self, name: &str, value: Value) {
        self.scope
            .borrow_mut()
            .values
            .insert(name.to_string(), value);
    }
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        let scope = self.scope.borrow();
        match scope.values.get(&name.lexeme) {
            Some(x) => Ok(x.clone()),
            None => match &scope.enclosing {
                Some(enclosing) => enclosing.get(name),
                None => Err(RuntimeError::undefined_variable(name)),
            },
        }
    }
    pub fn assign(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        let mut scope = self.scope.borrow_mut();
        if let Some(x) = scope.values.get_mut(&name.lexeme) {
            *x = value;
            return Ok(());
        }
        match &scope.enclosing {
            Some(enclosing) => enclosing.assign(name, value),
            None => Err(RuntimeError::undefined_variable(name)),
        }
    }
    pub fn equals(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.scope, &other.scope)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

// Only names are shown: values may hold closures that point back at this scope.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chain = f.debug_list();
        let mut current = Some(self.clone());
        while let Some(env) = current {
            let scope = env.scope.borrow();
            chain.entry(&scope.values.keys().collect::<Vec<_>>());
            current = scope.enclosing.clone();
        }
        chain.finish()
    }
}

#[cfg(test)]
mod environment_tests {
    use crate::environment::Environment;
    use crate::interpreter::RuntimeError;
    use crate::token::{Token, TokenType};
    use crate::value::Value;

    fn name(lexeme: &str) -> Token {
        Token::new(TokenType::Identifier(lexeme.to_string()), lexeme, 1)
    }

    fn number(env: &Environment, lexeme: &str) -> f64 {
        match env.get(&name(lexeme)) {
            Ok(Value::Number(x)) => x,
            other => panic!("expected a number, got {:?}", other),
        }
    }

    #[test]
    fn define_and_get() {
        let env = Environment::new();
        env.define("a", Value::Number(1.0));
        assert_eq!(number(&env, "a"), 1.0);
        env.define("a", Value::Number(2.0));
        assert_eq!(number(&env, "a"), 2.0);
    }

    #[test]
    fn shadowing_stays_in_the_child() {
        let outer = Environment::new();
        outer.define("x", Value::Number(1.0));
        let inner = outer.new_child();
        inner.define("x", Value::Number(2.0));
        assert_eq!(number(&inner, "x"), 2.0);
        assert_eq!(number(&outer, "x"), 1.0);
    }

    #[test]
    fn assign_walks_outward() {
        let outer = Environment::new();
        outer.define("x", Value::Number(1.0));
        let inner = outer.new_child().new_child();
        inner.assign(&name("x"), Value::Number(3.0)).unwrap();
        assert_eq!(number(&outer, "x"), 3.0);
    }

    #[test]
    fn children_share_their_parent() {
        let outer = Environment::new();
        let first = outer.new_child();
        let second = outer.new_child();
        outer.define("shared", Value::Nil);
        first.assign(&name("shared"), Value::Number(7.0)).unwrap();
        assert_eq!(number(&second, "shared"), 7.0);
        assert!(outer.clone().equals(&outer));
        assert!(!first.equals(&second));
    }

    #[test]
    fn undefined_names() {
        let env = Environment::new().new_child();
        assert!(matches!(
            env.get(&name("missing")),
            Err(RuntimeError::UndefinedVariable { .. })
        ));
        assert!(matches!(
            env.assign(&name("missing"), Value::Nil),
            Err(RuntimeError::UndefinedVariable { .. })
        ));
        assert!(matches!(env.get(&name("missing")), Err(_)));
    }
}
