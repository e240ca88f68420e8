use crate::token::Token;
use crate::value::Value;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Expression {
    Binary {
        left: Box<Expression>,
        operator: Token,
        right: Box<Expression>,
    },
    Grouping(Box<Expression>),
    Literal(Value),
    Logical {
        left: Box<Expression>,
        operator: Token,
        right: Box<Expression>,
    },
    Unary {
        operator: Token,
        right: Box<Expression>,
    },
    Variable(Token),
    Assign {
        name: Token,
        value: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        paren: Token,
        arguments: Vec<Expression>,
    },
}

/// A `fun` declaration. Shared between the statement tree and every function
/// value created from it, so the body is never copied.
#[derive(Debug)]
pub struct FunctionDeclaration {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub enum Statement {
    Print(Expression),
    Expression(Expression),
    Var {
        name: Token,
        initializer: Option<Expression>,
    },
    Block(Vec<Statement>),
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
    },
    Function(Rc<FunctionDeclaration>),
    Return {
        keyword: Token,
        value: Option<Expression>,
    },
}

/// Renders trees in parenthesized prefix form, e.g. `(* (- 123) (group 45.67))`.
pub struct AstPrinter {}

impl AstPrinter {
    pub fn print(&self, expr: &Expression) -> String {
        match expr {
            Expression::Binary {
                left,
                operator,
                right,
            } => self.parenthesize(&operator.lexeme, &[&**left, &**right]),
            Expression::Grouping(x) => self.parenthesize("group", &[&**x]),
            Expression::Literal(x) => x.to_string(),
            Expression::Unary { operator, right } => {
                self.parenthesize(&operator.lexeme, &[&**right])
            }
            Expression::Variable(x) => x.lexeme.clone(),
            Expression::Assign { name, value } => {
                format!("(= {} {})", name.lexeme, self.print(value))
            }
            Expression::Logical {
                left,
                operator,
                right,
            } => self.parenthesize(&operator.lexeme, &[&**left, &**right]),
            Expression::Call {
                callee,
                paren: _,
                arguments,
            } => {
                let mut x = format!("(call {}", self.print(callee));
                for argument in arguments {
                    x.push(' ');
                    x.push_str(&self.print(argument));
                }
                x.push(')');
                x
            }
        }
    }
    pub fn print_statement(&self, stmt: &Statement) -> String {
        match stmt {
            Statement::Print(e) => self.parenthesize("print", &[e]),
            Statement::Expression(e) => self.parenthesize(";", &[e]),
            Statement::Var { name, initializer } => match initializer {
                Some(e) => format!("(var {} {})", name.lexeme, self.print(e)),
                None => format!("(var {})", name.lexeme),
            },
            Statement::Block(stmts) => self.statements("block", stmts),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    self.print(condition),
                    self.print_statement(then_branch),
                    self.print_statement(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    self.print(condition),
                    self.print_statement(then_branch)
                ),
            },
            Statement::While { condition, body } => format!(
                "(while {} {})",
                self.print(condition),
                self.print_statement(body)
            ),
            Statement::Function(declaration) => {
                let params: Vec<&str> = declaration
                    .params
                    .iter()
                    .map(|p| p.lexeme.as_str())
                    .collect();
                let head = format!("fun {} ({})", declaration.name.lexeme, params.join(" "));
                self.statements(&head, &declaration.body)
            }
            Statement::Return { keyword: _, value } => match value {
                Some(e) => self.parenthesize("return", &[e]),
                None => String::from("(return)"),
            },
        }
    }
    fn parenthesize(&self, name: &str, args: &[&Expression]) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for arg in args {
            x.push(' ');
            x.push_str(self.print(arg).as_str());
        }
        x.push(')');
        x
    }
    fn statements(&self, name: &str, stmts: &[Statement]) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for stmt in stmts {
            x.push(' ');
            x.push_str(self.print_statement(stmt).as_str());
        }
        x.push(')');
        x
    }
}

#[cfg(test)]
mod ast_tests {
    use crate::ast::{AstPrinter, Expression, Statement};
    use crate::parser;
    use crate::scanner;
    use crate::token::{Token, TokenType};
    use crate::value::Value;

    fn parse_statements(source: &str) -> Vec<Statement> {
        let (tokens, scan_errors) = scanner::scan_tokens(source);
        assert!(scan_errors.is_empty());
        let (statements, errors) = parser::parse(&tokens);
        assert!(errors.is_empty(), "{:?}", errors);
        statements
    }

    #[test]
    fn basic_ast_test() {
        let expression = Expression::Binary {
            left: Box::new(Expression::Unary {
                operator: Token::new(TokenType::Minus, "-", 1),
                right: Box::new(Expression::Literal(Value::Number(123.0))),
            }),
            operator: Token::new(TokenType::Star, "*", 1),
            right: Box::new(Expression::Grouping(Box::new(Expression::Literal(
                Value::Number(45.67),
            )))),
        };
        let printer = AstPrinter {};
        assert_eq!(printer.print(&expression), "(* (- 123) (group 45.67))");
    }

    #[test]
    fn parsed_expression_prints_in_prefix_form() {
        let statements = parse_statements("-123 * (45.67);");
        let printer = AstPrinter {};
        match &statements[0] {
            Statement::Expression(e) => {
                assert_eq!(printer.print(e), "(* (- 123) (group 45.67))")
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn literals_print_as_values() {
        let statements = parse_statements("nil == !true or \"text\" and (x = f(1, 2));");
        let printer = AstPrinter {};
        assert_eq!(
            printer.print_statement(&statements[0]),
            "(; (or (== nil (! true)) (and text (group (= x (call f 1 2))))))"
        );
    }

    #[test]
    fn statements_print_in_prefix_form() {
        let statements = parse_statements(
            "var a; fun add(x, y) { return x + y; } if (a) print 1; else { a = 2; } while (a) a = nil;",
        );
        let printer = AstPrinter {};
        let rendered: Vec<String> = statements
            .iter()
            .map(|s| printer.print_statement(s))
            .collect();
        assert_eq!(
            rendered,
            vec![
                "(var a)",
                "(fun add (x y) (return (+ x y)))",
                "(if a (print 1) (block (; (= a 2))))",
                "(while a (; (= a nil)))",
            ]
        );
    }
}
