use crate::ast::{Expression, FunctionDeclaration, Statement};
use crate::token::{Token, TokenType};
use crate::value::Value;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

const MAX_ARGUMENTS: usize = 255;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {}] Error{}: {message}", .token.line, location(.token))]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

fn location(token: &Token) -> String {
    match token.tokentype {
        TokenType::EOF => String::from(" at end"),
        _ => format!(" at '{}'", token.lexeme),
    }
}

/// Parses a whole program. Every statement that parses cleanly is returned,
/// alongside every error found; after an error the parser skips ahead to the
/// next statement boundary and carries on.
pub fn parse(tokens: &[Token]) -> (Vec<Statement>, Vec<ParseError>) {
    if tokens.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let mut parser = Parser::new(tokens);
    let statements = parser.parse();
    (statements, parser.errors)
}

struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    function_depth: usize,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Parser<'a> {
        Parser {
            tokens,
            current: 0,
            function_depth: 0,
            errors: Vec::new(),
        }
    }
    fn parse(&mut self) -> Vec<Statement> {
        let mut statements: Vec<Statement> = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    debug!(error = %e, "parse error");
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }
        statements
    }
    fn declaration(&mut self) -> Result<Statement, ParseError> {
        match self.peek().tokentype {
            TokenType::Var => {
                self.advance();
                self.var_declaration()
            }
            TokenType::Fun => {
                self.advance();
                self.function()
            }
            _ => self.statement(),
        }
    }
    fn var_declaration(&mut self) -> Result<Statement, ParseError> {
        let name = self.consume_identifier("Expect variable name.")?;
        let initializer = match self.peek().tokentype {
            TokenType::Equal => {
                self.advance();
                Some(self.expression()?)
            }
            _ => None,
        };
        self.consume(TokenType::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Statement::Var { name, initializer })
    }
    fn function(&mut self) -> Result<Statement, ParseError> {
        let name = self.consume_identifier("Expect function name.")?;
        self.consume(TokenType::LeftParen, "Expect '(' after function name.")?;
        let mut params: Vec<Token> = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    self.report(self.peek(), "Can't have more than 255 parameters.");
                }
                params.push(self.consume_identifier("Expect parameter name.")?);
                if !self.next_if(&TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;
        self.consume(TokenType::LeftBrace, "Expect '{' before function body.")?;
        self.function_depth += 1;
        let body = self.block();
        self.function_depth -= 1;
        Ok(Statement::Function(Rc::new(FunctionDeclaration {
            name,
            params,
            body: body?,
        })))
    }
    fn statement(&mut self) -> Result<Statement, ParseError> {
        match self.peek().tokentype {
            TokenType::If => {
                self.advance();
                self.if_statement()
            }
            TokenType::Print => {
                self.advance();
                self.print_statement()
            }
            TokenType::Return => {
                self.advance();
                self.return_statement()
            }
            TokenType::LeftBrace => {
                self.advance();
                Ok(Statement::Block(self.block()?))
            }
            TokenType::While => {
                self.advance();
                self.while_statement()
            }
            TokenType::For => {
                self.advance();
                self.for_statement()
            }
            _ => self.expression_statement(),
        }
    }
    /// `for (init; cond; incr) body` becomes
    /// `{ init; while (cond) { body; incr; } }`.
    fn for_statement(&mut self) -> Result<Statement, ParseError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;
        let initializer: Option<Statement> = match self.peek().tokentype {
            TokenType::Semicolon => {
                self.advance();
                None
            }
            TokenType::Var => {
                self.advance();
                Some(self.var_declaration()?)
            }
            _ => Some(self.expression_statement()?),
        };

        let condition = match self.peek().tokentype {
            TokenType::Semicolon => Expression::Literal(Value::Boolean(true)),
            _ => self.expression()?,
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment: Option<Expression> = match self.peek().tokentype {
            TokenType::RightParen => None,
            _ => Some(self.expression()?),
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(x) = increment {
            body = Statement::Block(vec![body, Statement::Expression(x)])
        }
        body = Statement::While {
            condition,
            body: Box::new(body),
        };
        match initializer {
            None => Ok(body),
            Some(x) => Ok(Statement::Block(vec![x, body])),
        }
    }
    fn while_statement(&mut self) -> Result<Statement, ParseError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;
        let body = self.statement()?;
        Ok(Statement::While {
            condition,
            body: Box::new(body),
        })
    }
    fn if_statement(&mut self) -> Result<Statement, ParseError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.next_if(&TokenType::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }
    fn block(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements: Vec<Statement> = Vec::new();
        while !self.is_at_end() && !self.check(&TokenType::RightBrace) {
            statements.push(self.declaration()?);
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }
    fn print_statement(&mut self) -> Result<Statement, ParseError> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Statement::Print(expr))
    }
    fn return_statement(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.previous().clone();
        if self.function_depth == 0 {
            self.report(&keyword, "Can't return from top-level code.");
        }
        let value = match self.peek().tokentype {
            TokenType::Semicolon => None,
            _ => Some(self.expression()?),
        };
        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Statement::Return { keyword, value })
    }
    fn expression_statement(&mut self) -> Result<Statement, ParseError> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Statement::Expression(expr))
    }
    fn expression(&mut self) -> Result<Expression, ParseError> {
        self.assignment()
    }
    fn assignment(&mut self) -> Result<Expression, ParseError> {
        let expr = self.or()?;
        match self.peek().tokentype {
            TokenType::Equal => {
                self.advance();
                let equals = self.previous().clone();
                let value = self.assignment()?;
                match expr {
                    Expression::Variable(name) => Ok(Expression::Assign {
                        name,
                        value: Box::new(value),
                    }),
                    _ => Err(self.error_at(&equals, "Invalid assignment target.")),
                }
            }
            _ => Ok(expr),
        }
    }
    fn or(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.and()?;
        while self.next_if(&TokenType::Or) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    fn and(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.equality()?;
        while self.next_if(&TokenType::And) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    fn equality(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.comparison()?;
        loop {
            match self.peek().tokentype {
                TokenType::BangEqual | TokenType::EqualEqual => {
                    self.advance();
                    let operator = self.previous().clone();
                    let right = self.comparison()?;
                    expr = binary(expr, operator, right);
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn comparison(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.term()?;
        loop {
            match self.peek().tokentype {
                TokenType::Greater
                | TokenType::GreaterEqual
                | TokenType::Less
                | TokenType::LessEqual => {
                    self.advance();
                    let operator = self.previous().clone();
                    let right = self.term()?;
                    expr = binary(expr, operator, right);
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn term(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.factor()?;
        loop {
            match self.peek().tokentype {
                TokenType::Minus | TokenType::Plus => {
                    self.advance();
                    let operator = self.previous().clone();
                    let right = self.factor()?;
                    expr = binary(expr, operator, right);
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn factor(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.unary()?;
        loop {
            match self.peek().tokentype {
                TokenType::Slash | TokenType::Star => {
                    self.advance();
                    let operator = self.previous().clone();
                    let right = self.unary()?;
                    expr = binary(expr, operator, right);
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn unary(&mut self) -> Result<Expression, ParseError> {
        match self.peek().tokentype {
            TokenType::Bang | TokenType::Minus => {
                self.advance();
                let operator = self.previous().clone();
                let right = self.unary()?;
                Ok(Expression::Unary {
                    operator,
                    right: Box::new(right),
                })
            }
            _ => self.call(),
        }
    }
    fn call(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.primary()?;
        while self.next_if(&TokenType::LeftParen) {
            expr = self.finish_call(expr)?;
        }
        Ok(expr)
    }
    fn finish_call(&mut self, callee: Expression) -> Result<Expression, ParseError> {
        let mut arguments: Vec<Expression> = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    self.report(self.peek(), "Can't have more than 255 arguments.");
                }
                arguments.push(self.expression()?);
                if !self.next_if(&TokenType::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenType::RightParen, "Expect ')' after arguments.")?;
        Ok(Expression::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }
    fn primary(&mut self) -> Result<Expression, ParseError> {
        let literal = match &self.peek().tokentype {
            TokenType::False => Value::Boolean(false),
            TokenType::True => Value::Boolean(true),
            TokenType::Nil => Value::Nil,
            TokenType::Number(x) => Value::Number(*x),
            TokenType::String(x) => Value::String(x.clone()),
            TokenType::Identifier(_) => {
                self.advance();
                return Ok(Expression::Variable(self.previous().clone()));
            }
            TokenType::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
                return Ok(Expression::Grouping(Box::new(expr)));
            }
            _ => return Err(self.error_at(self.peek(), "Expect expression.")),
        };
        self.advance();
        Ok(Expression::Literal(literal))
    }
    /// Skips tokens until just after a `;` or just before a token that starts
    /// a statement. Always consumes at least one token.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if let TokenType::Semicolon = self.previous().tokentype {
                return;
            }
            match self.peek().tokentype {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => (),
            }
            self.advance();
        }
        debug!(line = self.peek().line, "resynchronized");
    }
    fn consume(&mut self, expected: TokenType, msg: &str) -> Result<Token, ParseError> {
        if self.check(&expected) {
            self.advance();
            Ok(self.previous().clone())
        } else {
            Err(self.error_at(self.peek(), msg))
        }
    }
    fn consume_identifier(&mut self, msg: &str) -> Result<Token, ParseError> {
        match self.peek().tokentype {
            TokenType::Identifier(_) => {
                self.advance();
                Ok(self.previous().clone())
            }
            _ => Err(self.error_at(self.peek(), msg)),
        }
    }
    fn check(&self, expected: &TokenType) -> bool {
        std::mem::discriminant(&self.peek().tokentype) == std::mem::discriminant(expected)
    }
    fn next_if(&mut self, expected: &TokenType) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }
    fn advance(&mut self) -> &'a Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }
    fn is_at_end(&self) -> bool {
        matches!(self.peek().tokentype, TokenType::EOF)
    }
    // A token list always ends with EOF, and `advance` never moves past it.
    fn peek(&self) -> &'a Token {
        let tokens: &'a [Token] = self.tokens;
        &tokens[self.current.min(tokens.len() - 1)]
    }
    fn previous(&self) -> &'a Token {
        let tokens: &'a [Token] = self.tokens;
        &tokens[self.current.saturating_sub(1).min(tokens.len() - 1)]
    }
    fn error_at(&self, token: &Token, msg: &str) -> ParseError {
        ParseError {
            message: msg.to_string(),
            token: token.clone(),
        }
    }
    /// Records an error without unwinding; parsing continues in place.
    fn report(&mut self, token: &Token, msg: &str) {
        let e = self.error_at(token, msg);
        debug!(error = %e, "parse error");
        self.errors.push(e);
    }
}

fn binary(left: Expression, operator: Token, right: Expression) -> Expression {
    Expression::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

#[cfg(test)]
mod parser_tests {
    use crate::ast::{AstPrinter, Expression, Statement};
    use crate::parser::{self, ParseError};
    use crate::scanner;
    use crate::token::TokenType;

    fn parse(source: &str) -> (Vec<Statement>, Vec<ParseError>) {
        let (tokens, scan_errors) = scanner::scan_tokens(source);
        assert!(scan_errors.is_empty(), "{:?}", scan_errors);
        parser::parse(&tokens)
    }

    fn printed(source: &str) -> Vec<String> {
        let (statements, errors) = parse(source);
        assert!(errors.is_empty(), "{:?}", errors);
        let printer = AstPrinter {};
        statements.iter().map(|s| printer.print_statement(s)).collect()
    }

    fn messages(source: &str) -> Vec<String> {
        let (_, errors) = parse(source);
        errors.into_iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(
            printed("1 + 2 * 3 - 4 / 5;"),
            vec!["(; (- (+ 1 (* 2 3)) (/ 4 5)))"]
        );
        assert_eq!(
            printed("a == b != c < d;"),
            vec!["(; (!= (== a b) (< c d)))"]
        );
        assert_eq!(printed("!!-x;"), vec!["(; (! (! (- x))))"]);
        assert_eq!(
            printed("a or b and c or d;"),
            vec!["(; (or (or a (and b c)) d))"]
        );
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(printed("a = b = 1;"), vec!["(; (= a (= b 1)))"]);
    }

    #[test]
    fn calls_chain() {
        assert_eq!(printed("f()(1)(2, 3);"), vec!["(; (call (call (call f) 1) 2 3))"]);
        let (statements, _) = parse("f(1);");
        match &statements[0] {
            Statement::Expression(Expression::Call { paren, .. }) => {
                assert!(matches!(paren.tokentype, TokenType::RightParen))
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn for_desugars_to_while() {
        assert_eq!(
            printed("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (var i 0) (while (< i 3) (block (print i) (; (= i (+ i 1))))))"]
        );
        assert_eq!(printed("for (;;) print 1;"), vec!["(while true (print 1))"]);
        assert_eq!(
            printed("for (i = 0; ; ) {}"),
            vec!["(block (; (= i 0)) (while true (block)))"]
        );
    }

    #[test]
    fn function_declarations() {
        assert_eq!(
            printed("fun f() {} fun g(a, b) { return; }"),
            vec!["(fun f ())", "(fun g (a b) (return))"]
        );
    }

    #[test]
    fn invalid_assignment_target() {
        assert_eq!(
            messages("a + b = c;"),
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );
    }

    #[test]
    fn missing_tokens() {
        assert_eq!(
            messages("print 1"),
            vec!["[line 1] Error at end: Expect ';' after value."]
        );
        assert_eq!(
            messages("var = 1;"),
            vec!["[line 1] Error at '=': Expect variable name."]
        );
        assert_eq!(
            messages("if x) print 1;"),
            vec!["[line 1] Error at 'x': Expect '(' after 'if'."]
        );
        assert_eq!(
            messages("{ print 1;"),
            vec!["[line 1] Error at end: Expect '}' after block."]
        );
    }

    #[test]
    fn recovers_and_reports_every_error() {
        let (statements, errors) = parse("var a = ;\nprint a;\nprint (1;\nvar b = 2;\n1 +;");
        assert_eq!(
            errors.iter().map(|e| e.token.line).collect::<Vec<_>>(),
            vec![1, 3, 5]
        );
        assert_eq!(statements.len(), 2);
        assert!(matches!(statements[0], Statement::Print(_)));
        assert!(matches!(statements[1], Statement::Var { .. }));
    }

    #[test]
    fn synchronization_always_makes_progress() {
        let (statements, errors) = parse(") ) ) ) )");
        assert!(statements.is_empty());
        assert!(!errors.is_empty());
        let (_, errors) = parse("class Foo {}");
        assert!(!errors.is_empty());
    }

    #[test]
    fn return_outside_function() {
        assert_eq!(
            messages("return 1;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
        assert!(messages("fun f() { { return 1; } }").is_empty());
    }

    #[test]
    fn too_many_arguments() {
        let arguments = vec!["1"; 256].join(", ");
        let errors = messages(&format!("f({});", arguments));
        assert_eq!(
            errors,
            vec!["[line 1] Error at '1': Can't have more than 255 arguments."]
        );
    }

    #[test]
    fn too_many_parameters() {
        let params = (0..256).map(|i| format!("p{}", i)).collect::<Vec<_>>().join(", ");
        let errors = messages(&format!("fun f({}) {{}}", params));
        assert_eq!(
            errors,
            vec!["[line 1] Error at 'p255': Can't have more than 255 parameters."]
        );
        let params = (0..255).map(|i| format!("p{}", i)).collect::<Vec<_>>().join(", ");
        assert!(messages(&format!("fun f({}) {{}}", params)).is_empty());
    }
}
