use crate::token::{Token, TokenType};
use phf::phf_map;
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error: {message}")]
pub struct ScanError {
    pub line: usize,
    pub message: String,
}

// Note: current becomes self.iter.peek()?.0
struct Scanner<'a> {
    source: &'a str,
    iter: Peekable<CharIndices<'a>>,
    start: usize,
    line: usize,
}

/// Splits `source` into tokens. Lexical errors are collected rather than
/// aborting the pass, and the returned token list always ends with `EOF`.
pub fn scan_tokens(source: &str) -> (Vec<Token>, Vec<ScanError>) {
    let mut scanner = Scanner {
        source,
        iter: source.char_indices().peekable(),
        start: 0,
        line: 1,
    };
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<ScanError> = Vec::new();

    while let Some((idx, c)) = scanner.iter.next() {
        scanner.start = idx;
        match scanner.scan_token(c) {
            Ok(Some(token)) => {
                trace!(token = %token, "scanned");
                tokens.push(token);
            }
            Ok(None) => (),
            Err(e) => {
                debug!(error = %e, "scan error");
                errors.push(e);
            }
        }
    }
    tokens.push(Token::new(TokenType::EOF, "", scanner.line));
    (tokens, errors)
}

impl<'a> Scanner<'a> {
    fn scan_token(&mut self, c: char) -> Result<Option<Token>, ScanError> {
        match c {
            '(' => Ok(Some(self.token(TokenType::LeftParen))),
            ')' => Ok(Some(self.token(TokenType::RightParen))),
            '{' => Ok(Some(self.token(TokenType::LeftBrace))),
            '}' => Ok(Some(self.token(TokenType::RightBrace))),
            ',' => Ok(Some(self.token(TokenType::Comma))),
            '.' => Ok(Some(self.token(TokenType::Dot))),
            '-' => Ok(Some(self.token(TokenType::Minus))),
            '+' => Ok(Some(self.token(TokenType::Plus))),
            ';' => Ok(Some(self.token(TokenType::Semicolon))),
            '*' => Ok(Some(self.token(TokenType::Star))),
            '!' => Ok(Some(self.either('=', TokenType::BangEqual, TokenType::Bang))),
            '=' => Ok(Some(self.either('=', TokenType::EqualEqual, TokenType::Equal))),
            '<' => Ok(Some(self.either('=', TokenType::LessEqual, TokenType::Less))),
            '>' => Ok(Some(self.either('=', TokenType::GreaterEqual, TokenType::Greater))),
            '/' => {
                if self.next_if('/') {
                    while self.iter.next_if(|&(_, c)| c != '\n').is_some() {}
                    Ok(None)
                } else {
                    Ok(Some(self.token(TokenType::Slash)))
                }
            }
            ' ' | '\r' | '\t' => Ok(None),
            '\n' => {
                self.line += 1;
                Ok(None)
            }
            '"' => self.string().map(Some),
            '0'..='9' => self.number().map(Some),
            'a'..='z' | 'A'..='Z' | '_' => Ok(Some(self.identifier())),
            _ => Err(self.error(format!("Unexpected character '{}'.", c))),
        }
    }
    fn current(&mut self) -> usize {
        match self.iter.peek() {
            None => self.source.len(),
            Some((idx, _)) => *idx,
        }
    }
    fn token(&mut self, token_type: TokenType) -> Token {
        let current = self.current();
        Token::new(token_type, &self.source[self.start..current], self.line)
    }
    fn either(&mut self, expected: char, matched: TokenType, otherwise: TokenType) -> Token {
        if self.next_if(expected) {
            self.token(matched)
        } else {
            self.token(otherwise)
        }
    }
    fn next_if(&mut self, expected: char) -> bool {
        self.iter.next_if(|&(_, c)| c == expected).is_some()
    }
    fn error(&self, message: String) -> ScanError {
        ScanError {
            line: self.line,
            message,
        }
    }
    fn string(&mut self) -> Result<Token, ScanError> {
        while let Some((_, c)) = self.iter.next_if(|&(_, c)| c != '"') {
            if c == '\n' {
                self.line += 1;
            }
        }
        if self.iter.next().is_none() {
            return Err(self.error("Unterminated string.".to_string()));
        }
        let current = self.current();
        let text = self.source[self.start + 1..current - 1].to_string();
        Ok(self.token(TokenType::String(text)))
    }
    fn digits(&mut self) {
        while self.iter.next_if(|&(_, c)| c.is_ascii_digit()).is_some() {}
    }
    fn number(&mut self) -> Result<Token, ScanError> {
        self.digits();

        // A '.' only belongs to the number when a digit follows it.
        if let Some((_, '.')) = self.iter.peek() {
            let mut lookahead = self.iter.clone();
            lookahead.next();
            if let Some((_, '0'..='9')) = lookahead.peek() {
                self.iter.next();
                self.digits();
            }
        }

        let source = self.source;
        let current = self.current();
        let text = &source[self.start..current];
        let value: f64 = text
            .parse()
            .map_err(|_| self.error(format!("Invalid number '{}'.", text)))?;
        Ok(self.token(TokenType::Number(value)))
    }
    fn identifier(&mut self) -> Token {
        while self
            .iter
            .next_if(|&(_, c)| c.is_ascii_alphanumeric() || c == '_')
            .is_some()
        {}
        let source = self.source;
        let current = self.current();
        let text = &source[self.start..current];
        match KEYWORDS.get(text) {
            None => self.token(TokenType::Identifier(text.to_string())),
            Some(keyword) => self.token(keyword.clone()),
        }
    }
}

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and" => TokenType::And,
    "class" => TokenType::Class,
    "else" => TokenType::Else,
    "false" => TokenType::False,
    "for" => TokenType::For,
    "fun" => TokenType::Fun,
    "if" => TokenType::If,
    "nil" => TokenType::Nil,
    "or" => TokenType::Or,
    "print" => TokenType::Print,
    "return" => TokenType::Return,
    "super" => TokenType::Super,
    "this" => TokenType::This,
    "true" => TokenType::True,
    "var" => TokenType::Var,
    "while" => TokenType::While,
};

#[cfg(test)]
mod scanner_tests {
    use crate::scanner;
    use crate::token::TokenType;

    fn kinds(source: &str) -> Vec<TokenType> {
        let (tokens, errors) = scanner::scan_tokens(source);
        assert!(errors.is_empty(), "{:?}", errors);
        tokens.into_iter().map(|t| t.tokentype).collect()
    }

    #[test]
    fn basic_scanner_test() {
        let (tokens, errors) = scanner::scan_tokens("x = 2");
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].tokentype, TokenType::Identifier("x".to_string()));
        assert!(matches!(tokens[1].tokentype, TokenType::Equal));
        assert_eq!(tokens[2].tokentype, TokenType::Number(2.0));
        assert_eq!(tokens[2].lexeme, "2");
        assert!(matches!(tokens[3].tokentype, TokenType::EOF));
    }

    #[test]
    fn number_parsing() {
        assert_eq!(
            kinds("1+2.5"),
            vec![
                TokenType::Number(1.0),
                TokenType::Plus,
                TokenType::Number(2.5),
                TokenType::EOF
            ]
        );
    }

    #[test]
    fn trailing_and_leading_dots_are_not_part_of_numbers() {
        assert_eq!(
            kinds("12. .5"),
            vec![
                TokenType::Number(12.0),
                TokenType::Dot,
                TokenType::Dot,
                TokenType::Number(5.0),
                TokenType::EOF
            ]
        );
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            kinds("! != = == < <= > >="),
            vec![
                TokenType::Bang,
                TokenType::BangEqual,
                TokenType::Equal,
                TokenType::EqualEqual,
                TokenType::Less,
                TokenType::LessEqual,
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::EOF
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("var fun_name = nil; while orchid"),
            vec![
                TokenType::Var,
                TokenType::Identifier("fun_name".to_string()),
                TokenType::Equal,
                TokenType::Nil,
                TokenType::Semicolon,
                TokenType::While,
                TokenType::Identifier("orchid".to_string()),
                TokenType::EOF
            ]
        );
    }

    #[test]
    fn comments_and_lines() {
        let (tokens, errors) = scanner::scan_tokens("// nothing here\nprint \"a\nb\";\n/");
        assert!(errors.is_empty());
        assert!(matches!(tokens[0].tokentype, TokenType::Print));
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].tokentype, TokenType::String("a\nb".to_string()));
        assert_eq!(tokens[1].lexeme, "\"a\nb\"");
        assert_eq!(tokens[2].line, 3);
        assert!(matches!(tokens[3].tokentype, TokenType::Slash));
        assert_eq!(tokens[3].line, 4);
        assert_eq!(tokens[4].line, 4);
    }

    #[test]
    fn errors_do_not_stop_the_scan() {
        let (tokens, errors) = scanner::scan_tokens("@ 1\n# \"open");
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[1].line, 2);
        assert_eq!(errors[2].message, "Unterminated string.");
        assert_eq!(
            errors[0].to_string(),
            "[line 1] Error: Unexpected character '@'."
        );
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].tokentype, TokenType::Number(1.0));
        assert!(matches!(tokens[1].tokentype, TokenType::EOF));
    }
}
