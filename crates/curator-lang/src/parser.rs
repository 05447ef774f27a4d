use crate::ast::*;
use crate::lexer::{Span, Token, TokenKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found} at position {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected end of query")]
    UnexpectedEof,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Invalid character {text:?} at position {span:?}")]
    InvalidCharacter { text: String, span: Span },
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parses a complete query; trailing tokens are an error.
    pub fn parse(source: &str) -> Result<Expr, ParseError> {
        let tokens = crate::lexer::Lexer::tokenize(source);
        let mut parser = Parser::new(tokens);
        let expr = parser.parse_expr()?;
        parser.expect(TokenKind::Eof)?;
        Ok(expr)
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current() {
            Some(t) if t.kind == TokenKind::Error => ParseError::InvalidCharacter {
                text: t.text.clone(),
                span: t.span,
            },
            Some(t) if t.kind != TokenKind::Eof => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: format!("{:?}", t.kind),
                span: t.span,
            },
            _ => ParseError::UnexpectedEof,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.peek_kind() == kind {
            self.advance().ok_or(ParseError::UnexpectedEof)
        } else {
            Err(self.unexpected(&format!("{:?}", kind)))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;

        while matches!(self.peek_kind(), TokenKind::Or | TokenKind::Pipe) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOp::Or,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;

        while matches!(self.peek_kind(), TokenKind::And | TokenKind::Amp) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOp::And,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        // `not in` only follows an operand, so a leading `not` is always negation
        if matches!(self.peek_kind(), TokenKind::Not | TokenKind::Tilde) {
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;

        let op = match self.peek_kind() {
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            TokenKind::In => {
                self.advance();
                let list = self.parse_list()?;
                return Ok(Expr::Membership {
                    needle: Box::new(left),
                    list,
                    negated: false,
                });
            }
            TokenKind::Not if self.peek_kind_at(1) == TokenKind::In => {
                self.advance();
                self.advance();
                let list = self.parse_list()?;
                return Ok(Expr::Membership {
                    needle: Box::new(left),
                    list,
                    negated: true,
                });
            }
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;

        Ok(Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.peek_kind() == TokenKind::Minus {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            TokenKind::Number => {
                let token = self.expect(TokenKind::Number)?;
                let value: f64 = token
                    .text
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber(token.text.clone()))?;
                Ok(Expr::Literal(Literal::Number(value)))
            }
            TokenKind::String => {
                let token = self.expect(TokenKind::String)?;
                Ok(Expr::Literal(Literal::String(token.text)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            TokenKind::Ident | TokenKind::QuotedIdent => {
                let token = self.advance().ok_or(ParseError::UnexpectedEof)?;
                Ok(Expr::Column(Column {
                    span: token.span,
                    name: token.text,
                }))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::Paren(Box::new(expr)))
            }
            _ => Err(self.unexpected("number, string, column, or (")),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::LBracket)?;
        let mut items = Vec::new();
        loop {
            if self.peek_kind() == TokenKind::RBracket {
                break;
            }
            items.push(self.parse_additive()?);
            if self.peek_kind() == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> String {
        name.to_string()
    }

    #[test]
    fn test_parse_comparison() {
        let expr = Parser::parse("age >= 18").unwrap();
        match expr {
            Expr::BinaryOp { left, op, right } => {
                assert_eq!(op, BinaryOp::Ge);
                assert!(matches!(*left, Expr::Column(ref c) if c.name == column("age")));
                assert_eq!(*right, Expr::Literal(Literal::Number(18.0)));
            }
            _ => panic!("Expected binary op"),
        }
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = Parser::parse("a == 1 or b == 2 & c == 3").unwrap();
        match expr {
            Expr::BinaryOp { op, right, .. } => {
                assert_eq!(op, BinaryOp::Or);
                assert!(matches!(*right, Expr::BinaryOp { op: BinaryOp::And, .. }));
            }
            _ => panic!("Expected or"),
        }
    }

    #[test]
    fn test_pipe_has_boolean_precedence() {
        // `|` binds like `or`, not tighter than comparisons
        let expr = Parser::parse("a > 1 | b < 2").unwrap();
        assert!(matches!(expr, Expr::BinaryOp { op: BinaryOp::Or, .. }));
    }

    #[test]
    fn test_arithmetic_precedence() {
        let expr = Parser::parse("a + b * 2 > 10").unwrap();
        match expr {
            Expr::BinaryOp { left, op: BinaryOp::Gt, .. } => match *left {
                Expr::BinaryOp { op, right, .. } => {
                    assert_eq!(op, BinaryOp::Add);
                    assert!(matches!(*right, Expr::BinaryOp { op: BinaryOp::Mul, .. }));
                }
                _ => panic!("Expected addition"),
            },
            _ => panic!("Expected comparison"),
        }
    }

    #[test]
    fn test_membership() {
        let expr = Parser::parse("country not in ['US', \"CA\"]").unwrap();
        match expr {
            Expr::Membership { list, negated, .. } => {
                assert!(negated);
                assert_eq!(list.len(), 2);
            }
            _ => panic!("Expected membership"),
        }
    }

    #[test]
    fn test_not_and_tilde() {
        let expr = Parser::parse("not ~smoker").unwrap();
        match expr {
            Expr::Unary { op: UnaryOp::Not, operand } => {
                assert!(matches!(*operand, Expr::Unary { op: UnaryOp::Not, .. }));
            }
            _ => panic!("Expected not"),
        }
    }

    #[test]
    fn test_quoted_column() {
        let expr = Parser::parse("`blood type` == 'O'").unwrap();
        let columns = expr.columns();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].name, "blood type");
    }

    #[test]
    fn test_negative_literal() {
        let expr = Parser::parse("delta > -1.5").unwrap();
        match expr {
            Expr::BinaryOp { right, .. } => {
                assert!(matches!(*right, Expr::Unary { op: UnaryOp::Neg, .. }));
            }
            _ => panic!("Expected comparison"),
        }
    }

    #[test]
    fn test_errors() {
        assert!(matches!(Parser::parse("age >="), Err(ParseError::UnexpectedEof)));
        assert!(matches!(Parser::parse("age 18"), Err(ParseError::UnexpectedToken { .. })));
        assert!(matches!(Parser::parse("(a == 1"), Err(ParseError::UnexpectedEof)));
        assert!(matches!(Parser::parse("a = 1"), Err(ParseError::InvalidCharacter { .. })));
        assert!(matches!(Parser::parse(""), Err(ParseError::UnexpectedEof)));
    }
}
