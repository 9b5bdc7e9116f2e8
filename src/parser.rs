//! Parser for rogscript
//!
//! Recursive descent over the token list. The first malformed construct
//! aborts the whole parse; no partial tree is ever returned.

use crate::ast::{
    BinaryOp, Expr, FunctionDecl, Literal, LogicalOp, NodeId, ObjectKey, Program, Stmt, UnaryOp,
};
use crate::error::{ParseError, ParseErrorKind};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Span, Token, TokenKind};
use std::rc::Rc;

pub type Result<T> = std::result::Result<T, ParseError>;

/// The parser state
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_id: NodeId,
}

impl Parser {
    /// Create a new parser from tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_id_offset(tokens, 0)
    }

    /// Create a parser whose variable nodes are numbered from `first_id`.
    ///
    /// A long-lived interpreter parses many lines and must never see two
    /// nodes share an id.
    pub fn with_id_offset(tokens: Vec<Token>, first_id: NodeId) -> Self {
        Self {
            tokens,
            current: 0,
            next_id: first_id,
        }
    }

    /// The first id not handed out yet
    pub fn next_id(&self) -> NodeId {
        self.next_id
    }

    /// Parse the tokens into a program
    pub fn parse(&mut self) -> Result<Program> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        tracing::trace!(count = statements.len(), "parsed statements");
        Ok(Program::new(statements))
    }

    // ==================== Statements ====================

    fn declaration(&mut self) -> Result<Stmt> {
        ensure_sufficient_stack(|| {
            if self.check(&TokenKind::Var) {
                self.var_declaration()
            } else {
                self.statement()
            }
        })
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'var'

        let name = self.expect_ident("expected variable name after 'var'")?;

        let initializer = if self.match_token(&TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };

        self.expect_terminator("expected ';' after variable declaration")?;

        Ok(Stmt::Var { name, initializer, span })
    }

    fn statement(&mut self) -> Result<Stmt> {
        if self.check(&TokenKind::If) {
            self.if_statement()
        } else if self.check(&TokenKind::While) {
            self.while_statement()
        } else if self.check(&TokenKind::For) {
            self.for_statement()
        } else if self.check(&TokenKind::Return) {
            self.return_statement()
        } else {
            self.expression_statement()
        }
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr = self.expression()?;
        self.expect_terminator("expected ';' after expression")?;
        Ok(Stmt::Expr { expr })
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'if'

        let condition = self.parenthesized_condition("if")?;
        let then_branch = self.block()?;

        let else_branch = if self.match_token(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                Some(vec![self.if_statement()?])
            } else {
                Some(self.block()?)
            }
        } else {
            None
        };

        Ok(Stmt::If { condition, then_branch, else_branch, span })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'while'

        let condition = self.parenthesized_condition("while")?;
        let body = self.block()?;

        Ok(Stmt::While { condition, body, span })
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'for'

        self.expect(&TokenKind::LeftParen, "expected '(' after 'for'")?;

        let init = if self.match_token(&TokenKind::Semicolon) {
            None
        } else if self.check(&TokenKind::Var) {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(self.expression_statement()?))
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&TokenKind::Semicolon, "expected ';' after loop condition")?;

        let increment = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.close_paren()?;

        let body = self.block()?;

        Ok(Stmt::For { init, condition, increment, body, span })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'return'

        let value = if self.at_terminator() {
            None
        } else {
            Some(self.expression()?)
        };

        self.expect_terminator("expected ';' after return value")?;
        Ok(Stmt::Return { value, span })
    }

    fn parenthesized_condition(&mut self, keyword: &str) -> Result<Expr> {
        self.expect(&TokenKind::LeftParen, &format!("expected '(' after '{}'", keyword))?;
        let condition = self.expression()?;
        self.close_paren()?;
        Ok(condition)
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        self.expect(&TokenKind::LeftBrace, "expected '{' before block")?;

        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            stmts.push(self.declaration()?);
        }

        self.expect(&TokenKind::RightBrace, "expected '}' after block")?;

        Ok(stmts)
    }

    // ==================== Expressions ====================

    fn expression(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.assignment())
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr = self.or_expr()?;

        if self.match_token(&TokenKind::Equal) {
            let equals = self.previous().span;
            let value = self.assignment()?;

            if let Expr::Variable { id, name, span } = expr {
                let span = span.to(value.span());
                return Ok(Expr::Assign {
                    id,
                    name,
                    value: Box::new(value),
                    span,
                });
            }

            return Err(ParseError::at(ParseErrorKind::InvalidAssignmentTarget, equals));
        }

        Ok(expr)
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut left = self.and_expr()?;

        while self.match_token(&TokenKind::OrOr) {
            let right = self.and_expr()?;
            let span = left.span().to(right.span());
            left = Expr::Logical {
                left: Box::new(left),
                op: LogicalOp::Or,
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut left = self.equality()?;

        while self.match_token(&TokenKind::AndAnd) {
            let right = self.equality()?;
            let span = left.span().to(right.span());
            left = Expr::Logical {
                left: Box::new(left),
                op: LogicalOp::And,
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut left = self.comparison()?;

        loop {
            let op = if self.match_token(&TokenKind::EqualEqual) {
                BinaryOp::Eq
            } else if self.match_token(&TokenKind::BangEqual) {
                BinaryOp::Ne
            } else {
                break;
            };

            let right = self.comparison()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut left = self.term()?;

        loop {
            let op = if self.match_token(&TokenKind::Less) {
                BinaryOp::Lt
            } else if self.match_token(&TokenKind::LessEqual) {
                BinaryOp::Le
            } else if self.match_token(&TokenKind::Greater) {
                BinaryOp::Gt
            } else if self.match_token(&TokenKind::GreaterEqual) {
                BinaryOp::Ge
            } else {
                break;
            };

            let right = self.term()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut left = self.factor()?;

        loop {
            let op = if self.match_token(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.match_token(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };

            let right = self.factor()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut left = self.unary()?;

        loop {
            let op = if self.match_token(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.match_token(&TokenKind::Slash) {
                BinaryOp::Div
            } else {
                break;
            };

            let right = self.unary()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = if self.match_token(&TokenKind::Minus) {
            UnaryOp::Neg
        } else if self.match_token(&TokenKind::Bang) {
            UnaryOp::Not
        } else {
            return self.call();
        };

        let span = self.previous().span;
        let operand = ensure_sufficient_stack(|| self.unary())?;
        Ok(Expr::Unary {
            op,
            span: span.to(operand.span()),
            operand: Box::new(operand),
        })
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(&TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(&TokenKind::LeftBracket) {
                let key = self.expression()?;
                let end = self.expect(&TokenKind::RightBracket, "expected ']' after index")?.span;
                let span = expr.span().to(end);
                expr = Expr::Get {
                    object: Box::new(expr),
                    key: Box::new(key),
                    span,
                };
            } else if self.match_token(&TokenKind::Dot) {
                let name_span = self.peek().span;
                let name = self.expect_ident("expected property name after '.'")?;
                let span = expr.span().to(name_span);
                expr = Expr::Get {
                    object: Box::new(expr),
                    key: Box::new(Expr::Literal {
                        value: Literal::String(name),
                        span: name_span,
                    }),
                    span,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut args = Vec::new();

        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.expression()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }

        let end_span = self.close_paren()?;
        let span = callee.span().to(end_span);

        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
            span,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.peek().clone();

        let literal = match &token.kind {
            TokenKind::Number(n) => Some(Literal::Number(*n)),
            TokenKind::String(s) => Some(Literal::String(s.clone())),
            TokenKind::True => Some(Literal::Bool(true)),
            TokenKind::False => Some(Literal::Bool(false)),
            TokenKind::Nil => Some(Literal::Nil),
            _ => None,
        };
        if let Some(value) = literal {
            self.advance();
            return Ok(Expr::Literal { value, span: token.span });
        }

        match &token.kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(Expr::Variable {
                    id: self.fresh_id(),
                    name,
                    span: token.span,
                })
            }
            TokenKind::LeftParen if self.is_function_literal() => self.function_literal(),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                let end = self.close_paren()?;
                Ok(Expr::Grouping {
                    expr: Box::new(expr),
                    span: token.span.to(end),
                })
            }
            TokenKind::LeftBracket => self.array_literal(),
            TokenKind::LeftBrace => self.object_literal(),
            other => Err(ParseError::at(
                ParseErrorKind::ExpectedExpression(other.to_string()),
                token.span,
            )),
        }
    }

    /// Looks past `(` for `ident, ident) =>` without consuming anything.
    fn is_function_literal(&self) -> bool {
        let kind_at = |offset: usize| self.tokens.get(self.current + offset).map(|t| &t.kind);

        let mut offset = 1;
        if kind_at(offset) != Some(&TokenKind::RightParen) {
            loop {
                if !matches!(kind_at(offset), Some(TokenKind::Ident(_))) {
                    return false;
                }
                offset += 1;
                match kind_at(offset) {
                    Some(TokenKind::Comma) => offset += 1,
                    Some(TokenKind::RightParen) => break,
                    _ => return false,
                }
            }
        }

        kind_at(offset + 1) == Some(&TokenKind::FatArrow)
    }

    fn function_literal(&mut self) -> Result<Expr> {
        let span = self.advance().span; // consume '('

        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.expect_ident("expected parameter name")?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }

        self.close_paren()?;
        self.expect(&TokenKind::FatArrow, "expected '=>' after parameters")?;

        let body = self.block()?;
        let span = span.to(self.previous().span);

        Ok(Expr::Function {
            decl: Rc::new(FunctionDecl { params, body }),
            span,
        })
    }

    fn array_literal(&mut self) -> Result<Expr> {
        let start = self.advance().span; // consume '['

        let mut elements = Vec::new();
        while !self.check(&TokenKind::RightBracket) {
            elements.push(self.expression()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        let end = self.expect(&TokenKind::RightBracket, "expected ']' after array elements")?.span;
        Ok(Expr::Array { elements, span: start.to(end) })
    }

    fn object_literal(&mut self) -> Result<Expr> {
        let start = self.advance().span; // consume '{'

        let mut entries = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let key = self.object_key()?;
            self.expect(&TokenKind::Colon, "expected ':' after object key")?;
            let value = self.expression()?;
            entries.push((key, value));

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        let end = self.expect(&TokenKind::RightBrace, "expected '}' after object entries")?.span;
        Ok(Expr::Object { entries, span: start.to(end) })
    }

    fn object_key(&mut self) -> Result<ObjectKey> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Ident(name) | TokenKind::String(name) => {
                self.advance();
                Ok(ObjectKey::Named(name))
            }
            TokenKind::LeftBracket => {
                self.advance();
                let key = self.expression()?;
                self.expect(&TokenKind::RightBracket, "expected ']' after computed key")?;
                Ok(ObjectKey::Computed(key))
            }
            other => Err(ParseError::at(
                ParseErrorKind::ExpectedToken {
                    expected: "expected object key".to_string(),
                    found: other.to_string(),
                },
                token.span,
            )),
        }
    }

    // ==================== Helpers ====================

    fn fresh_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, message: &str) -> Result<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::at(
                ParseErrorKind::ExpectedToken {
                    expected: message.to_string(),
                    found: self.peek().kind.to_string(),
                },
                self.peek().span,
            ))
        }
    }

    fn close_paren(&mut self) -> Result<Span> {
        if self.check(&TokenKind::RightParen) {
            Ok(self.advance().span)
        } else {
            Err(ParseError::at(ParseErrorKind::UnmatchedParen, self.peek().span))
        }
    }

    fn expect_ident(&mut self, message: &str) -> Result<String> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(ParseError::at(
                ParseErrorKind::ExpectedToken {
                    expected: message.to_string(),
                    found: self.peek().kind.to_string(),
                },
                self.peek().span,
            ))
        }
    }

    /// A statement may drop its ';' right before '}' or the end of the line
    fn at_terminator(&self) -> bool {
        self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
            || self.is_at_end()
    }

    fn expect_terminator(&mut self, message: &str) -> Result<()> {
        if self.match_token(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
            || self.is_at_end()
        {
            Ok(())
        } else {
            self.expect(&TokenKind::Semicolon, message).map(|_| ())
        }
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    let span = left.span().to(right.span());
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
        span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Program {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize().unwrap();
        let mut parser = Parser::new(tokens);
        parser.parse().unwrap()
    }

    fn parse_err(source: &str) -> ParseErrorKind {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize().unwrap();
        Parser::new(tokens).parse().unwrap_err().kind
    }

    #[test]
    fn test_var_statement() {
        let program = parse("var x = 42;");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0] {
            Stmt::Var { name, initializer, .. } => {
                assert_eq!(name, "x");
                assert!(initializer.is_some());
            }
            _ => panic!("expected var statement"),
        }
    }

    #[test]
    fn test_var_without_initializer() {
        let program = parse("var x");
        assert!(matches!(&program.statements[0], Stmt::Var { initializer: None, .. }));
    }

    #[test]
    fn test_precedence_mul_binds_tighter() {
        let program = parse("1 + 2 * 3");
        match &program.statements[0] {
            Stmt::Expr { expr: Expr::Binary { op: BinaryOp::Add, right, .. } } => {
                assert!(matches!(**right, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("expected addition at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_logical_and_binds_tighter_than_or() {
        let program = parse("a || b && c");
        match &program.statements[0] {
            Stmt::Expr { expr: Expr::Logical { op: LogicalOp::Or, right, .. } } => {
                assert!(matches!(**right, Expr::Logical { op: LogicalOp::And, .. }));
            }
            other => panic!("expected || at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_function_literal() {
        let program = parse("var add = (a, b) => { return a + b; };");
        match &program.statements[0] {
            Stmt::Var { initializer: Some(Expr::Function { decl, .. }), .. } => {
                assert_eq!(decl.params, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(decl.body.len(), 1);
            }
            other => panic!("expected function literal, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_param_function_vs_grouping() {
        let program = parse("var f = () => { }; (f);");
        assert!(matches!(
            &program.statements[0],
            Stmt::Var { initializer: Some(Expr::Function { .. }), .. }
        ));
        assert!(matches!(
            &program.statements[1],
            Stmt::Expr { expr: Expr::Grouping { .. } }
        ));
    }

    #[test]
    fn test_if_else_chain() {
        let program = parse("if (x > 0) { y = 1; } else if (x < 0) { y = 2; } else { y = 3; }");
        match &program.statements[0] {
            Stmt::If { else_branch: Some(else_branch), .. } => {
                assert!(matches!(&else_branch[0], Stmt::If { else_branch: Some(_), .. }));
            }
            _ => panic!("expected if statement"),
        }
    }

    #[test]
    fn test_for_with_all_clauses_empty() {
        let program = parse("for (;;) { return; }");
        assert!(matches!(
            &program.statements[0],
            Stmt::For { init: None, condition: None, increment: None, .. }
        ));
    }

    #[test]
    fn test_array_object_and_get() {
        let program = parse(r#"{ a: [1, 2], "b": 3, [k]: 4 }.a[0]"#);
        match &program.statements[0] {
            Stmt::Expr { expr: Expr::Get { object, .. } } => match &**object {
                Expr::Get { object, .. } => match &**object {
                    Expr::Object { entries, .. } => assert_eq!(entries.len(), 3),
                    other => panic!("expected object literal, got {:?}", other),
                },
                other => panic!("expected property access, got {:?}", other),
            },
            other => panic!("expected index access, got {:?}", other),
        }
    }

    #[test]
    fn test_node_ids_are_unique_and_offset() {
        let mut lexer = Lexer::new("a = b + c;");
        let mut parser = Parser::with_id_offset(lexer.tokenize().unwrap(), 10);
        parser.parse().unwrap();
        assert_eq!(parser.next_id(), 13);
    }

    #[test]
    fn test_unmatched_paren() {
        assert_eq!(parse_err("(1 + 2"), ParseErrorKind::UnmatchedParen);
        assert_eq!(parse_err("f(1, 2"), ParseErrorKind::UnmatchedParen);
    }

    #[test]
    fn test_expected_expression() {
        assert_eq!(parse_err("1 + ;"), ParseErrorKind::ExpectedExpression(";".to_string()));
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert_eq!(parse_err("1 = 2;"), ParseErrorKind::InvalidAssignmentTarget);
    }

    #[test]
    fn test_missing_semicolon_between_statements() {
        assert!(matches!(parse_err("var a = 1 var b = 2"), ParseErrorKind::ExpectedToken { .. }));
    }
}
