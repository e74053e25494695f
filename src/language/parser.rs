use crate::language::{
    ast::*,
    errors::SyntaxError,
    lexer::lex,
    span::Span,
    token::{Token, TokenKind},
};

/// A parse never fails outright: the tree covers every statement that could
/// be recovered, and `errors` carries everything that could not.
pub struct ParseResult {
    pub program: Program,
    pub errors: Vec<SyntaxError>,
}

pub fn parse_source(source: &str) -> ParseResult {
    let (tokens, lex_errors) = lex(source);
    let mut errors: Vec<SyntaxError> = lex_errors.into_iter().map(SyntaxError::from).collect();
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    errors.append(&mut parser.errors);
    ParseResult { program, errors }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
    last_span: Option<Span>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            last_span: None,
        }
    }

    fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();

        while !self.is_eof() {
            if self.matches(TokenKind::Semi)
                || self.matches(TokenKind::OpenTag)
                || self.matches(TokenKind::CloseTag)
            {
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.report(err);
                    self.synchronize();
                }
            }
        }

        Program { statements }
    }

    fn parse_statement(&mut self) -> Result<Stmt, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Function) => self.parse_function().map(Stmt::Function),
            Some(TokenKind::Return) => self.parse_return().map(Stmt::Return),
            Some(TokenKind::If) => self.parse_if().map(Stmt::If),
            _ => {
                let expr = self.parse_expression()?;
                if let Err(err) = self.expect(TokenKind::Semi, "Expected ';' after expression") {
                    self.report(err.with_help("Statements end with ';'"));
                }
                Ok(Stmt::Expr(ExprStmt { expr }))
            }
        }
    }

    fn parse_function(&mut self) -> Result<FunctionDef, SyntaxError> {
        let start = self.expect(TokenKind::Function, "Expected 'function'")?.start;
        let name = self.expect_identifier("Expected function name")?;
        self.expect(TokenKind::LParen, "Expected '(' after function name")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let param = self.expect_variable("Expected parameter name")?;
                params.push(param.name);
                if self.matches(TokenKind::Comma) {
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen, "Expected ')' after parameters")?;
        self.expect(TokenKind::LBrace, "Expected '{' to start the function body")?;
        let body = self.parse_block_body();
        let end = self
            .expect(TokenKind::RBrace, "Expected '}' after function body")?
            .end;
        Ok(FunctionDef {
            name,
            params,
            body,
            span: Span::new(start, end),
        })
    }

    fn parse_return(&mut self) -> Result<ReturnStmt, SyntaxError> {
        let start = self.expect(TokenKind::Return, "Expected 'return'")?.start;
        let expr = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        if let Err(err) = self.expect(TokenKind::Semi, "Expected ';' after return value") {
            self.report(err);
        }
        Ok(ReturnStmt {
            expr,
            span: Span::new(start, self.last_span_end(start)),
        })
    }

    fn parse_if(&mut self) -> Result<IfStmt, SyntaxError> {
        let start = self.expect(TokenKind::If, "Expected 'if'")?.start;
        self.expect(TokenKind::LParen, "Expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen, "Expected ')' after condition")?;
        self.expect(TokenKind::LBrace, "Expected '{' to start the 'if' branch")?;
        let then_branch = self.parse_block_body();
        self.expect(TokenKind::RBrace, "Expected '}' after 'if' branch")?;

        let else_branch = if self.matches(TokenKind::Else) {
            if self.check(&TokenKind::If) {
                let nested = self.parse_if()?;
                Some(vec![Stmt::If(nested)])
            } else {
                self.expect(TokenKind::LBrace, "Expected '{' after 'else'")?;
                let body = self.parse_block_body();
                self.expect(TokenKind::RBrace, "Expected '}' after 'else' branch")?;
                Some(body)
            }
        } else {
            None
        };

        Ok(IfStmt {
            condition,
            then_branch,
            else_branch,
            span: Span::new(start, self.last_span_end(start)),
        })
    }

    fn parse_block_body(&mut self) -> Vec<Stmt> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(err) => {
                    self.report(err);
                    self.synchronize();
                }
            }
        }
        body
    }

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        // assignment is right-associative
        if let Some(TokenKind::Variable(_)) = self.peek_kind() {
            if matches!(self.peek_kind_at(1), Some(TokenKind::Eq)) {
                let target = self.expect_variable("Expected variable")?;
                self.expect(TokenKind::Eq, "Expected '='")?;
                let value = self.parse_expression()?;
                let span = Span::new(target.span.start, self.last_span_end(target.span.start));
                return Ok(Expr::Assign(Box::new(AssignExpr {
                    target,
                    value,
                    span,
                })));
            }
        }
        self.parse_equality()
    }

    fn parse_equality(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_concat()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::EqEq) => BinaryOp::Equal,
                Some(TokenKind::BangEq) => BinaryOp::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_concat()?;
            let span = Span::new(expr.span().start, right.span().end);
            expr = Expr::Binary(Box::new(BinaryExpr {
                op,
                left: expr,
                right,
                span,
            }));
        }

        Ok(expr)
    }

    fn parse_concat(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;

        while self.check(&TokenKind::Dot) {
            self.advance();
            let right = self.parse_primary()?;
            let span = Span::new(expr.span().start, right.span().end);
            expr = Expr::Binary(Box::new(BinaryExpr {
                op: BinaryOp::Concat,
                left: expr,
                right,
                span,
            }));
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::String(value),
                span,
            }) => Ok(Expr::Literal(Literal::String(value, span))),
            Some(Token {
                kind: TokenKind::Integer(value),
                span,
            }) => Ok(Expr::Literal(Literal::Int(value, span))),
            Some(Token {
                kind: TokenKind::Variable(name),
                span,
            }) => Ok(Expr::Variable(Variable { name, span })),
            Some(Token {
                kind: TokenKind::Identifier(name),
                span,
            }) => {
                let name = Identifier { name, span };
                if self.check(&TokenKind::LParen) {
                    self.parse_call(name)
                } else {
                    Ok(Expr::ConstFetch(name))
                }
            }
            Some(Token {
                kind: TokenKind::LParen,
                ..
            }) => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "Expected ')' after expression")?;
                Ok(expr)
            }
            Some(Token {
                kind: TokenKind::Eof,
                span,
            }) => Err(SyntaxError::new(
                "Unexpected end of input while reading expression",
                span,
            )),
            Some(token) => Err(SyntaxError::new(
                format!("Unexpected token {:?} in expression", token.kind),
                token.span,
            )),
            None => Err(SyntaxError::new(
                "Unexpected end of input while reading expression",
                self.eof_span(),
            )),
        }
    }

    fn parse_call(&mut self, name: Identifier) -> Result<Expr, SyntaxError> {
        self.expect(TokenKind::LParen, "Expected '(' after function name")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.matches(TokenKind::Comma) {
                    continue;
                }
                break;
            }
        }
        let end = self
            .expect(TokenKind::RParen, "Expected ')' after arguments")?
            .end;
        let span = Span::new(name.span.start, end);
        Ok(Expr::Call(Box::new(CallExpr { name, args, span })))
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Span, SyntaxError> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                let span = token.span;
                self.advance();
                Ok(span)
            }
            Some(token) => Err(SyntaxError::new(
                format!("{}: found {:?}", message, token.kind),
                token.span,
            )),
            None => Err(SyntaxError::new(
                format!("{}: reached end of input", message),
                self.eof_span(),
            )),
        }
    }

    fn expect_identifier(&mut self, message: &str) -> Result<Identifier, SyntaxError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Identifier(name),
                span,
            }) => Ok(Identifier { name, span }),
            Some(token) => Err(SyntaxError::new(
                format!("{}: found {:?}", message, token.kind),
                token.span,
            )),
            None => Err(SyntaxError::new(
                format!("{}: reached end of input", message),
                self.eof_span(),
            )),
        }
    }

    fn expect_variable(&mut self, message: &str) -> Result<Variable, SyntaxError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Variable(name),
                span,
            }) => Ok(Variable { name, span }),
            Some(token) => Err(SyntaxError::new(
                format!("{}: found {:?}", message, token.kind),
                token.span,
            )),
            None => Err(SyntaxError::new(
                format!("{}: reached end of input", message),
                self.eof_span(),
            )),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|token| &token.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if let Some(token) = &token {
            self.pos += 1;
            self.last_span = Some(token.span);
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        matches!(self.peek_kind(), Some(found) if found == kind)
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek_kind(), None | Some(TokenKind::Eof))
    }

    fn eof_span(&self) -> Span {
        match self.last_span.as_ref().or_else(|| {
            self.tokens.last().map(|token| &token.span)
        }) {
            Some(span) => Span::new(span.end, span.end),
            None => Span::new(0, 0),
        }
    }

    fn last_span_end(&self, fallback: usize) -> usize {
        self.last_span.map(|span| span.end).unwrap_or(fallback)
    }

    fn report(&mut self, err: SyntaxError) {
        self.errors.push(err);
    }

    fn synchronize(&mut self) {
        while !self.is_eof() {
            if matches!(self.peek_kind(), Some(TokenKind::Semi)) {
                self.advance();
                break;
            }
            if matches!(self.peek_kind(), Some(TokenKind::RBrace)) {
                break;
            }
            self.advance();
        }
    }
}
