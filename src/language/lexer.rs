use crate::language::{
    span::Span,
    token::{Token, TokenKind},
};

#[derive(Clone, Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// Scans a PHP source into tokens. Lexing never gives up: characters that
/// cannot start a token are skipped and reported, so the parser always has
/// a stream to work with.
pub fn lex(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let lexer = Lexer::new(source);
    lexer.run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    current: Option<char>,
    offset: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let mut chars = src.chars();
        let current = chars.next();
        Self {
            src,
            chars,
            current,
            offset: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> (Vec<Token>, Vec<LexError>) {
        while let Some(ch) = self.current {
            match ch {
                '/' if self.peek() == Some('/') => self.eat_line_comment(),
                '/' if self.peek() == Some('*') => self.eat_block_comment(),
                '#' => {
                    self.bump();
                    self.eat_until_newline();
                }
                ch if ch.is_whitespace() => {
                    self.bump();
                }
                ch if ch.is_ascii_alphabetic() || ch == '_' => self.lex_identifier(),
                ch if ch.is_ascii_digit() => self.lex_number(),
                '"' => self.lex_string('"'),
                '\'' => self.lex_string('\''),
                '$' => self.lex_variable(),
                _ => self.lex_symbol(),
            }
        }
        self.push_token(TokenKind::Eof, self.offset, self.offset);

        (self.tokens, self.errors)
    }

    fn bump(&mut self) -> Option<char> {
        if let Some(ch) = self.current {
            self.offset += ch.len_utf8();
        }
        self.current = self.chars.next();
        self.current
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn push_token(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, end),
        });
    }

    fn error(&mut self, start: usize, end: usize, message: impl Into<String>) {
        self.errors.push(LexError {
            message: message.into(),
            span: Span::new(start, end),
        });
    }

    fn eat_line_comment(&mut self) {
        self.bump();
        self.bump();
        self.eat_until_newline();
    }

    fn eat_until_newline(&mut self) {
        while let Some(ch) = self.current {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn eat_block_comment(&mut self) {
        self.bump();
        self.bump();
        while let Some(ch) = self.current {
            if ch == '*' && self.peek() == Some('/') {
                self.bump();
                self.bump();
                return;
            }
            self.bump();
        }
        self.error(self.offset, self.offset, "Unterminated block comment");
    }

    fn lex_identifier(&mut self) {
        let start = self.offset;
        while let Some(ch) = self.current {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }

        let end = self.offset;
        let slice = &self.src[start..end];
        let kind = match slice {
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            _ => TokenKind::Identifier(slice.to_string()),
        };
        self.push_token(kind, start, end);
    }

    fn lex_number(&mut self) {
        let start = self.offset;
        while let Some(ch) = self.current {
            if ch.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }

        let end = self.offset;
        let text = &self.src[start..end];
        match text.parse::<i64>() {
            Ok(value) => self.push_token(TokenKind::Integer(value), start, end),
            Err(_) => self.error(start, end, "Invalid integer literal"),
        }
    }

    // The content between the quotes is taken verbatim: a backslash keeps
    // itself and the character after it, and only an unescaped matching
    // quote terminates the literal. No escape sequences are translated.
    fn lex_string(&mut self, quote: char) {
        let start = self.offset;
        self.bump();
        let mut value = String::new();
        while let Some(ch) = self.current {
            if ch == quote {
                self.bump();
                let end = self.offset;
                self.push_token(TokenKind::String(value), start, end);
                return;
            }
            if ch == '\\' {
                value.push('\\');
                self.bump();
                if let Some(escaped) = self.current {
                    value.push(escaped);
                    self.bump();
                } else {
                    break;
                }
                continue;
            }
            value.push(ch);
            self.bump();
        }
        self.error(start, self.offset, "Unterminated string literal");
    }

    fn lex_variable(&mut self) {
        let start = self.offset;
        self.bump();
        let name_start = self.offset;
        match self.current {
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {}
            _ => {
                self.error(start, self.offset, "Expected variable name after '$'");
                return;
            }
        }
        while let Some(ch) = self.current {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let end = self.offset;
        let name = self.src[name_start..end].to_string();
        self.push_token(TokenKind::Variable(name), start, end);
    }

    fn lex_symbol(&mut self) {
        let start = self.offset;
        let ch = self.current;
        match ch {
            Some('(') => self.single(TokenKind::LParen),
            Some(')') => self.single(TokenKind::RParen),
            Some('{') => self.single(TokenKind::LBrace),
            Some('}') => self.single(TokenKind::RBrace),
            Some(',') => self.single(TokenKind::Comma),
            Some(';') => self.single(TokenKind::Semi),
            Some('.') => self.single(TokenKind::Dot),
            Some('=') => {
                self.bump();
                if self.current == Some('=') {
                    self.bump();
                    // `===` compares like `==` for the values we track
                    if self.current == Some('=') {
                        self.bump();
                    }
                    self.push_token(TokenKind::EqEq, start, self.offset);
                } else {
                    self.push_token(TokenKind::Eq, start, self.offset);
                }
            }
            Some('!') => {
                self.bump();
                if self.current == Some('=') {
                    self.bump();
                    if self.current == Some('=') {
                        self.bump();
                    }
                    self.push_token(TokenKind::BangEq, start, self.offset);
                } else {
                    self.error(start, self.offset, "Unexpected character '!'");
                }
            }
            Some('<') => {
                self.bump();
                if self.current == Some('?') {
                    self.bump();
                    while let Some(ch) = self.current {
                        if ch.is_ascii_alphabetic() {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    self.push_token(TokenKind::OpenTag, start, self.offset);
                } else {
                    self.error(start, self.offset, "Unexpected character '<'");
                }
            }
            Some('?') => {
                self.bump();
                if self.current == Some('>') {
                    self.bump();
                    self.push_token(TokenKind::CloseTag, start, self.offset);
                } else {
                    self.error(start, self.offset, "Unexpected character '?'");
                }
            }
            Some(ch) => {
                self.bump();
                self.error(start, self.offset, format!("Unexpected character '{}'", ch));
            }
            None => {}
        }
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.offset;
        self.bump();
        self.push_token(kind, start, self.offset);
    }
}
