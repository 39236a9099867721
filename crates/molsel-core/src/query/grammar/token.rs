//! Lexer for the textual query grammar.

use super::error::ParseError;

/// A token with its byte span in the input string.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: (usize, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Number(f64),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Eof,
}

impl Token {
    /// Short human-readable form used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("identifier '{}'", s),
            Token::Str(s) => format!("string \"{}\"", s),
            Token::Number(n) => format!("number {}", n),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.input[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn err(&self, msg: impl Into<String>, start: usize) -> ParseError {
        ParseError::new(msg, (start, self.pos), self.input)
    }

    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            }
            let start = self.pos;
            let Some(c) = self.peek() else {
                tokens.push(SpannedToken {
                    token: Token::Eof,
                    span: (start, start),
                });
                break;
            };
            let token = match c {
                '(' | ')' | '{' | '}' | ',' | ':' | '.' => {
                    self.bump();
                    match c {
                        '(' => Token::LParen,
                        ')' => Token::RParen,
                        '{' => Token::LBrace,
                        '}' => Token::RBrace,
                        ',' => Token::Comma,
                        ':' => Token::Colon,
                        _ => Token::Dot,
                    }
                }
                '"' | '\'' => self.lex_string(c)?,
                '0'..='9' => self.lex_number()?,
                '-' if self.peek_second().is_some_and(|d| d.is_ascii_digit()) => {
                    self.lex_number()?
                }
                c if c.is_ascii_alphabetic() || c == '_' => self.lex_ident(),
                _ => {
                    self.bump();
                    return Err(self.err(format!("Unexpected character '{}'", c), start));
                }
            };
            tokens.push(SpannedToken {
                token,
                span: (start, self.pos),
            });
        }
        Ok(tokens)
    }

    fn lex_string(&mut self, quote: char) -> Result<Token, ParseError> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err("Unterminated string literal", start)),
                Some(c) if c == quote => return Ok(Token::Str(value)),
                Some('\\') => {
                    let escape_start = self.pos - 1;
                    match self.bump() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some(c @ ('\\' | '"' | '\'')) => value.push(c),
                        Some(c) => {
                            return Err(
                                self.err(format!("Unknown escape sequence '\\{}'", c), escape_start)
                            );
                        }
                        None => return Err(self.err("Unterminated string literal", start)),
                    }
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn lex_number(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        self.skip_digits();
        // A dot only belongs to the number when a digit follows, so `5.method()` stays a call.
        if self.peek() == Some('.') && self.peek_second().is_some_and(|d| d.is_ascii_digit()) {
            self.bump();
            self.skip_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let exponent = &self.input[self.pos + 1..];
            let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
            if digits.starts_with(|d: char| d.is_ascii_digit()) {
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
                self.skip_digits();
            }
        }
        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| self.err(format!("Invalid number '{}'", text), start))
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|d| d.is_ascii_digit()) {
            self.bump();
        }
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        Token::Ident(self.input[start..self.pos].to_string())
    }
}
