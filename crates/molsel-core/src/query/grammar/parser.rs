//! Recursive descent parser producing an untyped [`Term`] tree.
//!
//! The grammar is deliberately small:
//!
//! ```text
//! term    = primary ("." IDENT "(" args ")")*
//! primary = IDENT "(" args ")" | STRING | NUMBER | object | "(" term ")"
//! args    = (term ("," term)*)?
//! object  = "{" (key ":" term ("," key ":" term)*)? "}"
//! key     = IDENT | STRING
//! ```
//!
//! A method call `x.f(a, b)` is sugar for `f(x, a, b)`; the receiver becomes the first
//! argument. Whether a call names a query, a predicate or a selector is decided later,
//! when the tree is lowered.

use super::error::ParseError;
use super::token::{SpannedToken, Token};

/// Deepest accepted nesting of calls, groups, objects and method links.
pub const MAX_NESTING: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub kind: TermKind,
    pub span: (usize, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TermKind {
    Call {
        name: String,
        name_span: (usize, usize),
        args: Vec<Term>,
    },
    Str(String),
    Number(f64),
    Object(Vec<Field>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub key_span: (usize, usize),
    pub value: Term,
}

pub struct Parser<'a> {
    tokens: Vec<SpannedToken>,
    pos: usize,
    input: &'a str,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<SpannedToken>, input: &'a str) -> Self {
        Self {
            tokens,
            pos: 0,
            input,
        }
    }

    pub fn parse(mut self) -> Result<Term, ParseError> {
        if self.current().token == Token::Eof {
            return Err(self.err_here("Empty query"));
        }
        let term = self.parse_term(0)?;
        if self.current().token != Token::Eof {
            return Err(self.err_here(format!(
                "Unexpected {} after the end of the query",
                self.current().token.describe()
            )));
        }
        Ok(term)
    }

    fn current(&self) -> &SpannedToken {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> SpannedToken {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn err_here(&self, msg: impl Into<String>) -> ParseError {
        ParseError::new(msg, self.current().span, self.input)
    }

    fn expect(&mut self, expected: Token) -> Result<SpannedToken, ParseError> {
        if self.current().token == expected {
            Ok(self.advance())
        } else {
            Err(self.err_here(format!(
                "Expected {}, found {}",
                expected.describe(),
                self.current().token.describe()
            )))
        }
    }

    fn check_nesting(&self, depth: usize) -> Result<(), ParseError> {
        if depth > MAX_NESTING {
            Err(self.err_here(format!(
                "Query nesting too deep (more than {} levels)",
                MAX_NESTING
            )))
        } else {
            Ok(())
        }
    }

    fn parse_term(&mut self, depth: usize) -> Result<Term, ParseError> {
        self.check_nesting(depth)?;
        let mut term = self.parse_primary(depth)?;
        let mut links = 0;
        while self.current().token == Token::Dot {
            links += 1;
            self.check_nesting(depth + links)?;
            self.advance();
            let name_tok = self.advance();
            let name = match name_tok.token {
                Token::Ident(name) => name,
                other => {
                    return Err(ParseError::new(
                        format!("Expected a method name after '.', found {}", other.describe()),
                        name_tok.span,
                        self.input,
                    ));
                }
            };
            self.expect(Token::LParen)?;
            let mut args = vec![term];
            args.extend(self.parse_args(depth + links + 1)?);
            let end = self.expect(Token::RParen)?.span.1;
            let start = args[0].span.0;
            term = Term {
                kind: TermKind::Call {
                    name,
                    name_span: name_tok.span,
                    args,
                },
                span: (start, end),
            };
        }
        Ok(term)
    }

    fn parse_primary(&mut self, depth: usize) -> Result<Term, ParseError> {
        let tok = self.current().clone();
        match tok.token {
            Token::Ident(name) => {
                self.advance();
                self.expect(Token::LParen)?;
                let args = self.parse_args(depth + 1)?;
                let end = self.expect(Token::RParen)?.span.1;
                Ok(Term {
                    kind: TermKind::Call {
                        name,
                        name_span: tok.span,
                        args,
                    },
                    span: (tok.span.0, end),
                })
            }
            Token::Str(s) => {
                self.advance();
                Ok(Term {
                    kind: TermKind::Str(s),
                    span: tok.span,
                })
            }
            Token::Number(n) => {
                self.advance();
                Ok(Term {
                    kind: TermKind::Number(n),
                    span: tok.span,
                })
            }
            Token::LBrace => self.parse_object(depth + 1),
            Token::LParen => {
                self.advance();
                let inner = self.parse_term(depth + 1)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            other => Err(self.err_here(format!("Expected an expression, found {}", other.describe()))),
        }
    }

    fn parse_args(&mut self, depth: usize) -> Result<Vec<Term>, ParseError> {
        let mut args = Vec::new();
        if self.current().token == Token::RParen {
            return Ok(args);
        }
        args.push(self.parse_term(depth)?);
        while self.current().token == Token::Comma {
            self.advance();
            args.push(self.parse_term(depth)?);
        }
        Ok(args)
    }

    fn parse_object(&mut self, depth: usize) -> Result<Term, ParseError> {
        self.check_nesting(depth)?;
        let start = self.expect(Token::LBrace)?.span.0;
        let mut fields = Vec::new();
        if self.current().token != Token::RBrace {
            loop {
                let key_tok = self.advance();
                let key = match key_tok.token {
                    Token::Ident(k) | Token::Str(k) => k,
                    other => {
                        return Err(ParseError::new(
                            format!("Expected a field name, found {}", other.describe()),
                            key_tok.span,
                            self.input,
                        ));
                    }
                };
                self.expect(Token::Colon)?;
                let value = self.parse_term(depth)?;
                fields.push(Field {
                    key,
                    key_span: key_tok.span,
                    value,
                });
                if self.current().token != Token::Comma {
                    break;
                }
                self.advance();
            }
        }
        let end = self.expect(Token::RBrace)?.span.1;
        Ok(Term {
            kind: TermKind::Object(fields),
            span: (start, end),
        })
    }
}
