//! Recursive-descent parser for a subset of Scheme, following the
//! grammar in R5RS 7.1.2 (External Representations).
//!
//! Since Scheme code is also data, the parser mimics the `(read)`
//! procedure: source text comes in, plain [`Value`]s come out.

use std::rc::Rc;

use crate::common::expr::Value;
use crate::common::source::Source;
use crate::common::span::{Span, Spanned};
use crate::compiler::lex::{lex, Token};
use crate::compiler::syntax::Syntax;

/// Parse a token stream into a sequence of datums.
pub fn parse(tokens: Vec<Spanned<Token>>, source: &Rc<Source>) -> Result<Vec<Value>, Syntax> {
    let mut parser = Parser {
        tokens: tokens
            .into_iter()
            .filter(|token| token.item != Token::Comment)
            .collect(),
        index: 0,
        end: Span::point(source, source.contents.len().saturating_sub(1)),
    };

    let mut datums = vec![];
    while parser.index < parser.tokens.len() {
        datums.push(parser.datum()?);
    }
    Ok(datums)
}

/// Lex and parse a source in one step.
pub fn parse_source(source: Rc<Source>) -> Result<Vec<Value>, Syntax> {
    let tokens = lex(Rc::clone(&source))?;
    parse(tokens, &source)
}

struct Parser {
    tokens: Vec<Spanned<Token>>,
    index: usize,
    /// Where "the input just stopped" errors point.
    end: Span,
}

impl Parser {
    fn current(&self) -> Option<&Spanned<Token>> {
        self.tokens.get(self.index)
    }

    /// The span blamed by an error at the current position.
    fn here(&self) -> Span {
        match self.current() {
            Some(token) => token.span.clone(),
            None => self.end.clone(),
        }
    }

    fn advance(&mut self) -> Option<&Spanned<Token>> {
        self.index += 1;
        self.tokens.get(self.index - 1)
    }

    /// The `match` primitive of recursive-descent parsers:
    /// require a specific token and step over it.
    fn consume(&mut self, expected: Token) -> Result<(), Syntax> {
        match self.current() {
            Some(token) if token.item == expected => {
                self.index += 1;
                Ok(())
            }
            Some(token) => Err(Syntax::parse(
                &format!("expected {:?}, found {:?}", expected, token.item),
                &token.span.clone(),
            )),
            None => Err(Syntax::parse(
                &format!("expected {:?} at end of input", expected),
                &self.here(),
            )),
        }
    }

    fn datum(&mut self) -> Result<Value, Syntax> {
        match self.current().map(|token| &token.item) {
            Some(Token::LParen) => self.list(),
            Some(Token::Quote) => self.abbreviation(),
            _ => self.simple_datum(),
        }
    }

    fn simple_datum(&mut self) -> Result<Value, Syntax> {
        let Spanned { item, span } = match self.advance() {
            Some(token) => token.clone(),
            None => {
                return Err(Syntax::parse("expected a datum at end of input", &self.here()))
            }
        };

        match item {
            Token::Boolean(b) => Ok(Value::Boolean(b)),
            Token::Number(text) => parse_number(&text, &span),
            Token::Ident(name) => Ok(Value::Symbol(name)),
            unexpected => {
                self.index -= 1;
                Err(Syntax::parse(
                    &format!("unexpected token {:?}", unexpected),
                    &span,
                ))
            }
        }
    }

    fn list(&mut self) -> Result<Value, Syntax> {
        // Parse all sub-datums into a flat list first, tracking
        // where a `.` appeared (if anywhere), then fold the result
        // into nested pairs.
        self.consume(Token::LParen)?;

        let mut items: Vec<Value> = vec![];
        let mut dot: Option<(usize, Span)> = None;

        loop {
            match self.current().map(|token| &token.item) {
                None => {
                    return Err(Syntax::parse(
                        "unmatched parentheses at end of input",
                        &self.here(),
                    ))
                }
                Some(Token::RParen) => break,
                Some(Token::Ident(name)) if name == "." => {
                    let span = self.here();
                    if dot.is_some() {
                        return Err(Syntax::parse("more than one \".\" in list", &span));
                    }
                    dot = Some((items.len(), span));
                    self.index += 1;
                }
                Some(_) => items.push(self.datum()?),
            }
        }
        self.consume(Token::RParen)?;

        // A dot is only meaningful directly before the final element.
        let mut tail = Value::Null;
        if let Some((position, span)) = dot {
            if position == 0 || position != items.len() - 1 {
                return Err(Syntax::parse("invalid location for \".\" in list", &span));
            }
            tail = items.pop().unwrap();
        }

        let mut list = tail;
        for item in items.into_iter().rev() {
            list = Value::pair(item, list);
        }
        Ok(list)
    }

    /// `'x` is shorthand for `(quote x)`.
    fn abbreviation(&mut self) -> Result<Value, Syntax> {
        self.consume(Token::Quote)?;
        let datum = self.datum()?;
        Ok(Value::list(&[Value::symbol("quote"), datum]))
    }
}

fn parse_number(text: &str, span: &Span) -> Result<Value, Syntax> {
    let (radix, digits) = match text.as_bytes() {
        [b'#', b'b', ..] => (2, &text[2..]),
        [b'#', b'o', ..] => (8, &text[2..]),
        [b'#', b'd', ..] => (10, &text[2..]),
        [b'#', b'x', ..] => (16, &text[2..]),
        _ => (10, text),
    };

    match i64::from_str_radix(digits, radix) {
        Ok(number) => Ok(Value::Number(number)),
        Err(_) => Err(Syntax::parse("invalid number literal", span)),
    }
}
