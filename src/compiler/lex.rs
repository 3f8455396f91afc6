//! A partial Scheme lexer based on R5RS 7.1.1 (Lexical structure).
//!
//! The token language is regular, so the lexer is a prioritized
//! ruleset of anchored regular expressions: at each position the
//! rules are tried in order and the first that matches wins.

use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::common::source::Source;
use crate::common::span::{Span, Spanned};
use crate::compiler::syntax::Syntax;

/// A single token. Numbers keep their raw spelling; the radix
/// prefix is decoded by the parser, which owns number errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    LParen,
    RParen,
    Quote,
    Boolean(bool),
    Number(String),
    Ident(String),
    /// `;` to end of line. Produced, then discarded by the parser.
    Comment,
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    Comment,
    Boolean,
    Number,
    Ident,
    LParen,
    RParen,
    Quote,
}

static RULES: Lazy<Vec<(Rule, Regex)>> = Lazy::new(|| {
    let number = r"\#b[0-1]+|\#o[0-7]+|(?:\#d)?[0-9]+|\#x[0-9A-Fa-f]+";

    // R5RS identifiers: an initial followed by subsequents, or one
    // of the peculiar identifiers `+`, `-`, `...` (a lone `.` falls
    // out of the initial class, which includes it).
    let initial = r"[a-zA-Z!$%&*.:<=>?^_~]";
    let subsequent = r"[a-zA-Z!$%&*.:<=>?^_~0-9+\-.@]";
    let identifier = format!(r"{}{}*|\.\.\.|[+\-.]", initial, subsequent);

    let anchored = |pattern: &str| Regex::new(&format!(r"^(?:{})", pattern)).unwrap();

    vec![
        (Rule::Comment, anchored(r";[^\n]*")),
        (Rule::Boolean, anchored(r"\#[tf]")),
        (Rule::Number, anchored(number)),
        (Rule::Ident, anchored(&identifier)),
        (Rule::LParen, anchored(r"\(")),
        (Rule::RParen, anchored(r"\)")),
        (Rule::Quote, anchored(r"'")),
    ]
});

/// Lexes a source file into a stream of spanned tokens.
pub fn lex(source: Rc<Source>) -> Result<Vec<Spanned<Token>>, Syntax> {
    let mut lexer = Lexer { source, index: 0 };
    let mut tokens = vec![];

    lexer.strip();
    while lexer.index < lexer.source.contents.len() {
        tokens.push(lexer.next_token()?);
        lexer.strip();
    }

    Ok(tokens)
}

struct Lexer {
    source: Rc<Source>,
    index: usize,
}

impl Lexer {
    /// Consume whitespace. Comments are tokens, not whitespace.
    fn strip(&mut self) {
        let rest = &self.source.contents[self.index..];
        let stripped = rest.trim_start();
        self.index += rest.len() - stripped.len();
    }

    /// Match the rules in priority order at the current position.
    fn next_token(&mut self) -> Result<Spanned<Token>, Syntax> {
        let rest = &self.source.contents[self.index..];

        for (rule, regex) in RULES.iter() {
            let matched = match regex.find(rest) {
                Some(m) => m.as_str(),
                None => continue,
            };

            let token = match rule {
                Rule::Comment => Token::Comment,
                Rule::Boolean => Token::Boolean(matched == "#t"),
                Rule::Number => Token::Number(matched.to_string()),
                Rule::Ident => Token::Ident(matched.to_string()),
                Rule::LParen => Token::LParen,
                Rule::RParen => Token::RParen,
                Rule::Quote => Token::Quote,
            };

            let span = Span::new(&self.source, self.index, matched.len());
            self.index += matched.len();
            return Ok(Spanned::new(token, span));
        }

        Err(Syntax::lex(
            &format!(
                "unrecognized character `{}`",
                rest.chars().next().unwrap_or('?'),
            ),
            &Span::point(&self.source, self.index),
        ))
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn tokens(code: &str) -> Vec<Token> {
        lex(Source::source(code))
            .unwrap()
            .into_iter()
            .map(|spanned| spanned.item)
            .collect()
    }

    #[test]
    fn parens_and_quote() {
        assert_eq!(
            tokens("('())"),
            vec![
                Token::LParen,
                Token::Quote,
                Token::LParen,
                Token::RParen,
                Token::RParen,
            ],
        );
    }

    #[test]
    fn booleans() {
        assert_eq!(
            tokens("#t #f"),
            vec![Token::Boolean(true), Token::Boolean(false)],
        );
    }

    #[test]
    fn numbers_keep_their_radix_spelling() {
        assert_eq!(
            tokens("42 #x2A #b101010 #o52 #d42"),
            vec![
                Token::Number("42".to_string()),
                Token::Number("#x2A".to_string()),
                Token::Number("#b101010".to_string()),
                Token::Number("#o52".to_string()),
                Token::Number("#d42".to_string()),
            ],
        );
    }

    #[test]
    fn peculiar_identifiers() {
        assert_eq!(
            tokens("+ - . ... set-car! eqv? a->b"),
            vec![
                Token::Ident("+".to_string()),
                Token::Ident("-".to_string()),
                Token::Ident(".".to_string()),
                Token::Ident("...".to_string()),
                Token::Ident("set-car!".to_string()),
                Token::Ident("eqv?".to_string()),
                Token::Ident("a->b".to_string()),
            ],
        );
    }

    #[test]
    fn comments_are_tokens() {
        assert_eq!(
            tokens("1 ; the rest of the line\n2"),
            vec![
                Token::Number("1".to_string()),
                Token::Comment,
                Token::Number("2".to_string()),
            ],
        );
    }

    #[test]
    fn spans_point_into_the_source() {
        let source = Source::source("  (car x)");
        let lexed = lex(source).unwrap();
        assert_eq!(lexed[0].span.coord(), Some((1, 3)));
        assert_eq!(lexed[1].span.contents(), Some("car"));
    }

    #[test]
    fn unrecognized_character() {
        let result = lex(Source::source("(car [x])"));
        assert!(result.is_err());
    }

    #[test]
    fn empty_source() {
        assert_eq!(tokens(""), vec![]);
        assert_eq!(tokens("   \n  "), vec![]);
    }

    proptest! {
        #[test]
        fn never_panics(code in "\\PC*") {
            let _ = lex(Source::source(&code));
        }

        #[test]
        fn decimal_integers_lex_as_one_number(n in 0u64..1_000_000_000) {
            let lexed = tokens(&n.to_string());
            prop_assert_eq!(lexed, vec![Token::Number(n.to_string())]);
        }
    }
}
