use std::fmt::{Display, Formatter};

use crate::common::span::Span;

/// Which phase rejected the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    Lex,
    Parse,
    Compile,
}

impl Display for SyntaxKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SyntaxKind::Lex => "Lex",
            SyntaxKind::Parse => "Parse",
            SyntaxKind::Compile => "Compile",
        };
        write!(f, "{}", name)
    }
}

/// Represents a static error found at compile time.
/// Lex and parse errors carry a `Span` pointing into the source;
/// compile errors work on parsed data, which has no positions,
/// so their span is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntax {
    pub kind: SyntaxKind,
    pub reason: String,
    pub span: Span,
}

impl Syntax {
    pub fn lex(reason: &str, span: &Span) -> Syntax {
        Syntax { kind: SyntaxKind::Lex, reason: reason.to_string(), span: span.clone() }
    }

    pub fn parse(reason: &str, span: &Span) -> Syntax {
        Syntax { kind: SyntaxKind::Parse, reason: reason.to_string(), span: span.clone() }
    }

    pub fn compile(reason: &str) -> Syntax {
        Syntax {
            kind: SyntaxKind::Compile,
            reason: reason.to_string(),
            span: Span::empty(),
        }
    }
}

impl Display for Syntax {
    /// Blames the origin first, then shows the offending line,
    /// then states the error:
    /// ```plain
    /// In <repl> [line 1, column 5]
    ///   |
    /// 1 | (car
    ///   |     ^
    /// Parse Error: unmatched parentheses at end of input
    /// ```
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some((line, column)) = self.span.coord() {
            writeln!(
                f,
                "In {} [line {}, column {}]",
                self.span.label().unwrap_or("<unknown>"),
                line,
                column,
            )?;
            write!(f, "{}", self.span)?;
        }
        write!(f, "{} Error: {}", self.kind, self.reason)
    }
}

impl std::error::Error for Syntax {}

impl From<crate::common::form::FormError> for Syntax {
    fn from(error: crate::common::form::FormError) -> Syntax {
        Syntax::compile(&error.message)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::source::Source;

    #[test]
    fn spanned_error_renders_coordinates() {
        let source = Source::source("(car '(1 2)\n  (cdr))");
        let error = Syntax::parse("unmatched parentheses", &Span::point(&source, 14));

        let rendered = format!("{}", error);
        assert!(rendered.starts_with("In <snippet> [line 2, column 3]"));
        assert!(rendered.contains("2 |   (cdr))"));
        assert!(rendered.ends_with("Parse Error: unmatched parentheses"));
    }

    #[test]
    fn spanless_error_renders_bare() {
        let error = Syntax::compile("expected symbol in formals list");
        assert_eq!(
            format!("{}", error),
            "Compile Error: expected symbol in formals list",
        );
    }
}
