use std::fmt::{Display, Formatter, Result};
use std::rc::Rc;

use crate::common::source::Source;

/// A `Span` refers to a section of a source,
/// much like a `&str`, but with a reference to a `Source` rather than a `String`.
/// A `Span` is meant to be paired with other datastructures,
/// to be used during error reporting.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Span {
    source: Option<Rc<Source>>,
    offset: usize,
    length: usize,
}

impl Span {
    /// Create a new `Span` from an offset with a length.
    /// All `Span`s have access to the `Source` from whence they came,
    /// so they can't be misinterpreted or miscombined.
    pub fn new(source: &Rc<Source>, offset: usize, length: usize) -> Span {
        Span { source: Some(Rc::clone(source)), offset, length }
    }

    /// A `Span` that points at a specific byte in the source.
    pub fn point(source: &Rc<Source>, offset: usize) -> Span {
        Span { source: Some(Rc::clone(source)), offset, length: 1 }
    }

    /// Create a new empty `Span`.
    /// An empty `Span` has no source; if combined with another `Span`,
    /// the resulting `Span` will just be the other.
    pub fn empty() -> Span {
        Span { source: None, offset: 0, length: 0 }
    }

    /// Checks if a `Span` is empty.
    pub fn is_empty(&self) -> bool {
        self.source.is_none()
    }

    /// Creates a new `Span` which spans the space of the previous two.
    /// ```plain
    /// hello this is cool
    /// ^^^^^              | Span a
    ///            ^^      | Span b
    /// ^^^^^^^^^^^^^      | combined
    /// ```
    pub fn combine(a: &Span, b: &Span) -> Span {
        if a.is_empty() { return b.clone(); }
        if b.is_empty() { return a.clone(); }

        let offset = a.offset.min(b.offset);
        let end    = (a.offset + a.length).max(b.offset + b.length);
        let length = end - offset;

        Span::new(a.source.as_ref().unwrap(), offset, length)
    }

    /// Returns the contents of a `Span`.
    /// An empty `Span` has no contents.
    pub fn contents(&self) -> Option<&str> {
        let source = self.source.as_ref()?;
        source.contents.get(self.offset..(self.offset + self.length))
    }

    /// The label of the source this `Span` points into.
    pub fn label(&self) -> Option<&str> {
        Some(self.source.as_ref()?.label.as_str())
    }

    /// The one-based `(line, column)` coordinate of the start of this `Span`.
    pub fn coord(&self) -> Option<(usize, usize)> {
        let source = self.source.as_ref()?;
        let before = &source.contents[..self.offset.min(source.contents.len())];

        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(newline) => self.offset - newline,
            None => self.offset + 1,
        };

        Some((line, column))
    }
}

impl Display for Span {
    /// Given a `Span`, `fmt` will print out where the `Span` occurs in its
    /// source:
    /// ```plain
    /// 2 | (define (f x) (+ x y))
    ///   |                    ^
    /// ```
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let (line, column) = match self.coord() {
            Some(coord) => coord,
            None => return Ok(()),
        };

        let source = self.source.as_ref().unwrap();
        let text = source.contents.lines().nth(line - 1).unwrap_or("");

        let room    = text.len().saturating_sub(column - 1).max(1);
        let line_no = line.to_string();
        let padding = " ".repeat(line_no.len());
        let carets  = "^".repeat(self.length.clamp(1, room));

        writeln!(f, "{} |", padding)?;
        writeln!(f, "{} | {}", line_no, text)?;
        writeln!(f, "{} | {}{}", padding, " ".repeat(column - 1), carets)
    }
}

/// A wrapper for spanning types.
/// For example, a token can be spanned to indicate
/// where it was lexed from (a `Spanned<Token>`).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Spanned<T> {
    pub item: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(item: T, span: Span) -> Spanned<T> {
        Spanned { item, span }
    }
}
