use std::{fs, path::Path, rc::Rc};

/// `Source` represents one unit of Scheme input: a file on disk,
/// a line typed at the repl, or an embedded snippet. It's a string
/// plus a label naming where the text came from; the label is what
/// error reports blame.
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    pub contents: String,
    pub label: String,
}

impl Source {
    /// Read a source file from disk; the label is its path.
    pub fn file(path: &Path) -> std::io::Result<Rc<Source>> {
        Ok(Rc::new(Source {
            contents: fs::read_to_string(path)?,
            label: path.display().to_string(),
        }))
    }

    /// One line of repl input.
    pub fn repl(line: &str) -> Rc<Source> {
        Rc::new(Source {
            contents: line.to_string(),
            label: "<repl>".to_string(),
        })
    }

    /// An embedded snippet, as used by tests and doc examples.
    pub fn source(text: &str) -> Rc<Source> {
        Rc::new(Source {
            contents: text.to_string(),
            label: "<snippet>".to_string(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn labels_name_the_origin() {
        assert_eq!(Source::repl("(+ 1 2)").label, "<repl>");

        let snippet = Source::source("(car x)");
        assert_eq!(snippet.label, "<snippet>");
        assert_eq!(snippet.contents, "(car x)");
    }
}
