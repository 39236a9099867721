//! Syntax errors with a source span.

use thiserror::Error;

/// A syntax or lowering error, pointing at the offending part of the input.
///
/// `span` holds byte offsets into `input`; the rendered caret is aligned by characters.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Query syntax error: {message}{}", caret(.input, .span))]
pub struct ParseError {
    pub message: String,
    pub span: (usize, usize),
    pub input: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: (usize, usize), input: &str) -> Self {
        Self {
            message: message.into(),
            span,
            input: input.to_string(),
        }
    }
}

fn caret(input: &str, span: &(usize, usize)) -> String {
    let (start, end) = *span;
    let (Some(before), Some(marked)) = (input.get(..start), input.get(start..end.max(start))) else {
        return String::new();
    };
    let offset = before.chars().count();
    let width = marked.chars().count().max(1);
    format!("\n  {}\n  {}{}", input, " ".repeat(offset), "^".repeat(width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_underlines_the_span() {
        let err = ParseError::new("Unknown function 'foo'", (4, 7), "all.foo()");
        assert_eq!(
            err.to_string(),
            "Query syntax error: Unknown function 'foo'\n  all.foo()\n      ^^^"
        );
    }

    #[test]
    fn caret_is_aligned_by_characters() {
        let err = ParseError::new("Unexpected character", (7, 8), "\"αβ\" ?");
        assert!(err.to_string().ends_with("\n  \"αβ\" ?\n       ^"));
    }

    #[test]
    fn empty_span_at_end_still_renders_a_caret() {
        let err = ParseError::new("Unexpected end of input", (3, 3), "or(");
        assert!(err.to_string().ends_with("\n  or(\n     ^"));
    }
}
