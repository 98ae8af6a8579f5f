//! The closed set of error kinds produced anywhere in the pipeline, plus
//! source-span rendering for the CLI's `check` subcommand.

use crate::token::Span;
use crate::style::Style;

/// A closed set of error kinds. Every failure in the pipeline is tagged
/// with exactly one of these; nothing downstream needs to pattern-match
/// on message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    UnsupportedExpression,
    UnknownLabel,
    UnknownCommand,
    UnknownExtension,
    InvalidValue,
    MaxIterations,
    MissingFeedbackInput,
    CommandFailed,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::UnsupportedExpression => "unsupported_expression",
            ErrorKind::UnknownLabel => "unknown_label",
            ErrorKind::UnknownCommand => "unknown_command",
            ErrorKind::UnknownExtension => "unknown_extension",
            ErrorKind::InvalidValue => "invalid_value",
            ErrorKind::MaxIterations => "max_iterations",
            ErrorKind::MissingFeedbackInput => "missing_feedback_input",
            ErrorKind::CommandFailed => "command_failed",
        };
        write!(f, "{}", label)
    }
}

/// An error produced during lexing, parsing, or lowering — i.e. before any
/// instruction has executed — carrying the span of the offending text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaveError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
}

impl WeaveError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self { kind, message: message.into(), span }
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Syntax, message, span)
    }

    /// Render the error with a source excerpt and a caret/underline under
    /// the offending span, colorized the same way the CLI colors its
    /// other diagnostics.
    pub fn display_with_source(&self, source: &str) -> String {
        let (line_num, line_start, line_content) = find_context(source, self.span.start);
        let col = self.span.start.saturating_sub(line_start);
        let len = (self.span.end - self.span.start).max(1);
        let underline = format!("{}{}", " ".repeat(col), "^".repeat(len));

        let error_label = Style::bold_red("error");
        let line_num_str = Style::blue(&format!("{:4}", line_num));
        let pipe = Style::blue("|");
        let underline_colored = Style::red(&underline);

        format!(
            "{}: [{}] {}\n\n{} {} {}\n     {} {}",
            error_label, self.kind, self.message, line_num_str, pipe, line_content, pipe, underline_colored
        )
    }
}

impl std::fmt::Display for WeaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for WeaveError {}

fn find_context(source: &str, offset: usize) -> (usize, usize, &str) {
    let mut line_num = 1;
    let mut line_start = 0;

    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line_num += 1;
            line_start = i + 1;
        }
    }

    let line_end = source[line_start..]
        .find('\n')
        .map(|off| line_start + off)
        .unwrap_or(source.len());

    (line_num, line_start, &source[line_start..line_end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_source_shows_line_and_underline() {
        let error = WeaveError::syntax("expected ')'", Span::new(8, 14));
        let source = "if (x > 0 { }";
        let display = error.display_with_source(source);
        assert!(display.contains("^^^^^^"), "should underline the span: {}", display);
    }

    #[test]
    fn kind_renders_as_closed_label() {
        assert_eq!(ErrorKind::UnknownLabel.to_string(), "unknown_label");
    }
}
