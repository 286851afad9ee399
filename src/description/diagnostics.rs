//! JSON error diagnostics for template descriptions

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Syntax or shape error in `template_description.json`, with source location
#[derive(Debug, Error, Diagnostic)]
#[error("invalid template description: {message}")]
#[diagnostic(code(tfmgr::description::syntax))]
pub struct DescriptionSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    /// The underlying error message
    message: String,
}

impl DescriptionSyntaxError {
    /// Create a syntax error from a serde_json error
    pub fn from_serde_error(err: &serde_json::Error, source: &str, filename: &str) -> Self {
        let offset =
            line_col_to_offset(source, err.line().max(1), err.column().max(1)).min(source.len());
        let len = usize::from(offset < source.len());
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from((offset, len)),
            help,
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }
}

/// Convert line/column to byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    let mut current_line = 1;

    for (i, ch) in source.char_indices() {
        if current_line == line {
            let line_start = i;
            let mut col = 1;
            for (j, c) in source[line_start..].char_indices() {
                if col == column {
                    return line_start + j;
                }
                if c == '\n' {
                    break;
                }
                col += 1;
            }
            return line_start + column.saturating_sub(1);
        }
        if ch == '\n' {
            current_line += 1;
        }
        offset = i;
    }

    offset
}

/// Generate helpful suggestions based on error message
fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("missing field `authors`") {
        return Some(
            "List the template authors: \"Authors\": [\"Jane Doe\", \"John Roe\"]".to_string(),
        );
    }

    if msg_lower.contains("trailing comma") {
        return Some("JSON does not allow a comma after the last item.".to_string());
    }

    if msg_lower.contains("key must be a string") {
        return Some("Object keys must be double-quoted: \"Name\": \"...\"".to_string());
    }

    if msg_lower.contains("expected `,` or") {
        return Some("Separate items and members with commas.".to_string());
    }

    if msg_lower.contains("invalid type") {
        return Some(
            "Check the value types: Authors and ReferencesAndLinks are lists of strings."
                .to_string(),
        );
    }

    None
}
