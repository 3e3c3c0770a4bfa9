use nom_language::error::{VerboseError, VerboseErrorKind};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while turning a header into its JSON description
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("cannot read {}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("cannot parse {}: {error}", path.display())]
    Parse { path: PathBuf, error: SyntaxError },

    #[error("cannot serialize the declarations of {}", path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cannot write the description of {} to {}", path.display(), output.display())]
    Write {
        path: PathBuf,
        output: PathBuf,
        source: io::Error,
    },

    #[error("cannot locate the directory of the running executable")]
    OutputLocation { source: io::Error },
}

const SNIPPET_LENGTH: usize = 60;

/// Where and why the header parser gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: expected {expected} near '{snippet}'")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub expected: String,
    pub snippet: String,
}

impl SyntaxError {
    /// Builds the error for a failure at `remaining`, which must be a suffix of `source`.
    pub fn at(source: &str, remaining: &str, expected: impl Into<String>) -> Self {
        let offset = source.len().saturating_sub(remaining.len());
        let before = &source[..offset];
        let line_start = before.rfind('\n').map_or(0, |newline| newline + 1);
        let line_end = source[offset..]
            .find('\n')
            .map_or(source.len(), |newline| offset + newline);

        let line_text = source[line_start..line_end].trim();
        let snippet = if line_text.is_empty() && remaining.trim().is_empty() {
            "<end of input>".to_string()
        } else if line_text.chars().count() > SNIPPET_LENGTH {
            format!("{}...", line_text.chars().take(SNIPPET_LENGTH).collect::<String>())
        } else {
            line_text.to_string()
        };

        SyntaxError {
            line: before.matches('\n').count() + 1,
            column: source[line_start..offset].chars().count() + 1,
            expected: expected.into(),
            snippet,
        }
    }

    /// The first entry of a [`VerboseError`] is the innermost position; the
    /// innermost context names what was expected there.
    pub fn locate(source: &str, error: &VerboseError<&str>) -> Self {
        let remaining = error.errors.first().map_or("", |(input, _)| *input);
        let expected = error
            .errors
            .iter()
            .find_map(|(_, kind)| match kind {
                VerboseErrorKind::Context(context) => Some(context.to_string()),
                _ => None,
            })
            .or_else(|| {
                error.errors.first().map(|(_, kind)| match kind {
                    VerboseErrorKind::Char(c) => format!("'{c}'"),
                    VerboseErrorKind::Nom(kind) => kind.description().to_lowercase(),
                    VerboseErrorKind::Context(context) => context.to_string(),
                })
            })
            .unwrap_or_else(|| "a declaration".to_string());

        SyntaxError::at(source, remaining, expected)
    }

    pub fn from_nom(source: &str, error: nom::Err<VerboseError<&str>>) -> Self {
        match error {
            nom::Err::Error(error) | nom::Err::Failure(error) => SyntaxError::locate(source, &error),
            nom::Err::Incomplete(_) => SyntaxError::at(source, "", "more input"),
        }
    }
}
