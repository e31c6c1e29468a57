// ABOUTME: Error types for article extraction: ErrorCode enum and ExtractError struct.
// ABOUTME: ArticleNotFound is the one recoverable failure; everything else is absorbed upstream.

use std::fmt;

/// Error codes representing the categories of extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No candidate qualified, or every retry attempt ran thin.
    ArticleNotFound,
    /// The input could not be read or parsed at all.
    ReadInput,
    /// An internal invariant was violated mid-mutation.
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ArticleNotFound => "article not found",
            ErrorCode::ReadInput => "input error",
            ErrorCode::Internal => "internal error",
        };
        write!(f, "{}", s)
    }
}

/// The main error type for extraction operations.
#[derive(Debug, thiserror::Error)]
pub struct ExtractError {
    pub code: ErrorCode,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "artscr: {}: {}", self.op, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ExtractError {
    /// Create an ArticleNotFound error.
    pub fn article_not_found(op: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::ArticleNotFound,
            op: op.into(),
            source: None,
        }
    }

    /// Create a ReadInput error.
    pub fn read_input(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self {
            code: ErrorCode::ReadInput,
            op: op.into(),
            source,
        }
    }

    /// Create an Internal error.
    pub fn internal(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self {
            code: ErrorCode::Internal,
            op: op.into(),
            source,
        }
    }

    /// Returns true if this is an ArticleNotFound error.
    pub fn is_article_not_found(&self) -> bool {
        self.code == ErrorCode::ArticleNotFound
    }

    /// Returns true if this is a ReadInput error.
    pub fn is_read_input(&self) -> bool {
        self.code == ErrorCode::ReadInput
    }

    /// Returns true if this is an Internal error.
    pub fn is_internal(&self) -> bool {
        self.code == ErrorCode::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_op_and_code() {
        let err = ExtractError::article_not_found("parse");
        assert_eq!(err.to_string(), "artscr: parse: article not found");
        assert!(err.is_article_not_found());
    }

    #[test]
    fn test_display_includes_source() {
        let err = ExtractError::read_input("read", Some(anyhow::anyhow!("boom")));
        assert!(err.to_string().contains("boom"));
        assert!(err.is_read_input());
    }
}
