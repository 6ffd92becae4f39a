//! Error types for folio

use thiserror::Error;

/// Main error type for folio
#[derive(Debug, Error)]
pub enum FolioError {
    #[error("The maximum tag depth of '{max_depth}' has been reached")]
    DepthExceeded { max_depth: usize },

    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Duplicate label: {}", .0.join(", "))]
    DuplicateLabel(Vec<String>),

    #[error("Label not found: {0}")]
    LabelNotFound(String),

    #[error("A receiver with order '{order}' already exists for signal '{signal}'")]
    DuplicateRegistration { signal: String, order: i32 },

    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),
}

impl FolioError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            FolioError::DepthExceeded { .. } | FolioError::Syntax { .. } => 2,
            FolioError::DuplicateLabel(_) => 3,
            FolioError::LabelNotFound(_) => 4,
            _ => 1,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn display_with_suggestions(&self) -> String {
        match self {
            FolioError::DepthExceeded { max_depth } => {
                format!(
                    "{}\n\n\
                    Suggestions:\n\
                    • Check for tags nested inside themselves\n\
                    • Raise 'tag_max_depth' (currently {}) if the nesting is intended",
                    self, max_depth
                )
            }
            FolioError::Syntax { line, .. } => {
                format!(
                    "{}\n\n\
                    Suggestions:\n\
                    • Check that every tag on or after line {} closes its braces\n\
                    • Check that attribute brackets '[...]' are closed",
                    self, line
                )
            }
            FolioError::DuplicateLabel(ids) => {
                format!(
                    "{}\n\n\
                    Label identifiers must be unique across all documents in a project.\n\
                    Rename one of: {}",
                    self,
                    ids.join(", ")
                )
            }
            FolioError::LabelNotFound(id) => {
                format!(
                    "{}\n\n\
                    Suggestions:\n\
                    • Check the spelling of '{}'\n\
                    • Prefix the id with its document, e.g. 'chapter1::{}'\n\
                    • Make sure the document defining it is included in the project",
                    self, id, id
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Result type using FolioError
pub type Result<T> = std::result::Result<T, FolioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(FolioError::DepthExceeded { max_depth: 3 }.exit_code(), 2);
        assert_eq!(
            FolioError::Syntax {
                line: 1,
                message: "x".to_string()
            }
            .exit_code(),
            2
        );
        assert_eq!(FolioError::DuplicateLabel(vec![]).exit_code(), 3);
        assert_eq!(FolioError::LabelNotFound("a".to_string()).exit_code(), 4);
        assert_eq!(FolioError::Config("bad".to_string()).exit_code(), 1);
    }

    #[test]
    fn test_duplicate_label_lists_every_id() {
        let err = FolioError::DuplicateLabel(vec!["fig:a".to_string(), "ch:b".to_string()]);
        assert_eq!(err.to_string(), "Duplicate label: fig:a, ch:b");
        assert!(err.display_with_suggestions().contains("Rename one of: fig:a, ch:b"));
    }

    #[test]
    fn test_syntax_error_mentions_line() {
        let err = FolioError::Syntax {
            line: 7,
            message: "tag 'b' was not closed".to_string(),
        };
        let msg = err.display_with_suggestions();
        assert!(msg.starts_with("Syntax error on line 7"));
        assert!(msg.contains("line 7 closes"));
    }

    #[test]
    fn test_label_not_found_suggestions() {
        let err = FolioError::LabelNotFound("intro".to_string());
        let msg = err.display_with_suggestions();
        assert!(msg.contains("chapter1::intro"));
        assert!(msg.contains("included in the project"));
    }

    #[test]
    fn test_other_errors_fallback() {
        let err = FolioError::UnknownTag("blink".to_string());
        assert_eq!(err.display_with_suggestions(), "Unknown tag: blink");
    }
}
