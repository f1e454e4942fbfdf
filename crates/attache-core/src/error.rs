//! Error types for the attache pipeline.

use thiserror::Error;

use crate::models::AttachmentId;

/// Result type alias using attache's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for attache operations.
///
/// Every variant is local to one attachment or one call; none of them abort
/// sibling attachments or the collection.
#[derive(Error, Debug)]
pub enum Error {
    /// Attachment not found in the collection
    #[error("Attachment not found: {0}")]
    AttachmentNotFound(AttachmentId),

    /// Invalid argument (e.g. converter index out of range)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Source could not be loaded or decoded
    #[error("Input error: {0}")]
    Input(String),

    /// Converter execution failed
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Inlining is not possible for the attachment in its current state
    #[error("Inline unavailable: {0}")]
    InlineUnavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_attachment_not_found() {
        let id = AttachmentId::new();
        let err = Error::AttachmentNotFound(id);
        assert_eq!(err.to_string(), format!("Attachment not found: {}", id));
    }

    #[test]
    fn test_error_display_input() {
        let err = Error::Input("no content".to_string());
        assert_eq!(err.to_string(), "Input error: no content");
    }

    #[test]
    fn test_error_display_conversion() {
        let err = Error::Conversion("no table found".to_string());
        assert_eq!(err.to_string(), "Conversion error: no table found");
    }

    #[test]
    fn test_error_display_inline_unavailable() {
        let err = Error::InlineUnavailable("no outputs".to_string());
        assert_eq!(err.to_string(), "Inline unavailable: no outputs");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("index 4 out of range".to_string());
        assert_eq!(err.to_string(), "Invalid input: index 4 out of range");
    }

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.to_string().contains("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
