//! Structured logging schema and subscriber setup.
//!
//! All crates use these constants for consistent structured logging fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Broken invariant, should never happen |
//! | WARN  | Attachment-local failure (load, conversion), collection unaffected |
//! | INFO  | Lifecycle events (attach, remove, clear, reload) |
//! | DEBUG | Decision points (converter selection, stale result dropped) |
//! | TRACE | Per-part detail (output sizes, rendered pages) |

use tracing_subscriber::EnvFilter;

// ============================================================================
// IDENTITY FIELDS
// ============================================================================

/// Attachment UUID being operated on.
pub const ATTACHMENT_ID: &str = "attachment_id";

/// Component within the pipeline.
/// Values: "loader", "catalog", "executor", "manager"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "load", "convert", "move", "inline"
pub const OPERATION: &str = "op";

// ============================================================================
// ENTITY FIELDS
// ============================================================================

/// Source media family ("text", "file", "url").
pub const SOURCE_MEDIA: &str = "source_media";

/// Converter type tag.
pub const CONVERTER: &str = "converter";

/// Mime type of a loaded input.
pub const MIME_TYPE: &str = "mime_type";

// ============================================================================
// MEASUREMENT FIELDS
// ============================================================================

/// Byte size of a loaded input.
pub const DATA_SIZE: &str = "data_size";

/// Number of output parts produced.
pub const OUTPUT_COUNT: &str = "output_count";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

// ============================================================================
// OUTCOME FIELDS
// ============================================================================

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Install a formatting subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }

    #[test]
    fn test_field_names_are_snake_case() {
        for field in [
            ATTACHMENT_ID,
            COMPONENT,
            OPERATION,
            SOURCE_MEDIA,
            CONVERTER,
            MIME_TYPE,
            DATA_SIZE,
            OUTPUT_COUNT,
            DURATION_MS,
            ERROR_MSG,
        ] {
            assert!(field
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }
}
