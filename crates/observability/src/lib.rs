//! Tracing and logging setup shared by every binary.

/// Subscriber configuration (filters, output format).
pub mod tracing;

pub use tracing::{LOG_FORMAT_VAR, LogFormat};

/// Initialize process-wide logging from `RUST_LOG` and `STUDIO_LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
