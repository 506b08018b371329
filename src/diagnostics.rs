/// Sink for the store's diagnostic messages.
///
/// The store only needs these three severities, so any logging backend can
/// sit behind it. An instance is created once at startup and shared.
pub trait Diagnostics: Send + Sync + 'static {
    fn debug(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards diagnostics to `tracing` under the `tinyurl::store` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "tinyurl::store", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "tinyurl::store", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "tinyurl::store", "{message}");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn debug(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}
