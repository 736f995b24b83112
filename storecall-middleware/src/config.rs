/// Marker property used when none is configured.
pub const DEFAULT_MARKER: &str = "CALL_STORE";

/// Configuration for the store-call middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareConfig {
    /// Action property carrying the store-call descriptor. Stripped from
    /// every action the middleware emits.
    pub marker: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
        }
    }
}
