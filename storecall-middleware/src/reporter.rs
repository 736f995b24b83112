//! Error reporting.

use crate::error::StoreCallError;
use tracing::warn;

/// Diagnostic sink for store-call failures.
///
/// Called once for every failure that becomes a failure action. Reporting
/// never changes what the middleware emits or returns.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &StoreCallError);
}

/// Logs failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &StoreCallError) {
        warn!(code = error.code(), error = %error, "store call failed");
    }
}

/// A recording reporter for testing.
pub mod mock {
    use super::*;
    use std::sync::{Mutex, PoisonError};

    /// Records the code and message of every reported error.
    #[derive(Debug, Default)]
    pub struct RecordingReporter {
        reports: Mutex<Vec<(String, String)>>,
    }

    impl RecordingReporter {
        pub fn new() -> Self {
            Self::default()
        }

        /// `(code, message)` of every report, in order.
        pub fn reports(&self) -> Vec<(String, String)> {
            self.reports
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        pub fn codes(&self) -> Vec<String> {
            self.reports().into_iter().map(|(code, _)| code).collect()
        }

        pub fn len(&self) -> usize {
            self.reports().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, error: &StoreCallError) {
            self.reports
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((error.code().to_string(), error.to_string()));
        }
    }
}
