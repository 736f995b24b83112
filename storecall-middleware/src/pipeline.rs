//! The host pipeline's downstream dispatch.

use storecall_types::Action;

/// Receives every action the middleware forwards or emits.
///
/// Actions are delivered in emission order. For one invocation the request
/// action always arrives before its success or failure actions.
pub trait Next: Send + Sync {
    fn next(&self, action: Action);
}

impl<F> Next for F
where
    F: Fn(Action) + Send + Sync,
{
    fn next(&self, action: Action) {
        self(action)
    }
}

/// A recording pipeline for testing.
pub mod mock {
    use super::*;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    /// Records every action it receives.
    #[derive(Debug, Default)]
    pub struct RecordingNext {
        actions: Mutex<Vec<Action>>,
    }

    impl RecordingNext {
        pub fn new() -> Self {
            Self::default()
        }

        fn lock(&self) -> MutexGuard<'_, Vec<Action>> {
            self.actions.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// All actions received so far.
        pub fn actions(&self) -> Vec<Action> {
            self.lock().clone()
        }

        /// The `type` of every action received so far.
        pub fn types(&self) -> Vec<String> {
            self.lock()
                .iter()
                .map(|a| a.action_type().unwrap_or_default().to_string())
                .collect()
        }

        pub fn len(&self) -> usize {
            self.lock().len()
        }

        pub fn is_empty(&self) -> bool {
            self.lock().is_empty()
        }

        /// The most recent action.
        pub fn last(&self) -> Option<Action> {
            self.lock().last().cloned()
        }

        /// Removes and returns everything recorded.
        pub fn take(&self) -> Vec<Action> {
            std::mem::take(&mut *self.lock())
        }
    }

    impl Next for RecordingNext {
        fn next(&self, action: Action) {
            self.lock().push(action);
        }
    }
}
