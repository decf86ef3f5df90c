//! Sandboxed component execution.
//!
//! The registry never evaluates component code. Loading a component hands
//! the verified code to an embedder-supplied executor together with the
//! only imports it may resolve.

use crate::address::ComponentAddress;
use crate::error::RegistryResult;
use async_trait::async_trait;
use serde_json::Value;

/// A verified component ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionUnit {
    pub address: ComponentAddress,
    pub code: String,
    pub state: Option<Value>,
}

/// Runs component code in an isolated environment.
#[async_trait]
pub trait ComponentExecutor: Send + Sync {
    /// Evaluates `unit`, resolving only `allowed_imports`, and returns the
    /// component's exported value.
    async fn execute(&self, unit: &ExecutionUnit, allowed_imports: &[String])
    -> RegistryResult<Value>;
}

/// A recording executor for testing.
pub mod mock {
    use super::*;
    use crate::error::RegistryError;
    use std::sync::{Mutex, PoisonError};

    /// One recorded execution.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Execution {
        pub unit: ExecutionUnit,
        pub allowed_imports: Vec<String>,
    }

    /// Records every unit it is asked to run and returns a fixed outcome.
    #[derive(Debug)]
    pub struct RecordingExecutor {
        outcome: Result<Value, String>,
        calls: Mutex<Vec<Execution>>,
    }

    impl RecordingExecutor {
        /// Succeeds with `value` for every unit.
        pub fn returning(value: Value) -> Self {
            Self {
                outcome: Ok(value),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Fails with `reason` for every unit.
        pub fn failing(reason: impl Into<String>) -> Self {
            Self {
                outcome: Err(reason.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Every execution so far, oldest first.
        pub fn calls(&self) -> Vec<Execution> {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }
    }

    #[async_trait]
    impl ComponentExecutor for RecordingExecutor {
        async fn execute(
            &self,
            unit: &ExecutionUnit,
            allowed_imports: &[String],
        ) -> RegistryResult<Value> {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(Execution {
                unit: unit.clone(),
                allowed_imports: allowed_imports.to_vec(),
            });
            self.outcome.clone().map_err(RegistryError::Execution)
        }
    }
}
