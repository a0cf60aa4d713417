//! Execution oracle: the external sandbox that runs learner code.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::GradingSettings;

/// What the oracle checks the run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Expectation {
    /// Standard output the program must produce.
    Output(String),
    /// Script that must run without raising after the program.
    Assertion(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("execution oracle is unavailable")]
    Unavailable,
    #[error("execution timed out after {0:?}")]
    Timeout(Duration),
    #[error("execution failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait ExecutionOracle: Send + Sync {
    /// Cheap readiness probe, e.g. whether the sandbox finished loading.
    async fn is_available(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        code: &str,
        expectation: &Expectation,
    ) -> Result<ExecutionOutcome, OracleError>;
}

/// Oracle handle plus the time budget for one run.
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub oracle: Option<&'a dyn ExecutionOracle>,
    pub timeout: Duration,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(oracle: &'a dyn ExecutionOracle, settings: &GradingSettings) -> Self {
        Self {
            oracle: Some(oracle),
            timeout: Duration::from_millis(settings.oracle_timeout_ms),
        }
    }

    /// Context for hosts without a sandbox.
    pub fn unavailable(settings: &GradingSettings) -> Self {
        Self {
            oracle: None,
            timeout: Duration::from_millis(settings.oracle_timeout_ms),
        }
    }

    /// Probe then run; the probe and the run share one timeout.
    pub async fn run(
        &self,
        code: &str,
        expectation: &Expectation,
    ) -> Result<ExecutionOutcome, OracleError> {
        let oracle = self.oracle.ok_or(OracleError::Unavailable)?;
        let attempt = async {
            if !oracle.is_available().await {
                return Err(OracleError::Unavailable);
            }
            oracle.execute(code, expectation).await
        };
        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout(self.timeout)),
        }
    }
}

impl std::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("oracle", &self.oracle.map(|_| "dyn ExecutionOracle"))
            .field("timeout", &self.timeout)
            .finish()
    }
}
