//! Shared helpers for integration tests.
//!
//! - Fixed clock and seeded RNG so runs are reproducible
//! - Fake execution oracles for the async grading path

#![allow(dead_code)]

pub mod fixtures;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use practice_core::grading::{ExecutionOutcome, ExecutionOracle, Expectation, OracleError};

/// Fixed instant all tests start from.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Oracle that "runs" code by looking it up in a table of known outputs.
pub struct TableOracle {
    outputs: Vec<(String, String)>,
    pub calls: AtomicUsize,
}

impl TableOracle {
    pub fn new(outputs: &[(&str, &str)]) -> Self {
        Self {
            outputs: outputs
                .iter()
                .map(|(code, output)| (code.to_string(), output.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionOracle for TableOracle {
    async fn execute(
        &self,
        code: &str,
        expectation: &Expectation,
    ) -> Result<ExecutionOutcome, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = self
            .outputs
            .iter()
            .find(|(known, _)| known.trim() == code.trim())
            .map(|(_, output)| output.clone());

        Ok(match (output, expectation) {
            (Some(output), Expectation::Output(expected)) => ExecutionOutcome {
                success: output.trim() == expected.trim(),
                output,
                error: None,
            },
            (Some(output), Expectation::Assertion(_)) => ExecutionOutcome {
                success: true,
                output,
                error: None,
            },
            (None, _) => ExecutionOutcome {
                success: false,
                output: String::new(),
                error: Some("NameError".to_string()),
            },
        })
    }
}

/// Oracle whose sandbox never finished loading.
pub struct OfflineOracle;

#[async_trait]
impl ExecutionOracle for OfflineOracle {
    async fn is_available(&self) -> bool {
        false
    }

    async fn execute(&self, _: &str, _: &Expectation) -> Result<ExecutionOutcome, OracleError> {
        Err(OracleError::Unavailable)
    }
}

/// Oracle that fails every run.
pub struct BrokenOracle;

#[async_trait]
impl ExecutionOracle for BrokenOracle {
    async fn execute(&self, _: &str, _: &Expectation) -> Result<ExecutionOutcome, OracleError> {
        Err(OracleError::Failed("worker crashed".to_string()))
    }
}

/// Oracle that takes far longer than any grading timeout.
pub struct SlowOracle;

#[async_trait]
impl ExecutionOracle for SlowOracle {
    async fn execute(&self, _: &str, _: &Expectation) -> Result<ExecutionOutcome, OracleError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(OracleError::Failed("unreachable".to_string()))
    }
}

/// Oracle whose readiness check never answers.
pub struct StalledProbeOracle;

#[async_trait]
impl ExecutionOracle for StalledProbeOracle {
    async fn is_available(&self) -> bool {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        true
    }

    async fn execute(&self, _: &str, _: &Expectation) -> Result<ExecutionOutcome, OracleError> {
        Err(OracleError::Failed("unreachable".to_string()))
    }
}
