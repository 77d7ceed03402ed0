//! Error injection framework for the mock backend.
//!
//! Enables configurable failures for resilience testing. Failures are
//! reported as [`BackendError`]s, exactly as a real driver would.

use super::rng::MockRng;
use parking_lot::Mutex;
use stage_core::BackendError;
use std::collections::HashMap;
use std::sync::Arc;

/// Error injection configuration for mock axes
#[derive(Clone, Debug)]
pub struct ErrorConfig {
    /// Per-operation failure rate (0.0 to 1.0), `"*"` matches every operation
    failure_rates: Arc<HashMap<&'static str, f64>>,
    /// Specific failure scenarios
    scenarios: Arc<Vec<ErrorScenario>>,
    /// RNG for failure decisions
    rng: Arc<MockRng>,
    /// State tracking for scenarios
    state: Arc<Mutex<ErrorState>>,
}

/// A deterministic failure pattern
#[derive(Debug, Clone)]
pub enum ErrorScenario {
    /// Fail after N successful calls of an operation
    FailAfterN {
        /// Backend method name, e.g. `"move_absolute_raw"`
        operation: &'static str,
        /// Successful calls before failing
        count: u32,
    },
    /// Timeout on a specific operation
    Timeout {
        /// Backend method name
        operation: &'static str,
    },
    /// Communication loss on a specific operation; every later call fails too
    CommunicationLoss {
        /// Backend method name that triggers the loss
        operation: &'static str,
    },
    /// Controller fault on a specific operation; every later call fails too
    HardwareFault {
        /// Backend method name that triggers the fault
        operation: &'static str,
        /// Controller fault code
        code: u32,
    },
}

#[derive(Default, Debug)]
struct ErrorState {
    /// Operation counters for FailAfterN scenarios
    operation_counts: HashMap<&'static str, u32>,
    /// Whether communication is lost
    communication_lost: bool,
    /// Hardware fault code (0 = no fault)
    hardware_fault_code: u32,
}

impl ErrorConfig {
    /// Create error config with no errors (default)
    pub fn none() -> Self {
        Self::scenarios(Vec::new())
    }

    /// Create error config with uniform random failures and optional seed
    pub fn random_failures_seeded(rate: f64, seed: Option<u64>) -> Self {
        let mut rates = HashMap::new();
        rates.insert("*", rate);
        Self {
            failure_rates: Arc::new(rates),
            scenarios: Arc::new(Vec::new()),
            rng: Arc::new(MockRng::new(seed)),
            state: Arc::new(Mutex::new(ErrorState::default())),
        }
    }

    /// Create error config with a single scenario
    pub fn scenario(scenario: ErrorScenario) -> Self {
        Self::scenarios(vec![scenario])
    }

    /// Create error config with multiple scenarios
    pub fn scenarios(scenarios: Vec<ErrorScenario>) -> Self {
        Self {
            failure_rates: Arc::new(HashMap::new()),
            scenarios: Arc::new(scenarios),
            rng: Arc::new(MockRng::new(Some(0))),
            state: Arc::new(Mutex::new(ErrorState::default())),
        }
    }

    /// Check if an operation should fail and return the matching error
    pub fn check_operation(&self, operation: &'static str) -> Result<(), BackendError> {
        let mut state = self.state.lock();

        if state.communication_lost {
            return Err(BackendError::Communication("communication lost".into()));
        }

        if state.hardware_fault_code != 0 {
            return Err(BackendError::Hardware(format!(
                "controller fault {}",
                state.hardware_fault_code
            )));
        }

        for scenario in self.scenarios.iter() {
            match scenario {
                ErrorScenario::FailAfterN {
                    operation: op,
                    count,
                } if *op == operation => {
                    let current = state.operation_counts.entry(operation).or_insert(0);
                    *current += 1;
                    if *current > *count {
                        return Err(BackendError::Hardware(format!(
                            "injected failure after {count} {operation} calls"
                        )));
                    }
                }
                ErrorScenario::Timeout { operation: op } if *op == operation => {
                    return Err(BackendError::Timeout(format!(
                        "operation '{operation}' timed out"
                    )));
                }
                ErrorScenario::CommunicationLoss { operation: op } if *op == operation => {
                    state.communication_lost = true;
                    return Err(BackendError::Communication("communication lost".into()));
                }
                ErrorScenario::HardwareFault {
                    operation: op,
                    code,
                } if *op == operation => {
                    state.hardware_fault_code = *code;
                    return Err(BackendError::Hardware(format!("controller fault {code}")));
                }
                _ => {}
            }
        }

        let rate = self
            .failure_rates
            .get(operation)
            .or_else(|| self.failure_rates.get("*"))
            .copied()
            .unwrap_or(0.0);

        if self.rng.should_fail(rate) {
            return Err(BackendError::Communication(format!(
                "random failure on operation '{operation}'"
            )));
        }

        Ok(())
    }

    /// Reset error state (clear counters, faults)
    pub fn reset(&self) {
        *self.state.lock() = ErrorState::default();
    }
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_errors() {
        let config = ErrorConfig::none();
        for _ in 0..100 {
            assert!(config.check_operation("position_raw").is_ok());
        }
    }

    #[test]
    fn test_random_failures() {
        let config = ErrorConfig::random_failures_seeded(0.5, Some(42));
        let failures = (0..1000)
            .filter(|_| config.check_operation("position_raw").is_err())
            .count();
        assert!(failures > 400 && failures < 600, "Got {} failures", failures);
    }

    #[test]
    fn test_fail_after_n() {
        let config = ErrorConfig::scenario(ErrorScenario::FailAfterN {
            operation: "move_absolute_raw",
            count: 2,
        });

        assert!(config.check_operation("move_absolute_raw").is_ok());
        assert!(config.check_operation("move_absolute_raw").is_ok());
        assert!(config.check_operation("position_raw").is_ok());
        assert!(config.check_operation("move_absolute_raw").is_err());

        config.reset();
        assert!(config.check_operation("move_absolute_raw").is_ok());
    }

    #[test]
    fn test_timeout_scenario() {
        let config = ErrorConfig::scenario(ErrorScenario::Timeout {
            operation: "find_home",
        });
        assert!(matches!(
            config.check_operation("find_home"),
            Err(BackendError::Timeout(msg)) if msg.contains("timed out")
        ));
        assert!(config.check_operation("find_index").is_ok());
    }

    #[test]
    fn test_communication_loss_is_sticky() {
        let config = ErrorConfig::scenario(ErrorScenario::CommunicationLoss {
            operation: "is_ready",
        });

        assert!(config.check_operation("position_raw").is_ok());
        assert!(matches!(
            config.check_operation("is_ready"),
            Err(BackendError::Communication(_))
        ));
        assert!(matches!(
            config.check_operation("position_raw"),
            Err(BackendError::Communication(_))
        ));
    }

    #[test]
    fn test_hardware_fault() {
        let config = ErrorConfig::scenario(ErrorScenario::HardwareFault {
            operation: "enable",
            code: 0x42,
        });

        let err = config.check_operation("enable").unwrap_err();
        assert!(matches!(&err, BackendError::Hardware(msg) if msg.contains("66")));
        assert!(config.check_operation("is_enabled").is_err());
    }
}
