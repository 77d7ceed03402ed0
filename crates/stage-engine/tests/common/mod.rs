//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use anyhow::Result;
use stage_core::{AxisConfig, MemoryStore};
use stage_driver_mock::MockAxisBackend;
use stage_engine::{AxisEngine, EngineOptions};
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Route engine logs to the test harness when `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Engine over `mock` with `config` pre-stored.
pub async fn engine(mock: &MockAxisBackend, config: AxisConfig) -> Result<(AxisEngine, MemoryStore)> {
    init_tracing();
    let store = MemoryStore::with_record(config.to_table()?);
    let options = EngineOptions::default().with_poll_interval(Duration::from_millis(10));
    let engine = AxisEngine::new(
        "stage",
        Arc::new(mock.clone()),
        Arc::new(store.clone()),
        options,
    )
    .await?;
    Ok((engine, store))
}

/// Motion commands the engine may issue.
pub const MOTION_COMMANDS: [&str; 7] = [
    "move_absolute_raw",
    "move_relative_raw",
    "set_target_raw",
    "find_home",
    "find_index",
    "find_lower_limit",
    "find_upper_limit",
];

/// True if `mock` never received a motion command.
pub fn no_motion(mock: &MockAxisBackend) -> bool {
    MOTION_COMMANDS.iter().all(|cmd| mock.count(cmd) == 0)
}
