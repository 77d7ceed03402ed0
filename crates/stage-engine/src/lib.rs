//! `stage-engine`
//!
//! The stateful [`AxisEngine`]: wraps an [`AxisBackend`](stage_core::AxisBackend)
//! and a [`ConfigStore`](stage_core::ConfigStore) and implements
//! [`Positioner`](stage_core::Positioner).
//!
//! ```rust,ignore
//! use stage_core::{MemoryStore, Positioner, StatusCode};
//! use stage_driver_mock::MockAxisBackend;
//! use stage_engine::AxisEngine;
//!
//! let engine = AxisEngine::with_defaults(
//!     "focus",
//!     Arc::new(MockAxisBackend::new()),
//!     Arc::new(MemoryStore::new()),
//! )
//! .await?;
//!
//! assert_eq!(engine.initialize().await?, StatusCode::Ok);
//! assert_eq!(engine.move_absolute(2.0).await?, StatusCode::Ok);
//! ```

mod engine;
pub mod error;
pub mod options;

pub use engine::AxisEngine;
pub use error::EngineError;
pub use options::EngineOptions;
