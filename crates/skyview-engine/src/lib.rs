#![warn(missing_docs)]

//! Multi-direction sky obstruction queries.
//!
//! This crate sits between the wire shapes of `skyview-ir` and the geometry
//! of `skyview-geom`. It provides:
//!
//! - [`EngineConfig`], loaded once from TOML and `SKYVIEW_*` variables,
//! - the [`DirectionEvaluator`] capability with in-process
//!   ([`LocalEvaluator`]) and HTTP ([`RemoteEvaluator`]) implementations,
//! - the [`Orchestrator`], which evaluates many directions under a
//!   concurrency bound and per-direction timeouts,
//! - [`SkyviewService`], the request handlers.
//!
//! # Example
//!
//! ```
//! use skyview_engine::SkyviewService;
//! use skyview_ir::ParallelRequest;
//!
//! let service = SkyviewService::default();
//! let req = ParallelRequest::from_json(
//!     r#"{"x": 0, "y": 1.5, "z": 0, "mesh": [], "num_directions": 8}"#,
//! )?;
//! let rt = tokio::runtime::Runtime::new()?;
//! let response = rt.block_on(service.handle_parallel(&req))?;
//! assert_eq!(response.results.len(), 8);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod evaluator;
pub mod handlers;
pub mod orchestrator;
pub mod remote;

pub use config::{EngineConfig, DEFAULT_TIMEOUT_MS};
pub use error::{EngineError, EvaluationError, Result};
pub use evaluator::{DirectionEvaluator, DirectionJob, LocalEvaluator};
pub use handlers::{parallel_response, SkyviewService, SERVICE_NAME};
pub use orchestrator::{
    AggregatedResult, DirectionOutcome, DirectionPlan, DirectionState, Orchestrator,
};
pub use remote::RemoteEvaluator;
