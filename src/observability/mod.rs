//! Observability for orchestration sessions.
//!
//! Console diagnostics use `tracing`; [`init_tracing`] installs a
//! subscriber for binaries that do not bring their own. The [`Logger`]
//! keeps a markdown transcript of agent turns, tool calls and review
//! verdicts.
//!
//! # Example
//!
//! ```no_run
//! use crewkit::observability::{init_tracing, Logger};
//! use std::collections::HashMap;
//!
//! init_tracing("info");
//! let logger = Logger::new(None, Some("DEBUG")).unwrap();
//! logger.log_session_start("review", &HashMap::new()).unwrap();
//! logger.log_agent_turn("critic", "APPROVED", 1).unwrap();
//! logger.log_completion("Review finished").unwrap();
//! ```

pub mod logger;
pub mod tracing_setup;

// Re-export main types for convenience
pub use logger::Logger;
pub use tracing_setup::init_tracing;
