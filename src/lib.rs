//! # Sitewright
//!
//! Turns free-text analytics-site administration requests ("clean up the
//! Finance project", "offboard john.doe") into validated, confirmation-gated,
//! rollback-aware multi-step workflow plans, and executes them against a
//! pluggable tool client.
//!
//! Plan state is held in memory only; nothing survives a process restart.
//!
//! ## Modules
//!
//! - `error` - Library error taxonomy
//! - `tools` - Tool name catalog and the external `ToolClient` collaborator trait
//! - `workflow` - Plan model, intent parser, validator, executor, and orchestrator

pub mod error;
pub mod tools;
pub mod workflow;

pub use error::{Error, Result};
pub use workflow::orchestrator::{OrchestratorConfig, WorkflowOrchestrator};
