//! Workflow orchestration engine.
//!
//! Control flow: operator text enters the [`orchestrator::WorkflowOrchestrator`],
//! the [`intent::IntentParser`] produces a plan, the
//! [`validator::WorkflowValidator`] assesses risk and confirmation
//! requirements, and the [`executor::WorkflowExecutor`] runs steps in
//! dependency order with rollback bookkeeping.

pub mod executor;
pub mod intent;
pub mod orchestrator;
pub mod pseudo;
pub mod step;
pub mod validator;

pub use executor::{ExecutionReport, WorkflowExecutor};
pub use intent::IntentParser;
pub use orchestrator::{OrchestratorConfig, WorkflowOrchestrator};
pub use step::{
    ArgValue, OperationType, RiskLevel, RollbackAction, TemplateRef, WorkflowPlan, WorkflowStatus,
    WorkflowStep,
};
pub use validator::{ValidationReport, WorkflowValidator};
