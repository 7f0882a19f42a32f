//! Orchestration façade and confirmation handshake.
//!
//! Ties parser → validator → executor together. Plans that require
//! confirmation are parked in a pending registry keyed by plan id and only
//! run after an explicit confirm call; everything else executes immediately.
//! All three entry points return JSON-serializable mappings and never leak
//! an unhandled error to the operator.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::tools::ToolClient;
use crate::workflow::executor::{ProgressCallback, WorkflowExecutor};
use crate::workflow::intent::IntentParser;
use crate::workflow::step::{RiskLevel, WorkflowPlan, WorkflowStatus};
use crate::workflow::validator::WorkflowValidator;

#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Hard-block plans assessed as high risk instead of merely requiring
    /// confirmation. Off by default; the confirmation handshake is the
    /// only gate unless an operator opts in.
    pub block_high_risk: bool,
}

/// Coordinates workflow parsing, validation, confirmation, and execution.
///
/// Owns its registries; nothing is process-global. Confirming a plan
/// removes it from the pending registry under the lock before execution, so
/// a concurrent confirm of the same id gets a clean not-found instead of a
/// double execution.
pub struct WorkflowOrchestrator {
    parser: IntentParser,
    validator: WorkflowValidator,
    executor: WorkflowExecutor,
    pending: Mutex<HashMap<String, WorkflowPlan>>,
    config: OrchestratorConfig,
}

impl WorkflowOrchestrator {
    pub fn new(client: Arc<dyn ToolClient>) -> Self {
        Self::with_config(client, OrchestratorConfig::default())
    }

    pub fn with_config(client: Arc<dyn ToolClient>, config: OrchestratorConfig) -> Self {
        Self {
            parser: IntentParser::new(),
            validator: WorkflowValidator::new(client.clone()),
            executor: WorkflowExecutor::new(client),
            pending: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Process a free-text workflow request from parse to execution, or to
    /// a parked waiting-confirmation response.
    pub async fn process_request(&self, request: &str) -> Value {
        let mut plan = match self.parser.parse(request) {
            Ok(plan) => plan,
            Err(e) => {
                return json!({"success": false, "error": e.to_string()});
            }
        };

        let validation = self.validator.validate(&plan);
        if !validation.valid {
            return json!({
                "success": false,
                "error": "Workflow validation failed",
                "errors": validation.errors,
                "warnings": validation.warnings,
            });
        }

        // The assessed score can raise the template's initial risk level,
        // never lower it.
        plan.risk_level = plan.risk_level.max(validation.risk_assessment.level);

        if self.config.block_high_risk && plan.risk_level == RiskLevel::High {
            return json!({
                "success": false,
                "error": "Workflow blocked: high risk requires secondary approval",
                "risk_assessment": validation.risk_assessment,
            });
        }

        // Either the parser's flag or the computed score can force the
        // handshake.
        if plan.requires_confirmation || validation.risk_assessment.requires_confirmation {
            plan.status = WorkflowStatus::WaitingConfirmation;
            info!(workflow_id = %plan.id, title = %plan.title, "workflow parked for confirmation");

            let response = json!({
                "success": true,
                "status": "confirmation_required",
                "workflow_id": plan.id,
                "workflow": {
                    "title": plan.title,
                    "description": plan.description,
                    "steps": plan.steps.iter().map(|s| json!({
                        "description": s.description,
                        "operation_type": s.operation_type.as_str(),
                        "risk_level": plan.risk_level,
                    })).collect::<Vec<_>>(),
                    "estimated_duration": plan.estimated_duration,
                    "risk_assessment": validation.risk_assessment,
                },
                "message": "This workflow requires confirmation. Review the steps and confirm to proceed.",
            });
            self.pending.lock().await.insert(plan.id.clone(), plan);
            return response;
        }

        self.execute(plan).await
    }

    /// Complete the confirmation handshake for a parked plan.
    pub async fn confirm(&self, workflow_id: &str, confirmed: bool) -> Value {
        let plan = self.pending.lock().await.remove(workflow_id);
        let Some(mut plan) = plan else {
            return json!({"success": false, "error": "Workflow not found or expired"});
        };

        if !confirmed {
            plan.status = WorkflowStatus::Cancelled;
            info!(workflow_id, "workflow cancelled by operator");
            return json!({
                "success": true,
                "status": "cancelled",
                "message": "Workflow cancelled by user",
            });
        }

        self.execute(plan).await
    }

    /// Progress report for a plan still parked in the pending registry.
    pub async fn status(&self, workflow_id: &str) -> Value {
        let pending = self.pending.lock().await;
        let Some(plan) = pending.get(workflow_id) else {
            return json!({"success": false, "error": "Workflow not found"});
        };

        let total = plan.total_steps();
        let completed = plan.completed_steps();
        let percentage = if total == 0 {
            0.0
        } else {
            (completed as f64 / total as f64 * 1000.0).round() / 10.0
        };
        let current_step = plan
            .steps
            .iter()
            .find(|s| s.status == WorkflowStatus::InProgress)
            .map(|s| {
                json!({
                    "id": s.id,
                    "description": s.description,
                    "operation_type": s.operation_type.as_str(),
                })
            });
        // Linear estimate over the advisory duration.
        let estimated_remaining = plan.estimated_duration.map(|minutes| {
            let ratio = if total == 0 {
                0.0
            } else {
                completed as f64 / total as f64
            };
            (f64::from(minutes) * (1.0 - ratio)) as u64
        });

        json!({
            "workflow_id": workflow_id,
            "status": plan.status.as_str(),
            "progress": {
                "completed_steps": completed,
                "total_steps": total,
                "percentage": percentage,
            },
            "current_step": current_step,
            "estimated_remaining": estimated_remaining,
        })
    }

    async fn execute(&self, mut plan: WorkflowPlan) -> Value {
        let progress: ProgressCallback = Box::new(|plan, step| {
            info!(
                workflow_id = %plan.id,
                step = %step.id,
                description = %step.description,
                "executing workflow step"
            );
        });
        let report = self.executor.execute(&mut plan, Some(&progress)).await;
        serde_json::to_value(&report)
            .unwrap_or_else(|e| json!({"success": false, "error": e.to_string()}))
    }
}
