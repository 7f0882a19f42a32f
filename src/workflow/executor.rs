//! Plan execution with progress tracking, template resolution, and rollback.
//!
//! Steps run sequentially in a topological order over the dependency graph;
//! independent branches are not parallelized. Each completed step with a
//! rollback descriptor pushes a record onto the executor's rollback stack,
//! and a later failure replays this plan's records in strict reverse of
//! completion order, best-effort.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::tools::{normalize_output, ExternalTool, ToolArgs, ToolClient, ToolName};
use crate::workflow::pseudo;
use crate::workflow::step::{
    ArgValue, RollbackAction, TemplateRef, WorkflowPlan, WorkflowStatus, WorkflowStep,
};

/// Invoked before each step is dispatched.
pub type ProgressCallback = Box<dyn Fn(&WorkflowPlan, &WorkflowStep) + Send + Sync>;

/// Stack entry created the moment a step with a rollback descriptor
/// completes; consumed in reverse order if the plan later fails.
#[derive(Debug, Clone)]
pub struct RollbackRecord {
    pub step_id: String,
    pub description: String,
    pub action: RollbackAction,
    pub workflow_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationRecord {
    pub step: String,
    pub status: WorkflowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    pub workflow_title: String,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub total_execution_time: f64,
    pub operations_performed: Vec<OperationRecord>,
}

/// Structured outcome of one execution attempt. Nothing escapes the
/// executor as an unhandled error; failures are folded in here.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub workflow_id: String,
    pub completed_steps: usize,
    pub total_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    pub rollback_performed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rolled_back_steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_summary: Option<ExecutionSummary>,
}

struct ExecutionFailure {
    step_id: Option<String>,
    message: String,
}

/// Executes plans against the tool client and the pseudo-tool catalog.
///
/// The active registry and rollback stack are instance state; two executors
/// never share them, and two plans on one executor only touch their own
/// entries.
pub struct WorkflowExecutor {
    client: Arc<dyn ToolClient>,
    active: Mutex<HashSet<String>>,
    rollback_stack: Mutex<Vec<RollbackRecord>>,
}

impl WorkflowExecutor {
    pub fn new(client: Arc<dyn ToolClient>) -> Self {
        Self {
            client,
            active: Mutex::new(HashSet::new()),
            rollback_stack: Mutex::new(Vec::new()),
        }
    }

    /// Ids of plans currently executing.
    pub async fn active_workflows(&self) -> Vec<String> {
        self.active.lock().await.iter().cloned().collect()
    }

    pub async fn execute(
        &self,
        plan: &mut WorkflowPlan,
        progress: Option<&ProgressCallback>,
    ) -> ExecutionReport {
        plan.status = WorkflowStatus::InProgress;
        self.active.lock().await.insert(plan.id.clone());

        let outcome = self.run_steps(plan, progress).await;

        // Registry cleanup happens on every exit path.
        self.active.lock().await.remove(&plan.id);

        match outcome {
            Ok(()) => {
                plan.status = WorkflowStatus::Completed;
                // Records for a finished plan are dead weight; purge them.
                self.take_rollback_records(&plan.id).await;
                info!(workflow_id = %plan.id, "workflow completed");
                ExecutionReport {
                    success: true,
                    workflow_id: plan.id.clone(),
                    completed_steps: plan.completed_steps(),
                    total_steps: plan.total_steps(),
                    error: None,
                    failed_step: None,
                    rollback_performed: false,
                    rolled_back_steps: Vec::new(),
                    execution_summary: Some(self.summarize(plan)),
                }
            }
            Err(failure) => {
                let (rollback_performed, rolled_back_steps) = self.handle_failure(plan).await;
                ExecutionReport {
                    success: false,
                    workflow_id: plan.id.clone(),
                    completed_steps: plan.completed_steps(),
                    total_steps: plan.total_steps(),
                    error: Some(failure.message),
                    failed_step: failure.step_id,
                    rollback_performed,
                    rolled_back_steps,
                    execution_summary: None,
                }
            }
        }
    }

    async fn run_steps(
        &self,
        plan: &mut WorkflowPlan,
        progress: Option<&ProgressCallback>,
    ) -> Result<(), ExecutionFailure> {
        let order = plan.execution_order().map_err(|e| ExecutionFailure {
            step_id: None,
            message: e.to_string(),
        })?;

        for step_id in &order {
            let Some(idx) = plan.steps.iter().position(|s| &s.id == step_id) else {
                continue;
            };

            plan.steps[idx].status = WorkflowStatus::InProgress;
            if let Some(cb) = progress {
                cb(plan, &plan.steps[idx]);
            }
            debug!(workflow_id = %plan.id, step = %step_id, "executing step");

            let resolved = resolve_arguments(&plan.steps[idx].arguments, &plan.steps);
            let started = Instant::now();
            let result = self.dispatch(plan.steps[idx].tool, &resolved).await;
            let elapsed = started.elapsed().as_secs_f64();

            let workflow_id = plan.id.clone();
            let step = &mut plan.steps[idx];
            step.execution_time = Some(elapsed);

            match result {
                Ok(value) => {
                    step.status = WorkflowStatus::Completed;
                    step.result = Some(value);
                    if let Some(action) = step.rollback.clone() {
                        self.rollback_stack.lock().await.push(RollbackRecord {
                            step_id: step.id.clone(),
                            description: step.description.clone(),
                            action,
                            workflow_id,
                        });
                    }
                }
                Err(e) => {
                    // Any executor-caught error aborts the plan.
                    step.status = WorkflowStatus::Failed;
                    let message = e.to_string();
                    step.error = Some(message.clone());
                    error!(step = %step.id, error = %message, "step execution failed");
                    return Err(ExecutionFailure {
                        step_id: Some(step.id.clone()),
                        message: format!("Workflow failed at step: {}", step.description),
                    });
                }
            }
        }

        Ok(())
    }

    async fn dispatch(&self, tool: ToolName, args: &ToolArgs) -> anyhow::Result<Value> {
        let raw = match tool {
            ToolName::External(t) => self.call_external(t, args).await?,
            ToolName::Workflow(t) => pseudo::dispatch(t, args).await?,
        };
        Ok(normalize_output(raw))
    }

    async fn call_external(&self, tool: ExternalTool, args: &ToolArgs) -> anyhow::Result<Value> {
        match tool {
            ExternalTool::SearchWorkbooks => self.client.search_workbooks(args).await,
            ExternalTool::SearchDatasources => self.client.search_datasources(args).await,
            ExternalTool::MoveWorkbook => self.client.move_workbook(args).await,
            ExternalTool::MoveDatasource => self.client.move_datasource(args).await,
            ExternalTool::PublishWorkbook => self.client.publish_workbook(args).await,
            ExternalTool::RefreshExtract => self.client.refresh_extract(args).await,
            ExternalTool::ListContentPermissions => {
                self.client.list_content_permissions(args).await
            }
        }
    }

    async fn handle_failure(&self, plan: &mut WorkflowPlan) -> (bool, Vec<String>) {
        plan.status = WorkflowStatus::Failed;
        if !plan.rollback_supported {
            return (false, Vec::new());
        }

        let records = self.take_rollback_records(&plan.id).await;
        if records.is_empty() {
            return (false, Vec::new());
        }

        warn!(workflow_id = %plan.id, count = records.len(), "rolling back completed steps");
        let mut rolled_back = Vec::new();
        // Strict reverse of completion order; one failed entry does not
        // block the rest.
        for record in records.iter().rev() {
            match self.execute_rollback(record).await {
                Ok(()) => rolled_back.push(record.step_id.clone()),
                Err(e) => error!(step = %record.step_id, error = %e, "rollback entry failed"),
            }
        }

        plan.status = WorkflowStatus::RolledBack;
        (true, rolled_back)
    }

    /// Remove and return this plan's rollback records, oldest first.
    async fn take_rollback_records(&self, workflow_id: &str) -> Vec<RollbackRecord> {
        let mut stack = self.rollback_stack.lock().await;
        let mut taken = Vec::new();
        let mut remaining = Vec::with_capacity(stack.len());
        for record in stack.drain(..) {
            if record.workflow_id == workflow_id {
                taken.push(record);
            } else {
                remaining.push(record);
            }
        }
        *stack = remaining;
        taken
    }

    async fn execute_rollback(&self, record: &RollbackRecord) -> anyhow::Result<()> {
        match &record.action {
            RollbackAction::RestoreFromArchive => {
                info!(step = %record.step_id, "rolling back: restoring content from archive");
            }
            RollbackAction::RestoreOwnership { original_user } => {
                info!(step = %record.step_id, user = %original_user, "rolling back: restoring ownership");
            }
            RollbackAction::RestorePermissions => {
                info!(step = %record.step_id, "rolling back: restoring permissions");
            }
        }
        Ok(())
    }

    fn summarize(&self, plan: &WorkflowPlan) -> ExecutionSummary {
        ExecutionSummary {
            workflow_title: plan.title.clone(),
            total_steps: plan.total_steps(),
            completed_steps: plan.completed_steps(),
            failed_steps: plan
                .steps
                .iter()
                .filter(|s| s.status == WorkflowStatus::Failed)
                .count(),
            total_execution_time: plan.steps.iter().filter_map(|s| s.execution_time).sum(),
            operations_performed: plan
                .steps
                .iter()
                .map(|s| OperationRecord {
                    step: s.description.clone(),
                    status: s.status,
                    execution_time: s.execution_time,
                })
                .collect(),
        }
    }
}

/// Resolve template references against prior step results. Literals pass
/// through; unresolvable references degrade to their literal placeholder
/// string instead of failing the step.
fn resolve_arguments(args: &BTreeMap<String, ArgValue>, steps: &[WorkflowStep]) -> ToolArgs {
    let mut resolved = ToolArgs::new();
    for (key, value) in args {
        let v = match value {
            ArgValue::Literal(v) => v.clone(),
            ArgValue::Template(r) => lookup_reference(r, steps).unwrap_or_else(|| {
                warn!(reference = %r.reference(), "unresolved template reference, passing through");
                Value::String(r.placeholder())
            }),
        };
        resolved.insert(key.clone(), v);
    }
    resolved
}

/// Completed steps are scanned in plan order so resolution stays
/// deterministic. A reference first tries an exact top-level key, then a
/// dotted descent through nested mappings.
fn lookup_reference(reference: &TemplateRef, steps: &[WorkflowStep]) -> Option<Value> {
    for step in steps {
        if step.status != WorkflowStatus::Completed {
            continue;
        }
        let Some(result) = &step.result else { continue };
        let Some(map) = result.as_object() else { continue };

        if let Some(v) = map.get(&reference.reference()) {
            return Some(v.clone());
        }
        if reference.path().len() > 1 {
            let mut current = result;
            let mut found = true;
            for part in reference.path() {
                match current.get(part) {
                    Some(next) => current = next,
                    None => {
                        found = false;
                        break;
                    }
                }
            }
            if found {
                return Some(current.clone());
            }
        }
    }
    None
}
