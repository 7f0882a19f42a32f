//! Step and plan data model.
//!
//! A [`WorkflowPlan`] is a directed acyclic graph of [`WorkflowStep`]s.
//! Construction validates that every dependency reference resolves and that
//! the graph is acyclic, so downstream components never see a malformed plan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::tools::ToolName;

/// Execution status shared by plans and individual steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    InProgress,
    WaitingConfirmation,
    Completed,
    Failed,
    Cancelled,
    RolledBack,
}

impl WorkflowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::WaitingConfirmation => "waiting_confirmation",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::Cancelled => "cancelled",
            WorkflowStatus::RolledBack => "rolled_back",
        }
    }
}

/// Operation classification, the input to risk scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Read,
    Create,
    Update,
    Delete,
    Move,
    Publish,
    Refresh,
}

impl OperationType {
    /// DELETE and MOVE can lose or displace content.
    pub fn is_destructive(self) -> bool {
        matches!(self, OperationType::Delete | OperationType::Move)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Read => "read",
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
            OperationType::Move => "move",
            OperationType::Publish => "publish",
            OperationType::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        f.write_str(s)
    }
}

/// Reference to a value produced by an earlier step, written `{{key}}` or
/// `{{key.nested}}` on the wire. Represented as a distinct type so template
/// detection happens at construction time, never by sniffing string contents
/// at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef {
    path: Vec<String>,
}

impl TemplateRef {
    pub fn new(reference: &str) -> Self {
        Self {
            path: reference.trim().split('.').map(str::to_string).collect(),
        }
    }

    /// Dot-separated lookup path into a prior step's result.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The full reference as written, e.g. `migration_plan` or `a.b`.
    pub fn reference(&self) -> String {
        self.path.join(".")
    }

    /// The literal `{{...}}` form, passed through when resolution fails.
    pub fn placeholder(&self) -> String {
        format!("{{{{{}}}}}", self.reference())
    }
}

/// A step argument: either a literal JSON value or a template reference the
/// executor resolves against prior step results before dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Literal(Value),
    Template(TemplateRef),
}

impl ArgValue {
    pub fn literal(value: impl Into<Value>) -> Self {
        ArgValue::Literal(value.into())
    }

    pub fn template(reference: &str) -> Self {
        ArgValue::Template(TemplateRef::new(reference))
    }
}

impl Serialize for ArgValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ArgValue::Literal(value) => value.serialize(serializer),
            ArgValue::Template(r) => serializer.serialize_str(&r.placeholder()),
        }
    }
}

impl<'de> Deserialize<'de> for ArgValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if let Value::String(s) = &value {
            let trimmed = s.trim();
            if let Some(inner) = trimmed
                .strip_prefix("{{")
                .and_then(|rest| rest.strip_suffix("}}"))
            {
                return Ok(ArgValue::Template(TemplateRef::new(inner)));
            }
        }
        Ok(ArgValue::Literal(value))
    }
}

/// Compensating action recorded for a state-changing step, replayed only if
/// a later failure forces rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RollbackAction {
    RestoreFromArchive,
    RestoreOwnership { original_user: String },
    RestorePermissions,
}

/// One unit of dispatchable work within a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub description: String,
    pub tool: ToolName,
    #[serde(default)]
    pub arguments: BTreeMap<String, ArgValue>,
    pub operation_type: OperationType,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackAction>,
    #[serde(default = "pending_status")]
    pub status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock seconds for the dispatch, set exactly once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

fn pending_status() -> WorkflowStatus {
    WorkflowStatus::Pending
}

impl WorkflowStep {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        tool: ToolName,
        operation_type: OperationType,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            tool,
            arguments: BTreeMap::new(),
            operation_type,
            dependencies: Vec::new(),
            rollback: None,
            status: WorkflowStatus::Pending,
            result: None,
            error: None,
            execution_time: None,
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: ArgValue) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    pub fn depends_on(mut self, step_id: impl Into<String>) -> Self {
        self.dependencies.push(step_id.into());
        self
    }

    pub fn with_rollback(mut self, action: RollbackAction) -> Self {
        self.rollback = Some(action);
        self
    }
}

/// A validated, ordered collection of steps plus operator-facing metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowPlan {
    pub id: String,
    pub title: String,
    pub description: String,
    pub steps: Vec<WorkflowStep>,
    /// Advisory minutes estimate shown to the operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u32>,
    pub risk_level: RiskLevel,
    pub requires_confirmation: bool,
    pub rollback_supported: bool,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
}

impl WorkflowPlan {
    /// Build a plan, rejecting duplicate step ids, dangling dependency
    /// references, and dependency cycles up front.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        steps: Vec<WorkflowStep>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.id.as_str()) {
                return Err(Error::Parse(format!("Duplicate step id: {}", step.id)));
            }
        }
        resolve_execution_order(&steps)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            steps,
            estimated_duration: None,
            risk_level: RiskLevel::Low,
            requires_confirmation: false,
            rollback_supported: true,
            status: WorkflowStatus::Pending,
            created_at: Utc::now(),
        })
    }

    pub fn with_estimated_duration(mut self, minutes: u32) -> Self {
        self.estimated_duration = Some(minutes);
        self
    }

    pub fn with_risk_level(mut self, level: RiskLevel) -> Self {
        self.risk_level = level;
        self
    }

    pub fn with_confirmation_required(mut self, required: bool) -> Self {
        self.requires_confirmation = required;
        self
    }

    pub fn with_rollback_supported(mut self, supported: bool) -> Self {
        self.rollback_supported = supported;
        self
    }

    /// True if any step could lose or displace content.
    pub fn has_destructive_operations(&self) -> bool {
        self.steps.iter().any(|s| s.operation_type.is_destructive())
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == WorkflowStatus::Completed)
            .count()
    }

    /// A valid topological order over this plan's steps. Construction already
    /// validated the graph, so this only fails for plans assembled by hand.
    pub fn execution_order(&self) -> Result<Vec<String>> {
        resolve_execution_order(&self.steps)
    }
}

/// Resolve a topological execution order: repeatedly pick any step whose
/// dependencies have all been scheduled. If a full pass schedules nothing
/// while steps remain, the graph has a cycle or a dangling reference.
pub fn resolve_execution_order(steps: &[WorkflowStep]) -> Result<Vec<String>> {
    let mut scheduled: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(steps.len());

    while order.len() < steps.len() {
        let next = steps.iter().find(|step| {
            !scheduled.contains(step.id.as_str())
                && step
                    .dependencies
                    .iter()
                    .all(|dep| scheduled.contains(dep.as_str()))
        });

        match next {
            Some(step) => {
                scheduled.insert(step.id.as_str());
                order.push(step.id.clone());
            }
            None => {
                let remaining = steps
                    .iter()
                    .filter(|s| !scheduled.contains(s.id.as_str()))
                    .map(|s| s.id.clone())
                    .collect();
                return Err(Error::ExecutionOrder(remaining));
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ExternalTool, WorkflowTool};
    use serde_json::json;

    fn read_step(id: &str) -> WorkflowStep {
        WorkflowStep::new(
            id,
            format!("read step {id}"),
            ToolName::External(ExternalTool::SearchWorkbooks),
            OperationType::Read,
        )
    }

    #[test]
    fn test_step_counts() {
        let mut plan = WorkflowPlan::new(
            "Counts",
            "step counting",
            vec![read_step("a"), read_step("b"), read_step("c")],
        )
        .unwrap();
        assert_eq!(plan.total_steps(), 3);
        assert_eq!(plan.completed_steps(), 0);

        plan.steps[0].status = WorkflowStatus::Completed;
        plan.steps[1].status = WorkflowStatus::Failed;
        assert_eq!(plan.completed_steps(), 1);
    }

    #[test]
    fn test_execution_order_respects_dependencies() {
        let steps = vec![
            read_step("c").depends_on("b"),
            read_step("a"),
            read_step("b").depends_on("a"),
        ];
        let order = resolve_execution_order(&steps).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cycle_is_a_construction_error() {
        let steps = vec![read_step("a").depends_on("b"), read_step("b").depends_on("a")];
        let err = resolve_execution_order(&steps).unwrap_err();
        assert!(matches!(err, Error::ExecutionOrder(remaining) if remaining.len() == 2));

        assert!(WorkflowPlan::new(
            "Cyclic",
            "never schedulable",
            vec![read_step("a").depends_on("b"), read_step("b").depends_on("a")],
        )
        .is_err());
    }

    #[test]
    fn test_dangling_dependency_is_a_construction_error() {
        let result = WorkflowPlan::new("Dangling", "bad ref", vec![read_step("a").depends_on("ghost")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_step_ids_rejected() {
        let result = WorkflowPlan::new("Dup", "duplicate ids", vec![read_step("a"), read_step("a")]);
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_destructive_detection() {
        let plan = WorkflowPlan::new(
            "Move",
            "destructive",
            vec![WorkflowStep::new(
                "m",
                "move content",
                ToolName::Workflow(WorkflowTool::BulkMoveContent),
                OperationType::Move,
            )],
        )
        .unwrap();
        assert!(plan.has_destructive_operations());
    }

    #[test]
    fn test_arg_value_serde_round_trip() {
        let template = ArgValue::template("analysis.candidates");
        let encoded = serde_json::to_value(&template).unwrap();
        assert_eq!(encoded, json!("{{analysis.candidates}}"));

        let decoded: ArgValue = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, template);

        let literal: ArgValue = serde_json::from_value(json!({"k": 1})).unwrap();
        assert_eq!(literal, ArgValue::literal(json!({"k": 1})));
    }
}
