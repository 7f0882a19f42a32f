//! Plan validation and risk assessment.
//!
//! Risk scoring is deterministic and additive: 3 per DELETE step, 2 per
//! MOVE, 1 per UPDATE, plus 2 when a plan exceeds ten steps. A total of 8
//! or more is high risk, 4 or more medium, anything else low; a score of 3
//! or more forces the confirmation handshake independently of the flag the
//! parser set on the plan.

use serde::Serialize;
use std::sync::Arc;

use crate::tools::{ExternalTool, ToolClient, ToolName};
use crate::workflow::step::{OperationType, RiskLevel, WorkflowPlan, WorkflowStep};

/// Risk score at or above which confirmation becomes mandatory.
const CONFIRMATION_SCORE: u32 = 3;
const MEDIUM_SCORE: u32 = 4;
const HIGH_SCORE: u32 = 8;
const LARGE_PLAN_STEPS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    pub factors: Vec<String>,
    pub requires_confirmation: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyCheck {
    pub valid: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceCheck {
    pub available: bool,
    pub concerns: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub risk_assessment: RiskAssessment,
    pub dependency_check: DependencyCheck,
    pub resource_check: ResourceCheck,
}

/// Validates plans for safety and feasibility before anything executes.
pub struct WorkflowValidator {
    client: Arc<dyn ToolClient>,
}

impl WorkflowValidator {
    pub fn new(client: Arc<dyn ToolClient>) -> Self {
        Self { client }
    }

    pub fn validate(&self, plan: &WorkflowPlan) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // Destructive plans may still proceed, but never silently.
        if plan.has_destructive_operations() {
            warnings.push("Workflow contains potentially destructive operations".to_string());
        }

        for step in &plan.steps {
            self.validate_step(step, &mut errors, &mut warnings);
        }

        let dependency_check = self.check_dependencies(plan);
        if !dependency_check.valid {
            errors.extend(dependency_check.issues.iter().cloned());
        }

        ValidationReport {
            valid: errors.is_empty(),
            errors,
            warnings,
            risk_assessment: self.assess_risk(plan),
            dependency_check,
            resource_check: self.check_resources(plan),
        }
    }

    fn assess_risk(&self, plan: &WorkflowPlan) -> RiskAssessment {
        let mut factors = Vec::new();
        let mut score = 0u32;

        for step in &plan.steps {
            match step.operation_type {
                OperationType::Delete => {
                    factors.push(format!("Delete operation: {}", step.description));
                    score += 3;
                }
                OperationType::Move => {
                    factors.push(format!("Move operation: {}", step.description));
                    score += 2;
                }
                OperationType::Update => score += 1,
                _ => {}
            }
        }

        if plan.total_steps() > LARGE_PLAN_STEPS {
            factors.push("Large number of operations".to_string());
            score += 2;
        }

        let level = if score >= HIGH_SCORE {
            RiskLevel::High
        } else if score >= MEDIUM_SCORE {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        RiskAssessment {
            score,
            level,
            factors,
            requires_confirmation: score >= CONFIRMATION_SCORE,
        }
    }

    fn validate_step(&self, step: &WorkflowStep, errors: &mut Vec<String>, _warnings: &mut [String]) {
        if let ToolName::External(tool) = step.tool {
            if !self.client.supports(tool) {
                errors.push(format!(
                    "Unsupported tool: {} (step '{}')",
                    tool.as_str(),
                    step.id
                ));
            }

            if matches!(tool, ExternalTool::MoveWorkbook | ExternalTool::MoveDatasource)
                && !step.arguments.contains_key("target_project_id")
                && !step.arguments.contains_key("target_project_name")
            {
                errors.push(format!(
                    "Move operation missing target project (step '{}')",
                    step.id
                ));
            }
        }
    }

    fn check_dependencies(&self, plan: &WorkflowPlan) -> DependencyCheck {
        match plan.execution_order() {
            Ok(_) => DependencyCheck {
                valid: true,
                issues: Vec::new(),
            },
            Err(e) => DependencyCheck {
                valid: false,
                issues: vec![e.to_string()],
            },
        }
    }

    // Extension point; nothing to check against without a live site.
    fn check_resources(&self, _plan: &WorkflowPlan) -> ResourceCheck {
        ResourceCheck {
            available: true,
            concerns: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::SimulatedToolClient;
    use crate::workflow::step::{ArgValue, WorkflowStep};
    use crate::tools::WorkflowTool;

    fn validator() -> WorkflowValidator {
        WorkflowValidator::new(Arc::new(SimulatedToolClient::new()))
    }

    fn step(id: &str, op: OperationType) -> WorkflowStep {
        WorkflowStep::new(
            id,
            format!("step {id}"),
            ToolName::Workflow(WorkflowTool::BulkMoveContent),
            op,
        )
    }

    fn plan(steps: Vec<WorkflowStep>) -> WorkflowPlan {
        WorkflowPlan::new("Test", "test plan", steps).unwrap()
    }

    #[test]
    fn test_risk_score_delete_plus_updates() {
        let plan = plan(vec![
            step("d", OperationType::Delete),
            step("u1", OperationType::Update),
            step("u2", OperationType::Update),
            step("u3", OperationType::Update),
        ]);
        let report = validator().validate(&plan);

        assert_eq!(report.risk_assessment.score, 6);
        assert_eq!(report.risk_assessment.level, RiskLevel::Medium);
        assert!(report.risk_assessment.requires_confirmation);
    }

    #[test]
    fn test_all_read_plan_is_low_risk() {
        let plan = plan(vec![step("a", OperationType::Read), step("b", OperationType::Read)]);
        let report = validator().validate(&plan);

        assert_eq!(report.risk_assessment.score, 0);
        assert_eq!(report.risk_assessment.level, RiskLevel::Low);
        assert!(!report.risk_assessment.requires_confirmation);
        assert!(report.valid);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_large_plan_penalty() {
        let steps: Vec<WorkflowStep> = (0..11)
            .map(|i| step(&format!("s{i}"), OperationType::Read))
            .collect();
        let report = validator().validate(&plan(steps));
        assert_eq!(report.risk_assessment.score, 2);
    }

    #[test]
    fn test_destructive_plan_warns_but_remains_valid() {
        let plan = plan(vec![step("m", OperationType::Move)]);
        let report = validator().validate(&plan);

        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("destructive"));
    }

    #[test]
    fn test_move_step_requires_target_project() {
        let bare = WorkflowStep::new(
            "mv",
            "move a workbook",
            ToolName::External(ExternalTool::MoveWorkbook),
            OperationType::Move,
        );
        let report = validator().validate(&plan(vec![bare]));
        assert!(!report.valid);
        assert!(report.errors[0].contains("target project"));

        let with_target = WorkflowStep::new(
            "mv",
            "move a workbook",
            ToolName::External(ExternalTool::MoveWorkbook),
            OperationType::Move,
        )
        .with_arg("target_project_name", ArgValue::literal("Archive"));
        let report = validator().validate(&plan(vec![with_target]));
        assert!(report.valid);
    }

    #[test]
    fn test_unsupported_tool_invalidates_plan() {
        struct SearchOnlyClient;

        #[async_trait::async_trait]
        impl ToolClient for SearchOnlyClient {
            async fn search_workbooks(
                &self,
                _args: &crate::tools::ToolArgs,
            ) -> anyhow::Result<serde_json::Value> {
                Ok(serde_json::json!({"workbooks": []}))
            }
            fn supports(&self, tool: ExternalTool) -> bool {
                matches!(tool, ExternalTool::SearchWorkbooks)
            }
        }

        let validator = WorkflowValidator::new(Arc::new(SearchOnlyClient));
        let refresh = WorkflowStep::new(
            "r",
            "refresh extract",
            ToolName::External(ExternalTool::RefreshExtract),
            OperationType::Refresh,
        );
        let report = validator.validate(&plan(vec![refresh]));
        assert!(!report.valid);
        assert!(report.errors[0].contains("Unsupported tool"));
    }
}
