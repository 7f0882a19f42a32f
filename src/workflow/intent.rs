//! Natural-language intent parsing.
//!
//! Template matching runs first: three hand-curated archetypes (content
//! cleanup, user migration, permission audit) are recognized by trigger
//! phrases and instantiated with regex-extracted slot values. Anything
//! unrecognized falls back to a keyword classifier that produces either a
//! single read-only step or a deliberately conservative two-step plan with
//! mandatory confirmation. Precise archetypes get tailored, rollback-aware
//! plans; unknown requests never get guessed-at destructive behavior.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::Result;
use crate::tools::{ExternalTool, ToolName, WorkflowTool};
use crate::workflow::step::{
    ArgValue, OperationType, RiskLevel, RollbackAction, WorkflowPlan, WorkflowStep,
};

const CLEANUP_TRIGGERS: &[&str] = &[
    "clean up",
    "cleanup",
    "archive old",
    "remove unused",
    "organize content",
    "tidy up",
];

const MIGRATION_TRIGGERS: &[&str] = &[
    "migrate",
    "transfer",
    "move user",
    "reassign",
    "user leaving",
    "offboard",
];

const AUDIT_TRIGGERS: &[&str] = &[
    "audit",
    "review permissions",
    "check access",
    "security review",
    "compliance check",
];

const READ_KEYWORDS: &[&str] = &["list", "show", "find", "search"];

/// Fallback assignee when a migration request names no target user.
const DEFAULT_MIGRATION_TARGET: &str = "team_lead";

static PROJECT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)(?:in|from)\s+(?:the\s+)?(\w+)\s+project",
        r"(?i)(\w+)\s+project",
        r"(?i)project\s+(\w+)",
    ])
});

static USERNAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)(\w+\.?\w*)'s\s+content",
        r"(?i)user\s+(\w+\.?\w*)",
        r"(?i)migrate\s+(\w+\.?\w*)",
        r"(?i)offboard\s+(\w+\.?\w*)",
        r"(?i)(\w+\.?\w*)\s+leaves\b",
        r"(?i)(\w+\.?\w*)\s+leaving",
    ])
});

static TARGET_USER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)assign\s+to\s+(\w+\.?\w*)",
        r"(?i)transfer\s+to\s+(\w+\.?\w*)",
        r"(?i)\bto\s+(\w+\.?\w*)",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("invalid slot extraction pattern"))
        .collect()
}

/// First capture group of the first pattern that matches, in declaration
/// order. Ordered fallbacks let precise phrasings win over loose ones.
fn extract_first(patterns: &[Regex], request: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(request))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Recognized workflow archetype with extracted slot values.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateMatch {
    ContentCleanup {
        project: Option<String>,
        days_threshold: u32,
    },
    UserMigration {
        user: Option<String>,
        target_user: String,
    },
    PermissionAudit {
        sensitive_only: bool,
    },
}

/// Parses free-text operator requests into structured workflow plans.
///
/// Never returns a plan with unresolvable dependencies; template
/// instantiation goes through [`WorkflowPlan::new`], which validates the
/// dependency graph.
#[derive(Debug, Default)]
pub struct IntentParser;

impl IntentParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, request: &str) -> Result<WorkflowPlan> {
        if let Some(template) = self.match_template(request) {
            debug!(?template, "request matched workflow template");
            return self.instantiate(template, request);
        }
        self.fallback(request)
    }

    fn match_template(&self, request: &str) -> Option<TemplateMatch> {
        let lower = request.to_lowercase();

        if contains_any(&lower, CLEANUP_TRIGGERS) {
            // "unused" widens the inactivity window the analysis looks at.
            let days_threshold = if lower.contains("unused") { 180 } else { 90 };
            return Some(TemplateMatch::ContentCleanup {
                project: extract_first(&PROJECT_PATTERNS, request),
                days_threshold,
            });
        }

        if contains_any(&lower, MIGRATION_TRIGGERS) {
            return Some(TemplateMatch::UserMigration {
                user: extract_first(&USERNAME_PATTERNS, request),
                target_user: extract_first(&TARGET_USER_PATTERNS, request)
                    .unwrap_or_else(|| DEFAULT_MIGRATION_TARGET.to_string()),
            });
        }

        if contains_any(&lower, AUDIT_TRIGGERS) {
            return Some(TemplateMatch::PermissionAudit {
                sensitive_only: lower.contains("sensitive"),
            });
        }

        None
    }

    fn instantiate(&self, template: TemplateMatch, request: &str) -> Result<WorkflowPlan> {
        match template {
            TemplateMatch::ContentCleanup {
                project,
                days_threshold,
            } => self.cleanup_plan(project, days_threshold),
            TemplateMatch::UserMigration { user, target_user } => {
                self.migration_plan(user, target_user)
            }
            TemplateMatch::PermissionAudit { sensitive_only } => {
                self.audit_plan(sensitive_only, request)
            }
        }
    }

    fn cleanup_plan(&self, project: Option<String>, days_threshold: u32) -> Result<WorkflowPlan> {
        let scope = project.as_deref().unwrap_or("all projects");

        let mut analyze = WorkflowStep::new(
            "analyze_content",
            format!("Analyze content in {scope} for cleanup opportunities"),
            ToolName::External(ExternalTool::SearchWorkbooks),
            OperationType::Read,
        );
        if let Some(name) = &project {
            analyze = analyze.with_arg("project_name", ArgValue::literal(name.clone()));
        }

        let steps = vec![
            analyze,
            WorkflowStep::new(
                "identify_candidates",
                "Identify unused or old content for archival",
                ToolName::Workflow(WorkflowTool::AnalyzeUsagePatterns),
                OperationType::Read,
            )
            .with_arg("days_threshold", ArgValue::literal(days_threshold))
            .depends_on("analyze_content"),
            WorkflowStep::new(
                "confirm_archival",
                "Confirm content to be archived",
                ToolName::Workflow(WorkflowTool::RequestUserConfirmation),
                OperationType::Read,
            )
            .with_arg("action", ArgValue::literal("archive"))
            .with_arg("items", ArgValue::template("candidates"))
            .depends_on("identify_candidates"),
            WorkflowStep::new(
                "archive_content",
                "Move selected content to Archive project",
                ToolName::Workflow(WorkflowTool::BulkMoveContent),
                OperationType::Move,
            )
            .with_arg("target_project", ArgValue::literal("Archive"))
            .with_arg("items", ArgValue::template("confirmed_items"))
            .depends_on("confirm_archival")
            .with_rollback(RollbackAction::RestoreFromArchive),
        ];

        Ok(WorkflowPlan::new(
            format!("Content Cleanup - {scope}"),
            format!("Clean up and organize content in {scope}"),
            steps,
        )?
        .with_estimated_duration(15)
        .with_risk_level(RiskLevel::Medium)
        .with_confirmation_required(true))
    }

    fn migration_plan(&self, user: Option<String>, target_user: String) -> Result<WorkflowPlan> {
        let user = user.unwrap_or_else(|| "unknown_user".to_string());

        let steps = vec![
            WorkflowStep::new(
                "inventory_content",
                format!("Inventory all content owned by {user}"),
                ToolName::Workflow(WorkflowTool::GetUserContent),
                OperationType::Read,
            )
            .with_arg("username", ArgValue::literal(user.clone())),
            WorkflowStep::new(
                "analyze_importance",
                "Analyze content importance and usage patterns",
                ToolName::Workflow(WorkflowTool::AnalyzeContentImportance),
                OperationType::Read,
            )
            .with_arg("user", ArgValue::literal(user.clone()))
            .depends_on("inventory_content"),
            WorkflowStep::new(
                "plan_migration",
                "Plan content ownership transfer",
                ToolName::Workflow(WorkflowTool::CreateMigrationPlan),
                OperationType::Read,
            )
            .with_arg("from_user", ArgValue::literal(user.clone()))
            .with_arg("to_user", ArgValue::literal(target_user))
            .depends_on("analyze_importance"),
            WorkflowStep::new(
                "transfer_ownership",
                format!("Transfer content ownership from {user}"),
                ToolName::Workflow(WorkflowTool::BulkTransferOwnership),
                OperationType::Update,
            )
            .with_arg("from_user", ArgValue::literal(user.clone()))
            .with_arg("migration_plan", ArgValue::template("migration_plan"))
            .depends_on("plan_migration")
            .with_rollback(RollbackAction::RestoreOwnership {
                original_user: user.clone(),
            }),
            WorkflowStep::new(
                "update_permissions",
                "Update permissions and access controls",
                ToolName::Workflow(WorkflowTool::UpdateUserPermissions),
                OperationType::Update,
            )
            .with_arg("user", ArgValue::literal(user.clone()))
            .with_arg("action", ArgValue::literal("revoke_all"))
            .depends_on("transfer_ownership")
            .with_rollback(RollbackAction::RestorePermissions),
        ];

        Ok(WorkflowPlan::new(
            format!("User Migration - {user}"),
            format!("Migrate content and permissions for departing user {user}"),
            steps,
        )?
        .with_estimated_duration(25)
        .with_risk_level(RiskLevel::High)
        .with_confirmation_required(true))
    }

    fn audit_plan(&self, sensitive_only: bool, request: &str) -> Result<WorkflowPlan> {
        let scope = if sensitive_only { "sensitive" } else { "all" };

        let steps = vec![
            WorkflowStep::new(
                "identify_content",
                format!("Identify {scope} content for audit"),
                ToolName::External(ExternalTool::SearchWorkbooks),
                OperationType::Read,
            )
            .with_arg("project_name", ArgValue::literal("all")),
            WorkflowStep::new(
                "analyze_permissions",
                "Analyze current permissions",
                ToolName::External(ExternalTool::ListContentPermissions),
                OperationType::Read,
            )
            .with_arg("content_type", ArgValue::literal("workbook"))
            .depends_on("identify_content"),
        ];

        Ok(WorkflowPlan::new(
            "Permission Audit",
            format!("Audit permissions: {request}"),
            steps,
        )?
        .with_estimated_duration(20))
    }

    /// Two-tier keyword fallback for requests no template recognizes:
    /// read-intent keywords produce a single low-risk search step; anything
    /// else gets a confirmation-gated generic plan.
    fn fallback(&self, request: &str) -> Result<WorkflowPlan> {
        let lower = request.to_lowercase();

        if contains_any(&lower, READ_KEYWORDS) {
            let steps = vec![WorkflowStep::new(
                "search_content",
                format!("Search for content based on: {request}"),
                ToolName::External(ExternalTool::SearchWorkbooks),
                OperationType::Read,
            )
            .with_arg("name", ArgValue::literal(""))];

            return Ok(WorkflowPlan::new(
                "Content Search",
                format!("Search operation: {request}"),
                steps,
            )?
            .with_estimated_duration(2));
        }

        let steps = vec![
            WorkflowStep::new(
                "analyze_request",
                format!("Analyze request: {request}"),
                ToolName::Workflow(WorkflowTool::AnalyzeUsagePatterns),
                OperationType::Read,
            )
            .with_arg("request", ArgValue::literal(request)),
            WorkflowStep::new(
                "execute_action",
                "Execute the requested action",
                ToolName::Workflow(WorkflowTool::RequestUserConfirmation),
                OperationType::Update,
            )
            .with_arg("action", ArgValue::literal("generic"))
            .with_arg("items", ArgValue::literal(serde_json::json!([])))
            .depends_on("analyze_request"),
        ];

        Ok(WorkflowPlan::new(
            "Generic Workflow",
            format!("Process request: {request}"),
            steps,
        )?
        .with_estimated_duration(10)
        .with_risk_level(RiskLevel::Medium)
        .with_confirmation_required(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::step::WorkflowStatus;

    #[test]
    fn test_cleanup_template_match() {
        let parser = IntentParser::new();
        let plan = parser.parse("Clean up the Finance project").unwrap();

        assert_eq!(plan.title, "Content Cleanup - Finance");
        assert_eq!(plan.total_steps(), 4);
        assert!(plan.requires_confirmation);
        assert!(plan.rollback_supported);
        assert_eq!(plan.status, WorkflowStatus::Pending);

        let ids: Vec<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "analyze_content",
                "identify_candidates",
                "confirm_archival",
                "archive_content"
            ]
        );
        assert!(plan.has_destructive_operations());
    }

    #[test]
    fn test_cleanup_unused_widens_threshold() {
        let parser = IntentParser::new();
        let plan = parser.parse("remove unused workbooks in Sales project").unwrap();
        let identify = &plan.steps[1];
        assert_eq!(
            identify.arguments.get("days_threshold"),
            Some(&ArgValue::literal(180u32))
        );
    }

    #[test]
    fn test_migration_extracts_user_and_target() {
        let parser = IntentParser::new();
        let plan = parser.parse("Migrate john.doe's content to jane.smith").unwrap();

        assert_eq!(plan.title, "User Migration - john.doe");
        assert_eq!(plan.total_steps(), 5);
        assert_eq!(plan.risk_level, RiskLevel::High);

        let plan_step = &plan.steps[2];
        assert_eq!(
            plan_step.arguments.get("to_user"),
            Some(&ArgValue::literal("jane.smith"))
        );
    }

    #[test]
    fn test_migration_target_falls_back_to_team_lead() {
        let parser = IntentParser::new();
        let plan = parser.parse("offboard john.doe").unwrap();
        let plan_step = &plan.steps[2];
        assert_eq!(
            plan_step.arguments.get("to_user"),
            Some(&ArgValue::literal("team_lead"))
        );
    }

    #[test]
    fn test_audit_template_is_read_only() {
        let parser = IntentParser::new();
        let plan = parser.parse("Run a compliance check on permissions").unwrap();

        assert_eq!(plan.title, "Permission Audit");
        assert!(!plan.requires_confirmation);
        assert!(plan
            .steps
            .iter()
            .all(|s| s.operation_type == OperationType::Read));
    }

    #[test]
    fn test_read_keyword_fallback() {
        let parser = IntentParser::new();
        let plan = parser.parse("List all workbooks in Finance project").unwrap();

        // "list" wins the fallback tier only when no template triggers fire.
        assert_eq!(plan.title, "Content Search");
        assert_eq!(plan.total_steps(), 1);
        assert_eq!(plan.risk_level, RiskLevel::Low);
        assert!(!plan.requires_confirmation);
    }

    #[test]
    fn test_generic_fallback_is_conservative() {
        let parser = IntentParser::new();
        let plan = parser.parse("Do something ambitious with the dashboards").unwrap();

        assert_eq!(plan.title, "Generic Workflow");
        assert_eq!(plan.total_steps(), 2);
        assert_eq!(plan.risk_level, RiskLevel::Medium);
        assert!(plan.requires_confirmation);
        assert_eq!(plan.steps[1].dependencies, vec!["analyze_request"]);
    }

    #[test]
    fn test_project_extraction_variants() {
        for request in [
            "clean up in the Finance project",
            "clean up from Finance project",
            "tidy up the Finance project",
        ] {
            let plan = IntentParser::new().parse(request).unwrap();
            assert_eq!(plan.title, "Content Cleanup - Finance", "request: {request}");
        }
    }
}
