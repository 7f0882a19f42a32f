//! End-to-end scenarios driven through the public orchestrator API.

use std::sync::Arc;

use serde_json::{json, Value};
use sitewright::tools::{ExternalTool, SimulatedToolClient, ToolArgs, ToolClient, ToolName};
use sitewright::workflow::{
    ArgValue, OperationType, RollbackAction, WorkflowExecutor, WorkflowPlan, WorkflowStatus,
    WorkflowStep,
};
use sitewright::WorkflowOrchestrator;

#[tokio::test]
async fn cleanup_request_requires_confirmation_then_executes() {
    let client = Arc::new(SimulatedToolClient::new());
    let orchestrator = WorkflowOrchestrator::new(client.clone());

    let response = orchestrator.process_request("Clean up the Finance project").await;
    assert_eq!(response["status"], "confirmation_required");
    assert!(response["workflow_id"].is_string());

    let steps = response["workflow"]["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 4);
    assert_eq!(response["workflow"]["estimated_duration"], 15);

    // Nothing was dispatched while the plan was parked.
    assert!(client.calls().is_empty());

    let workflow_id = response["workflow_id"].as_str().unwrap();
    let result = orchestrator.confirm(workflow_id, true).await;
    assert_eq!(result["success"], true);
    assert_eq!(result["completed_steps"], 4);
    assert_eq!(result["total_steps"], 4);

    // The only external call in the cleanup template is the initial search.
    assert_eq!(client.calls(), vec!["search_workbooks"]);

    let summary = &result["execution_summary"];
    assert_eq!(summary["failed_steps"], 0);
    assert_eq!(summary["operations_performed"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn read_only_request_runs_without_confirmation() {
    let client = Arc::new(SimulatedToolClient::new());
    let orchestrator = WorkflowOrchestrator::new(client.clone());

    let response = orchestrator
        .process_request("List all workbooks in Finance project")
        .await;

    assert_eq!(response["success"], true);
    assert_eq!(response["completed_steps"], 1);
    assert_eq!(client.calls(), vec!["search_workbooks"]);
}

#[tokio::test]
async fn declined_confirmation_discards_the_plan() {
    let client = Arc::new(SimulatedToolClient::new());
    let orchestrator = WorkflowOrchestrator::new(client.clone());

    let response = orchestrator.process_request("Clean up the Finance project").await;
    let workflow_id = response["workflow_id"].as_str().unwrap();

    let cancelled = orchestrator.confirm(workflow_id, false).await;
    assert_eq!(cancelled["success"], true);
    assert_eq!(cancelled["status"], "cancelled");
    assert!(client.calls().is_empty());

    let repeat = orchestrator.confirm(workflow_id, true).await;
    assert_eq!(repeat["success"], false);
    assert_eq!(repeat["error"], "Workflow not found or expired");
}

#[tokio::test]
async fn status_reports_progress_for_pending_plans_only() {
    let orchestrator = WorkflowOrchestrator::new(Arc::new(SimulatedToolClient::new()));

    let response = orchestrator.process_request("offboard john.doe").await;
    let workflow_id = response["workflow_id"].as_str().unwrap();

    let status = orchestrator.status(workflow_id).await;
    assert_eq!(status["status"], "waiting_confirmation");
    assert_eq!(status["progress"]["completed_steps"], 0);
    assert_eq!(status["progress"]["total_steps"], 5);
    assert_eq!(status["progress"]["percentage"], 0.0);
    assert_eq!(status["estimated_remaining"], 25);
    assert_eq!(status["current_step"], Value::Null);

    let missing = orchestrator.status("not-a-real-id").await;
    assert_eq!(missing["success"], false);
    assert_eq!(missing["error"], "Workflow not found");
}

/// Ownership transfer fails mid-migration: the completed archival move is
/// rolled back and the plan lands in rolled_back.
#[tokio::test]
async fn failed_transfer_rolls_back_completed_steps() {
    // Serves the inventory search and the archival move, then fails the
    // final publish standing in for the transfer commit.
    struct FlakyClient;

    #[async_trait::async_trait]
    impl ToolClient for FlakyClient {
        async fn search_workbooks(&self, _args: &ToolArgs) -> anyhow::Result<Value> {
            Ok(json!({"workbooks": [{"id": "wb_1"}], "total": 1}))
        }
        async fn move_workbook(&self, _args: &ToolArgs) -> anyhow::Result<Value> {
            Ok(json!({"moved": true}))
        }
        async fn publish_workbook(&self, _args: &ToolArgs) -> anyhow::Result<Value> {
            Err(anyhow::anyhow!("site rejected the ownership change"))
        }
    }

    let mut plan = WorkflowPlan::new(
        "Manual migration",
        "migration with a failing transfer step",
        vec![
            WorkflowStep::new(
                "inventory",
                "inventory content",
                ToolName::External(ExternalTool::SearchWorkbooks),
                OperationType::Read,
            ),
            WorkflowStep::new(
                "archive",
                "archive personal content",
                ToolName::External(ExternalTool::MoveWorkbook),
                OperationType::Move,
            )
            .with_arg("target_project_name", ArgValue::literal("Archive"))
            .depends_on("inventory")
            .with_rollback(RollbackAction::RestoreFromArchive),
            WorkflowStep::new(
                "transfer",
                "commit ownership transfer",
                ToolName::External(ExternalTool::PublishWorkbook),
                OperationType::Update,
            )
            .depends_on("archive")
            .with_rollback(RollbackAction::RestoreOwnership {
                original_user: "john.doe".to_string(),
            }),
        ],
    )
    .unwrap();

    let executor = WorkflowExecutor::new(Arc::new(FlakyClient));
    let report = executor.execute(&mut plan, None).await;

    assert!(!report.success);
    assert_eq!(report.failed_step.as_deref(), Some("transfer"));
    assert!(report.rollback_performed);
    assert_eq!(report.rolled_back_steps, vec!["archive"]);
    assert_eq!(plan.status, WorkflowStatus::RolledBack);
    assert_eq!(plan.steps[2].status, WorkflowStatus::Failed);
    assert_eq!(plan.completed_steps(), 2);
}

#[tokio::test]
async fn generic_request_parks_with_conservative_posture() {
    let orchestrator = WorkflowOrchestrator::new(Arc::new(SimulatedToolClient::new()));

    let response = orchestrator
        .process_request("Reorganize everything however you see fit")
        .await;

    assert_eq!(response["status"], "confirmation_required");
    assert_eq!(response["workflow"]["title"], "Generic Workflow");
    assert_eq!(response["workflow"]["steps"].as_array().unwrap().len(), 2);
}
