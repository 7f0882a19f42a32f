//! Workflow-internal pseudo-tools.
//!
//! Templated plans reference operations that have no 1:1 external API
//! equivalent (usage analysis, confirmation capture, bulk moves and
//! transfers). These simulations stand in for real integrations; their
//! output keys are substitution targets for later template references, so
//! the shapes here are load-bearing even though the data is canned.

use anyhow::Result;
use serde_json::{json, Value};
use tracing::debug;

use crate::tools::{ToolArgs, WorkflowTool};

pub async fn dispatch(tool: WorkflowTool, args: &ToolArgs) -> Result<Value> {
    debug!(tool = tool.as_str(), "dispatching workflow pseudo-tool");
    let result = match tool {
        WorkflowTool::AnalyzeUsagePatterns => analyze_usage_patterns(args),
        WorkflowTool::RequestUserConfirmation => request_user_confirmation(args),
        WorkflowTool::BulkMoveContent => bulk_move_content(args),
        WorkflowTool::GetUserContent => get_user_content(args),
        WorkflowTool::AnalyzeContentImportance => analyze_content_importance(args),
        WorkflowTool::CreateMigrationPlan => create_migration_plan(args),
        WorkflowTool::BulkTransferOwnership => bulk_transfer_ownership(args),
        WorkflowTool::UpdateUserPermissions => update_user_permissions(args),
    };
    Ok(result)
}

fn str_arg<'a>(args: &'a ToolArgs, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

/// Identify cleanup candidates by inactivity. The `candidates` key feeds
/// the archival confirmation step.
fn analyze_usage_patterns(args: &ToolArgs) -> Value {
    let days_threshold = args
        .get("days_threshold")
        .and_then(Value::as_u64)
        .unwrap_or(90);
    let project = str_arg(args, "project_name");

    json!({
        "analysis_completed": true,
        "days_threshold": days_threshold,
        "candidates": [
            {
                "id": "wb_123",
                "name": "Old Sales Report",
                "type": "workbook",
                "last_accessed": "2023-06-15",
                "days_since_access": 120,
                "owner": "john.doe",
                "project": project.unwrap_or("Sales"),
            },
            {
                "id": "wb_456",
                "name": "Quarterly Analysis Backup",
                "type": "workbook",
                "last_accessed": "2023-07-20",
                "days_since_access": 95,
                "owner": "jane.smith",
                "project": project.unwrap_or("Finance"),
            }
        ],
        "total_candidates": 2,
        "estimated_storage_savings": "1.2GB",
    })
}

/// Capture operator confirmation for an in-plan action. Archive and move
/// actions auto-confirm; `confirmed_items` feeds the step that acts.
fn request_user_confirmation(args: &ToolArgs) -> Value {
    let action = str_arg(args, "action").unwrap_or("unknown");
    let items = args.get("items").cloned().unwrap_or_else(|| json!([]));
    let items_count = items.as_array().map_or(0, Vec::len);
    let auto_confirmed = matches!(action, "archive" | "move");

    json!({
        "confirmation_requested": true,
        "action": action,
        "items_count": items_count,
        "auto_confirmed": auto_confirmed,
        "confirmed_items": if auto_confirmed { items } else { json!([]) },
        "message": format!("Auto-confirmed {action} action"),
    })
}

fn bulk_move_content(args: &ToolArgs) -> Value {
    let target_project = str_arg(args, "target_project").unwrap_or("Archive");
    let items: Vec<Value> = args
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let moved_items: Vec<Value> = items
        .iter()
        .map(|item| {
            json!({
                "id": item.get("id").cloned().unwrap_or(Value::Null),
                "name": item.get("name").cloned().unwrap_or(Value::Null),
                "type": item.get("type").cloned().unwrap_or_else(|| json!("unknown")),
                "moved_to": target_project,
                "status": "success",
            })
        })
        .collect();

    json!({
        "operation": "bulk_move",
        "target_project": target_project,
        "success_count": moved_items.len(),
        "failure_count": 0,
        "total_processed": items.len(),
        "moved_items": moved_items,
        "failed_items": [],
    })
}

fn get_user_content(args: &ToolArgs) -> Value {
    let username = str_arg(args, "username").unwrap_or("unknown_user");

    json!({
        "user": username,
        "content_inventory": {
            "workbooks": [
                {"id": "wb_789", "name": format!("{username}'s Dashboard"), "project": "Personal"},
                {"id": "wb_790", "name": format!("{username}'s Analysis"), "project": "Team Projects"},
            ],
            "datasources": [
                {"id": "ds_123", "name": format!("{username}'s Data Extract"), "project": "Personal"},
            ],
            "flows": [],
            "subscriptions": [
                {"id": "sub_456", "content": "Weekly Sales Report"},
            ],
        },
        "total_items": 4,
        "projects_involved": ["Personal", "Team Projects"],
        "critical_content": 1,
    })
}

fn analyze_content_importance(args: &ToolArgs) -> Value {
    let user = str_arg(args, "user").unwrap_or("unknown_user");

    json!({
        "user": user,
        "importance_analysis": {
            "critical": [
                {"id": "wb_789", "name": format!("{user}'s Dashboard"), "reason": "High daily usage by team"},
            ],
            "important": [
                {"id": "wb_790", "name": format!("{user}'s Analysis"), "reason": "Referenced by other workbooks"},
            ],
            "low_priority": [
                {"id": "ds_123", "name": format!("{user}'s Data Extract"), "reason": "Personal use only"},
            ],
            "obsolete": [],
        },
        "recommendations": {
            "transfer_to_team": ["wb_789"],
            "archive": ["ds_123"],
            "requires_documentation": ["wb_790"],
        },
    })
}

/// Build the transfer/archive action list later consumed through the
/// `{{migration_plan}}` reference.
fn create_migration_plan(args: &ToolArgs) -> Value {
    let from_user = str_arg(args, "from_user").unwrap_or("unknown_user");
    let to_user = str_arg(args, "to_user").unwrap_or("team_lead");

    json!({
        "migration_plan": {
            "from_user": from_user,
            "to_user": to_user,
            "transfer_actions": [
                {
                    "content_id": "wb_789",
                    "content_name": format!("{from_user}'s Dashboard"),
                    "action": "transfer_ownership",
                    "new_owner": to_user,
                    "notify_stakeholders": true,
                },
                {
                    "content_id": "wb_790",
                    "content_name": format!("{from_user}'s Analysis"),
                    "action": "transfer_ownership",
                    "new_owner": to_user,
                    "add_documentation": true,
                }
            ],
            "archive_actions": [
                {
                    "content_id": "ds_123",
                    "content_name": format!("{from_user}'s Data Extract"),
                    "action": "archive",
                    "reason": "Personal use only",
                }
            ],
            "permission_updates": [
                {"action": "revoke_all_access", "user": from_user, "exceptions": []},
            ],
        },
        "estimated_duration": "15 minutes",
        "stakeholder_notifications": 3,
        "reversible": true,
    })
}

fn bulk_transfer_ownership(args: &ToolArgs) -> Value {
    let from_user = str_arg(args, "from_user").unwrap_or("unknown_user");
    let empty = Vec::new();
    let transfer_actions = args
        .get("migration_plan")
        .and_then(|p| p.get("transfer_actions"))
        .and_then(Value::as_array)
        .unwrap_or(&empty);

    let transferred: Vec<Value> = transfer_actions
        .iter()
        .map(|action| {
            json!({
                "content_id": action.get("content_id").cloned().unwrap_or(Value::Null),
                "content_name": action.get("content_name").cloned().unwrap_or(Value::Null),
                "from_owner": from_user,
                "to_owner": action.get("new_owner").cloned().unwrap_or(Value::Null),
                "status": "success",
            })
        })
        .collect();
    let notifications_sent = transfer_actions
        .iter()
        .filter(|a| a.get("notify_stakeholders").and_then(Value::as_bool) == Some(true))
        .count();

    json!({
        "operation": "bulk_transfer_ownership",
        "from_user": from_user,
        "success_count": transferred.len(),
        "failure_count": 0,
        "transferred": transferred,
        "failed": [],
        "notifications_sent": notifications_sent,
    })
}

fn update_user_permissions(args: &ToolArgs) -> Value {
    let user = str_arg(args, "user").unwrap_or("unknown_user");
    let action = str_arg(args, "action").unwrap_or("revoke_all");

    if action == "revoke_all" {
        let revoked = json!([
            {"content": "Sales Dashboard", "permission": "View", "project": "Sales"},
            {"content": "Finance Reports", "permission": "Edit", "project": "Finance"},
            {"content": "Team Workspace", "permission": "Owner", "project": "Team Projects"},
        ]);
        return json!({
            "operation": "revoke_all_permissions",
            "user": user,
            "total_revoked": revoked.as_array().map_or(0, Vec::len),
            "revoked_permissions": revoked,
            "user_deactivated": true,
            "cleanup_completed": true,
        });
    }

    json!({"operation": action, "user": user, "status": "completed"})
}
