//! Tool name catalog and collaborator surfaces.
//!
//! Tool dispatch is a closed tagged union rather than name probing: every
//! tool a step may reference is either an [`ExternalTool`] served by the
//! connected [`ToolClient`] or a [`WorkflowTool`] simulated inside the
//! executor. Unknown names fail at parse time with a structured error.

mod client;

pub use client::{SimulatedToolClient, ToolArgs, ToolClient};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Operations served by the external tool client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalTool {
    SearchWorkbooks,
    SearchDatasources,
    MoveWorkbook,
    MoveDatasource,
    PublishWorkbook,
    RefreshExtract,
    ListContentPermissions,
}

impl ExternalTool {
    pub const ALL: [ExternalTool; 7] = [
        ExternalTool::SearchWorkbooks,
        ExternalTool::SearchDatasources,
        ExternalTool::MoveWorkbook,
        ExternalTool::MoveDatasource,
        ExternalTool::PublishWorkbook,
        ExternalTool::RefreshExtract,
        ExternalTool::ListContentPermissions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExternalTool::SearchWorkbooks => "search_workbooks",
            ExternalTool::SearchDatasources => "search_datasources",
            ExternalTool::MoveWorkbook => "move_workbook",
            ExternalTool::MoveDatasource => "move_datasource",
            ExternalTool::PublishWorkbook => "publish_workbook",
            ExternalTool::RefreshExtract => "refresh_extract",
            ExternalTool::ListContentPermissions => "list_content_permissions",
        }
    }
}

/// Workflow-internal pseudo-tools used by templated plans where no direct
/// external API equivalent exists. Their outputs are simulated but keep a
/// stable shape so later template references keep resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowTool {
    AnalyzeUsagePatterns,
    RequestUserConfirmation,
    BulkMoveContent,
    GetUserContent,
    AnalyzeContentImportance,
    CreateMigrationPlan,
    BulkTransferOwnership,
    UpdateUserPermissions,
}

impl WorkflowTool {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowTool::AnalyzeUsagePatterns => "analyze_usage_patterns",
            WorkflowTool::RequestUserConfirmation => "request_user_confirmation",
            WorkflowTool::BulkMoveContent => "bulk_move_content",
            WorkflowTool::GetUserContent => "get_user_content",
            WorkflowTool::AnalyzeContentImportance => "analyze_content_importance",
            WorkflowTool::CreateMigrationPlan => "create_migration_plan",
            WorkflowTool::BulkTransferOwnership => "bulk_transfer_ownership",
            WorkflowTool::UpdateUserPermissions => "update_user_permissions",
        }
    }
}

/// A tool a workflow step may dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    External(ExternalTool),
    Workflow(WorkflowTool),
}

impl ToolName {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::External(t) => t.as_str(),
            ToolName::Workflow(t) => t.as_str(),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tool = match s {
            "search_workbooks" => ToolName::External(ExternalTool::SearchWorkbooks),
            "search_datasources" => ToolName::External(ExternalTool::SearchDatasources),
            "move_workbook" => ToolName::External(ExternalTool::MoveWorkbook),
            "move_datasource" => ToolName::External(ExternalTool::MoveDatasource),
            "publish_workbook" => ToolName::External(ExternalTool::PublishWorkbook),
            "refresh_extract" => ToolName::External(ExternalTool::RefreshExtract),
            "list_content_permissions" => {
                ToolName::External(ExternalTool::ListContentPermissions)
            }
            "analyze_usage_patterns" => ToolName::Workflow(WorkflowTool::AnalyzeUsagePatterns),
            "request_user_confirmation" => {
                ToolName::Workflow(WorkflowTool::RequestUserConfirmation)
            }
            "bulk_move_content" => ToolName::Workflow(WorkflowTool::BulkMoveContent),
            "get_user_content" => ToolName::Workflow(WorkflowTool::GetUserContent),
            "analyze_content_importance" => {
                ToolName::Workflow(WorkflowTool::AnalyzeContentImportance)
            }
            "create_migration_plan" => ToolName::Workflow(WorkflowTool::CreateMigrationPlan),
            "bulk_transfer_ownership" => ToolName::Workflow(WorkflowTool::BulkTransferOwnership),
            "update_user_permissions" => ToolName::Workflow(WorkflowTool::UpdateUserPermissions),
            other => return Err(Error::UnknownTool(other.to_string())),
        };
        Ok(tool)
    }
}

impl Serialize for ToolName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ToolName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Normalize a tool client's return value. Clients may return either a JSON
/// mapping or a JSON-encoded string; both shapes must feed template
/// substitution the same way.
pub fn normalize_output(raw: Value) -> Value {
    match raw {
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(parsed) if parsed.is_object() || parsed.is_array() => parsed,
            _ => Value::String(s),
        },
        other => other,
    }
}
