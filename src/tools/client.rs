//! External tool client collaborator.
//!
//! The orchestration engine consumes, but does not define, the analytics
//! platform's administrative API. A [`ToolClient`] exposes one async method
//! per external operation; arguments arrive as a resolved JSON mapping and
//! results may be either a JSON mapping or a JSON-encoded string.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Mutex;

use super::ExternalTool;

/// Resolved step arguments, keyed by parameter name.
pub type ToolArgs = Map<String, Value>;

/// One async method per external operation. Default bodies report the
/// operation as unsupported, so partial clients only implement what their
/// site actually serves; `supports` must agree with the overridden set.
#[async_trait]
pub trait ToolClient: Send + Sync {
    async fn search_workbooks(&self, _args: &ToolArgs) -> Result<Value> {
        Err(anyhow::anyhow!("search_workbooks is not supported by this client"))
    }
    async fn search_datasources(&self, _args: &ToolArgs) -> Result<Value> {
        Err(anyhow::anyhow!("search_datasources is not supported by this client"))
    }
    async fn move_workbook(&self, _args: &ToolArgs) -> Result<Value> {
        Err(anyhow::anyhow!("move_workbook is not supported by this client"))
    }
    async fn move_datasource(&self, _args: &ToolArgs) -> Result<Value> {
        Err(anyhow::anyhow!("move_datasource is not supported by this client"))
    }
    async fn publish_workbook(&self, _args: &ToolArgs) -> Result<Value> {
        Err(anyhow::anyhow!("publish_workbook is not supported by this client"))
    }
    async fn refresh_extract(&self, _args: &ToolArgs) -> Result<Value> {
        Err(anyhow::anyhow!("refresh_extract is not supported by this client"))
    }
    async fn list_content_permissions(&self, _args: &ToolArgs) -> Result<Value> {
        Err(anyhow::anyhow!("list_content_permissions is not supported by this client"))
    }

    /// Operations this client is able to serve. Validation rejects plans
    /// that reference anything outside this set.
    fn supports(&self, _tool: ExternalTool) -> bool {
        true
    }
}

/// In-memory client with canned results, used by the CLI and tests in place
/// of a live platform connection. Records every call it receives.
#[derive(Default)]
pub struct SimulatedToolClient {
    calls: Mutex<Vec<String>>,
}

impl SimulatedToolClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the operations invoked so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, tool: ExternalTool) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(tool.as_str().to_string());
        }
    }
}

#[async_trait]
impl ToolClient for SimulatedToolClient {
    async fn search_workbooks(&self, args: &ToolArgs) -> Result<Value> {
        self.record(ExternalTool::SearchWorkbooks);
        let project = args
            .get("project_name")
            .and_then(Value::as_str)
            .unwrap_or("all");
        Ok(json!({
            "workbooks": [
                {"id": "wb_101", "name": "Revenue Overview", "project": project},
                {"id": "wb_102", "name": "Pipeline Health", "project": project},
            ],
            "total": 2,
            "project": project,
        }))
    }

    async fn search_datasources(&self, args: &ToolArgs) -> Result<Value> {
        self.record(ExternalTool::SearchDatasources);
        let project = args
            .get("project_name")
            .and_then(Value::as_str)
            .unwrap_or("all");
        Ok(json!({
            "datasources": [
                {"id": "ds_201", "name": "Warehouse Extract", "project": project},
            ],
            "total": 1,
        }))
    }

    async fn move_workbook(&self, args: &ToolArgs) -> Result<Value> {
        self.record(ExternalTool::MoveWorkbook);
        Ok(json!({
            "moved": true,
            "workbook_id": args.get("workbook_id").cloned().unwrap_or(Value::Null),
            "target_project": args.get("target_project_name").cloned().unwrap_or(Value::Null),
        }))
    }

    async fn move_datasource(&self, args: &ToolArgs) -> Result<Value> {
        self.record(ExternalTool::MoveDatasource);
        Ok(json!({
            "moved": true,
            "datasource_id": args.get("datasource_id").cloned().unwrap_or(Value::Null),
        }))
    }

    async fn publish_workbook(&self, args: &ToolArgs) -> Result<Value> {
        self.record(ExternalTool::PublishWorkbook);
        Ok(json!({
            "published": true,
            "name": args.get("name").cloned().unwrap_or(Value::Null),
        }))
    }

    async fn refresh_extract(&self, args: &ToolArgs) -> Result<Value> {
        self.record(ExternalTool::RefreshExtract);
        Ok(json!({
            "refresh_started": true,
            "datasource_id": args.get("datasource_id").cloned().unwrap_or(Value::Null),
        }))
    }

    async fn list_content_permissions(&self, args: &ToolArgs) -> Result<Value> {
        self.record(ExternalTool::ListContentPermissions);
        let content_type = args
            .get("content_type")
            .and_then(Value::as_str)
            .unwrap_or("workbook");
        Ok(json!({
            "content_type": content_type,
            "permissions": [
                {"grantee": "analysts", "capability": "View", "content": "Revenue Overview"},
                {"grantee": "finance_leads", "capability": "Write", "content": "Pipeline Health"},
            ],
            "total": 2,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_client_records_calls() {
        let client = SimulatedToolClient::new();
        let args = ToolArgs::new();
        client.search_workbooks(&args).await.unwrap();
        client.refresh_extract(&args).await.unwrap();
        assert_eq!(client.calls(), vec!["search_workbooks", "refresh_extract"]);
    }

    #[tokio::test]
    async fn test_search_honors_project_argument() {
        let client = SimulatedToolClient::new();
        let mut args = ToolArgs::new();
        args.insert("project_name".into(), json!("Finance"));
        let result = client.search_workbooks(&args).await.unwrap();
        assert_eq!(result["project"], "Finance");
    }
}
