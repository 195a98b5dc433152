//! Lifetrack MCP Server implementation
//!
//! Exposes the record endpoints of the Lifetrack API as tools. The tenant is
//! fixed by `LIFETRACK_TENANT_ID` when the server starts.

use std::collections::HashMap;

use crate::client::LifetrackClient;
use anyhow::Result;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{
    handler::server::tool::ToolRouter,
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;
use uuid::Uuid;

/// Lifetrack MCP Server
#[derive(Clone)]
pub struct LifetrackServer {
    client: LifetrackClient,
    tool_router: ToolRouter<Self>,
}

impl LifetrackServer {
    pub fn from_env() -> Result<Self> {
        let client = LifetrackClient::from_env()?;
        Ok(Self::new(client))
    }

    pub fn new(client: LifetrackClient) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }
}

// --- Tool Parameter Types ---

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListParams {
    /// Collection name: "goals" or "trips"
    pub collection: String,
    /// Optional query filters, e.g. {"category": "savings"} or {"upcoming": "true"}.
    /// "skip" and "take" page through the results.
    #[serde(default)]
    pub filters: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecordParams {
    /// Collection name: "goals" or "trips"
    pub collection: String,
    /// Record id (UUID)
    pub id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateParams {
    /// Collection name: "goals" or "trips"
    pub collection: String,
    /// Record fields. Goals: name, category, target_amount, current_amount, target_date.
    /// Trips: destination, start_date, end_date, notes.
    pub fields: serde_json::Value,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateParams {
    /// Collection name: "goals" or "trips"
    pub collection: String,
    /// Record id (UUID)
    pub id: String,
    /// Complete set of record fields; omitted optional fields are cleared
    pub fields: serde_json::Value,
    /// Version last read; the update is rejected if the record has changed since
    #[serde(default)]
    pub version: Option<i64>,
}

fn parse_id(id: &str) -> Result<Uuid, CallToolResult> {
    Uuid::parse_str(id.trim()).map_err(|_| {
        CallToolResult::error(vec![Content::text(format!(
            "Invalid id '{}': expected a UUID",
            id
        ))])
    })
}

fn into_result(outcome: Result<String>) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(content) => Ok(CallToolResult::success(vec![Content::text(content)])),
        Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
    }
}

#[tool_router]
impl LifetrackServer {
    #[tool(description = "List records in a collection (goals or trips), oldest first.")]
    async fn list_records(
        &self,
        params: Parameters<ListParams>,
    ) -> Result<CallToolResult, McpError> {
        let filters = params.0.filters.unwrap_or_default();
        into_result(self.client.list_records(&params.0.collection, &filters).await)
    }

    #[tool(description = "Get one record by id. The output starts with its current version.")]
    async fn get_record(&self, params: Parameters<RecordParams>) -> Result<CallToolResult, McpError> {
        let id = match parse_id(&params.0.id) {
            Ok(id) => id,
            Err(result) => return Ok(result),
        };
        into_result(self.client.get_record(&params.0.collection, id).await)
    }

    #[tool(description = "Create a record in a collection.")]
    async fn create_record(
        &self,
        params: Parameters<CreateParams>,
    ) -> Result<CallToolResult, McpError> {
        into_result(
            self.client
                .create_record(&params.0.collection, &params.0.fields)
                .await,
        )
    }

    #[tool(
        description = "Replace a record's fields. Pass the version from get_record to avoid overwriting someone else's change."
    )]
    async fn update_record(
        &self,
        params: Parameters<UpdateParams>,
    ) -> Result<CallToolResult, McpError> {
        let id = match parse_id(&params.0.id) {
            Ok(id) => id,
            Err(result) => return Ok(result),
        };
        into_result(
            self.client
                .update_record(&params.0.collection, id, &params.0.fields, params.0.version)
                .await,
        )
    }

    #[tool(description = "Delete a record by id.")]
    async fn delete_record(
        &self,
        params: Parameters<RecordParams>,
    ) -> Result<CallToolResult, McpError> {
        let id = match parse_id(&params.0.id) {
            Ok(id) => id,
            Err(result) => return Ok(result),
        };
        into_result(self.client.delete_record(&params.0.collection, id).await)
    }

    #[tool(description = "Totals across all goals: count, completed, target and saved amounts.")]
    async fn goal_summary(&self) -> Result<CallToolResult, McpError> {
        into_result(self.client.goal_summary().await)
    }
}

#[tool_handler]
impl ServerHandler for LifetrackServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "lifetrack".into(),
                title: Some("Lifetrack MCP Server".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                r#"Lifetrack - personal goals and trips

COLLECTIONS:
- goals: name, category, target_amount, current_amount, target_date (YYYY-MM-DD, optional)
- trips: destination, start_date, end_date (YYYY-MM-DD), notes (optional)

WORKFLOW:
1. 'list_records' - See what exists
2. 'get_record' - Read one record and its version
3. 'update_record' - Send every field, plus the version you read
4. 'goal_summary' - Overall savings progress

A version conflict means the record changed since you read it. Read it again and retry."#
                    .into(),
            ),
        }
    }
}
