use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool, ToolsCapability,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use php_indexer::IndexCoordinator;

#[derive(Clone)]
pub struct McpServer {
    coordinator: IndexCoordinator,
}

impl McpServer {
    pub fn new(coordinator: IndexCoordinator) -> Self {
        Self { coordinator }
    }
}

fn schema_for<T: JsonSchema>() -> Arc<serde_json::Map<String, serde_json::Value>> {
    let schema = schemars::schema_for!(T);
    match serde_json::to_value(&schema) {
        Ok(serde_json::Value::Object(map)) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    }
}

fn parse_params<T: for<'de> Deserialize<'de>>(
    arguments: Option<serde_json::Map<String, serde_json::Value>>,
) -> Result<T, McpError> {
    serde_json::from_value(serde_json::Value::Object(arguments.unwrap_or_default()))
        .map_err(|e| McpError::invalid_params(e.to_string(), None))
}

fn json_result<T: Serialize>(result: php_indexer::Result<T>) -> CallToolResult {
    match result {
        Ok(value) => {
            let json = serde_json::to_string_pretty(&value).unwrap_or_default();
            CallToolResult::success(vec![Content::text(json)])
        }
        Err(e) => CallToolResult::error(vec![Content::text(e.to_string())]),
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct InitializeParams {
    /// Absolute paths of the project roots to index
    pub roots: Vec<String>,
    /// Glob patterns (relative to each root) to exclude; defaults to the configured list
    #[serde(default)]
    pub ignore: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchSymbolParams {
    /// Case-insensitive fragment of a fully qualified name
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FqnParams {
    /// Fully qualified type name, e.g. App\Models\User
    pub fqn: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EmptyParams {}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(true),
                }),
                ..Default::default()
            },
            server_info: Implementation {
                name: "php-indexer".to_string(),
                title: Some("PHP Indexer".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Incremental PHP code index. Call initialize with the project roots first, \
                 then query symbols, inheritance and usages."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = vec![
            Tool {
                name: "initialize".into(),
                title: Some("Initialize".to_string()),
                description: Some(
                    "Index the given project roots and watch them for changes".into(),
                ),
                input_schema: schema_for::<InitializeParams>(),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
            },
            Tool {
                name: "search_symbol".into(),
                title: Some("Search Symbol".to_string()),
                description: Some(
                    "Find classes, interfaces, traits and enums by name fragment".into(),
                ),
                input_schema: schema_for::<SearchSymbolParams>(),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
            },
            Tool {
                name: "get_inheritance".into(),
                title: Some("Get Inheritance".to_string()),
                description: Some("Direct children and implementors of a type".into()),
                input_schema: schema_for::<FqnParams>(),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
            },
            Tool {
                name: "get_usages".into(),
                title: Some("Get Usages".to_string()),
                description: Some("Files whose declarations depend on a type".into()),
                input_schema: schema_for::<FqnParams>(),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
            },
            Tool {
                name: "get_stats".into(),
                title: Some("Get Stats".to_string()),
                description: Some("Symbol, file and edge counts".into()),
                input_schema: schema_for::<EmptyParams>(),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
            },
        ];

        Ok(ListToolsResult {
            next_cursor: None,
            tools,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!("Tool call: {}", request.name);

        let result = match request.name.as_ref() {
            "initialize" => {
                let params: InitializeParams = parse_params(request.arguments)?;
                let roots: Vec<PathBuf> = params.roots.iter().map(PathBuf::from).collect();
                json_result(self.coordinator.initialize(&roots, params.ignore).await)
            }
            "search_symbol" => {
                let params: SearchSymbolParams = parse_params(request.arguments)?;
                json_result(self.coordinator.search_symbol(&params.query))
            }
            "get_inheritance" => {
                let params: FqnParams = parse_params(request.arguments)?;
                json_result(self.coordinator.get_inheritance(&params.fqn))
            }
            "get_usages" => {
                let params: FqnParams = parse_params(request.arguments)?;
                json_result(self.coordinator.get_usages(&params.fqn))
            }
            "get_stats" => json_result(self.coordinator.get_stats()),
            _ => {
                return Err(McpError::invalid_params(
                    format!("Unknown tool: {}", request.name),
                    None,
                ));
            }
        };

        Ok(result)
    }
}
