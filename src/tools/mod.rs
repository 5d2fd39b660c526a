use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::github::GitHubClient;

pub mod popular_repositories;

pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>;

pub type Handler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;
pub type Validator = Arc<dyn Fn(&Value) -> Result<Value, Vec<String>> + Send + Sync>;
pub type SpecBuilder = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// One registered tool: metadata plus the closures the dispatcher drives.
///
/// `validate` turns the raw parameter bag into normalized parameters or a
/// list of field-level problems; the handler is only ever called with a
/// value that passed the same entry's `validate`.
pub struct ToolEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub validate: Validator,
    pub invocation_spec: Option<SpecBuilder>,
    pub handler: Handler,
}

/// Discovery metadata for one tool, as served by `GET /tools`.
#[derive(Debug, Serialize)]
pub struct ToolSpecification {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Fixed, ordered tool list, built once at startup. Every handler closes
/// over the shared GitHub client; nothing is mutated after construction.
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
}

impl ToolRegistry {
    pub fn new(client: Arc<GitHubClient>) -> Self {
        Self {
            entries: vec![popular_repositories::tool(client)],
        }
    }

    pub fn find(&self, name: &str) -> Option<&ToolEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn specifications(&self) -> Vec<ToolSpecification> {
        self.entries
            .iter()
            .map(|entry| ToolSpecification {
                name: entry.name,
                description: entry.description,
                // The structured schema is not serialized for discovery yet.
                input_schema: Value::Object(serde_json::Map::new()),
            })
            .collect()
    }
}

/// Fallback for entries that do not build their own invocation description.
pub fn generic_invocation_spec(name: &str, params: &Value) -> Value {
    serde_json::json!({
        "api": "GitHub REST API",
        "description": format!("Invoking tool '{name}' with parameters: {params}"),
    })
}
