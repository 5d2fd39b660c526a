use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::github::{GitHubClient, search_query};
use crate::tools::ToolEntry;

pub const NAME: &str = "getPopularRepositories";

const DEFAULT_COUNT: i64 = 10;
const MAX_COUNT: i64 = 100;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[schemars(description = "Popular repositories request")]
pub struct PopularRepositoriesRequest {
    #[schemars(description = "The number of popular repositories to return (default: 10, max: 100).")]
    pub count: u32,
    #[schemars(description = "An optional programming language to filter the repositories by.")]
    pub language: Option<String>,
}

pub fn tool(client: Arc<GitHubClient>) -> ToolEntry {
    let schema = schemars::schema_for!(PopularRepositoriesRequest);
    ToolEntry {
        name: NAME,
        description: "Fetches a specified number of popular GitHub repositories, optionally \
                      filtered by language. Useful for finding widely used or trending projects.",
        input_schema: serde_json::to_value(schema).unwrap(),
        validate: Arc::new(validate),
        invocation_spec: Some(Arc::new(invocation_spec)),
        handler: Arc::new(move |params| {
            let client = client.clone();
            Box::pin(async move { handle(client, params).await })
        }),
    }
}

/// Checks the raw parameter bag and applies defaults. Every field-level
/// problem is collected so the caller sees all of them at once.
fn validate(params: &Value) -> Result<Value, Vec<String>> {
    let map = match params {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        _ => return Err(vec!["parameters must be a JSON object".to_string()]),
    };

    let mut problems = Vec::new();

    let count = match map.get("count") {
        None | Some(Value::Null) => DEFAULT_COUNT,
        Some(value) => match value.as_i64() {
            Some(n) if (1..=MAX_COUNT).contains(&n) => n,
            Some(n) => {
                problems.push(format!("count must be between 1 and {MAX_COUNT}, got {n}"));
                DEFAULT_COUNT
            }
            None => {
                problems.push("count must be an integer".to_string());
                DEFAULT_COUNT
            }
        },
    };

    let language = match map.get("language") {
        None | Some(Value::Null) => None,
        Some(Value::String(lang)) => Some(lang.clone()),
        Some(_) => {
            problems.push("language must be a string".to_string());
            None
        }
    };

    if !problems.is_empty() {
        return Err(problems);
    }

    Ok(json!({ "count": count, "language": language }))
}

/// Describes the GitHub call the handler is about to make. Informational
/// output only; the handler builds its own request.
fn invocation_spec(params: &Value) -> Value {
    let count = params
        .get("count")
        .and_then(Value::as_i64)
        .unwrap_or(DEFAULT_COUNT);
    let language = params.get("language").and_then(Value::as_str);
    let suffix = language
        .map(|lang| format!(" in {lang}"))
        .unwrap_or_default();
    json!({
        "api": "GitHub REST API",
        "endpoint": "/search/repositories",
        "method": "GET",
        "parameters": {
            "q": search_query(language),
            "sort": "stars",
            "order": "desc",
            "per_page": count,
        },
        "description": format!(
            "Calling GitHub API to search for {count} most starred repositories{suffix}."
        ),
    })
}

async fn handle(client: Arc<GitHubClient>, params: Value) -> anyhow::Result<Value> {
    let request: PopularRepositoriesRequest = serde_json::from_value(params)?;
    let repositories = client
        .fetch_popular_repositories(request.count, request.language.as_deref())
        .await?;
    Ok(serde_json::to_value(repositories)?)
}
