use anyhow::{Context, Result};
use qdrant_mcp_launch::RuntimeConfig;
use reqwest::Client;
use serde_json::Value;

/// Outcome of probing one downstream endpoint.
#[derive(Debug, PartialEq)]
pub enum Probe {
    Reachable { detail: String, warning: Option<String> },
    Unreachable { error: String },
    Skipped { reason: String },
}

impl Probe {
    pub fn is_failure(&self) -> bool {
        matches!(self, Probe::Unreachable { .. })
    }
}

pub fn trim_base(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Names from a Qdrant `GET /collections` body.
pub fn collection_names(body: &Value) -> Vec<String> {
    body["result"]["collections"]
        .as_array()
        .map(|cols| {
            cols.iter()
                .filter_map(|c| c["name"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Whether an Ollama `GET /api/tags` body lists `model`. `bge-m3` matches `bge-m3:latest`.
pub fn model_available(body: &Value, model: &str) -> bool {
    let wanted = model.strip_suffix(":latest").unwrap_or(model);
    body["models"]
        .as_array()
        .map(|models| {
            models.iter().filter_map(|m| m["name"].as_str()).any(|name| {
                let name = name.strip_suffix(":latest").unwrap_or(name);
                name == wanted
            })
        })
        .unwrap_or(false)
}

async fn get_json(client: &Client, url: &str, api_key: Option<&str>) -> Result<Value> {
    let mut builder = client.get(url);
    if let Some(key) = api_key {
        builder = builder.header("api-key", key);
    }

    let resp = builder.send().await.context("Failed to connect")?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("HTTP {}: {}", status, body);
    }
    resp.json().await.context("Invalid JSON response")
}

pub async fn probe_qdrant(client: &Client, config: &RuntimeConfig) -> Probe {
    let url = format!("{}/collections", trim_base(&config.qdrant_url));
    let api_key = Some(config.qdrant_api_key.as_str()).filter(|k| !k.is_empty());

    match get_json(client, &url, api_key).await {
        Ok(body) => {
            let names = collection_names(&body);
            let warning = (!names.contains(&config.collection_name)).then(|| {
                format!(
                    "collection '{}' does not exist yet (the server creates it on first store)",
                    config.collection_name
                )
            });
            Probe::Reachable {
                detail: format!("{} collection(s)", names.len()),
                warning,
            }
        }
        Err(e) => Probe::Unreachable {
            error: format!("{:#}", e),
        },
    }
}

pub async fn probe_ollama(client: &Client, config: &RuntimeConfig) -> Probe {
    if !config.embedding_provider.eq_ignore_ascii_case("ollama") {
        return Probe::Skipped {
            reason: format!("EMBEDDING_PROVIDER is '{}'", config.embedding_provider),
        };
    }

    let url = format!("{}/api/tags", trim_base(&config.ollama_base_url));
    match get_json(client, &url, None).await {
        Ok(body) => {
            let warning = (!model_available(&body, &config.embedding_model)).then(|| {
                format!("model '{}' is not pulled", config.embedding_model)
            });
            Probe::Reachable {
                detail: format!("model {}", config.embedding_model),
                warning,
            }
        }
        Err(e) => Probe::Unreachable {
            error: format!("{:#}", e),
        },
    }
}
