//! Discovery center: lists announced nodes and proxies tests to them
//!
//! Every body is JSON with status 200, errors included, so a browser
//! frontend can read them without special handling.

use crate::discovery::{NodeRecord, NodeRegistry};
use crate::error::{AppError, Result};
use crate::logging::Logger;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

/// Forwards a speedtest request to a node
#[derive(Clone)]
pub struct NodeProxy {
    client: reqwest::Client,
}

impl NodeProxy {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::http(format!("failed to build proxy client: {}", e)))?;
        Ok(Self { client })
    }

    /// The node's JSON body, whatever its status code
    pub async fn speedtest(&self, node: &NodeRecord, tool: &str) -> Result<Value> {
        let url = format!("{}/speedtest", node.base_url());
        let body = self
            .client
            .get(&url)
            .query(&[("tool", tool)])
            .send()
            .await?
            .json::<Value>()
            .await?;
        Ok(body)
    }
}

pub struct CenterState {
    registry: NodeRegistry,
    proxy: NodeProxy,
    logger: Logger,
}

impl CenterState {
    pub fn new(registry: NodeRegistry, proxy: NodeProxy, logger: Logger) -> Self {
        Self {
            registry,
            proxy,
            logger: logger.named("CENTER"),
        }
    }
}

pub fn center_router(state: Arc<CenterState>) -> Router {
    Router::new()
        .route("/api/nodes", get(list_nodes))
        .route("/api/speedtest", get(proxy_speedtest))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn list_nodes(State(state): State<Arc<CenterState>>) -> Json<Value> {
    Json(json!({"nodes": state.registry.snapshot()}))
}

#[derive(Debug, Deserialize)]
struct ProxyQuery {
    node: Option<String>,
    tool: Option<String>,
}

async fn proxy_speedtest(State(state): State<Arc<CenterState>>, Query(query): Query<ProxyQuery>) -> Json<Value> {
    let Some(name) = query.node.filter(|n| !n.is_empty()) else {
        return Json(json!({"error": "Missing 'node' parameter"}));
    };

    // Copy out of the registry; the lock is never held across the request
    let Some(node) = state.registry.get(&name) else {
        return Json(json!({"error": format!("Node '{}' not found", name)}));
    };

    let tool = query
        .tool
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| crate::defaults::DEFAULT_TOOL.to_string());

    state.logger.info(&format!("Proxying {} speedtest to {} ({})", tool, name, node.base_url()))
        .field("node", &name)
        .field("tool", &tool)
        .log()
        .await;

    match state.proxy.speedtest(&node, &tool).await {
        Ok(body) => Json(body),
        Err(e) => {
            state.logger.warn(&format!("Node {} unreachable: {}", name, e))
                .field("node", &name)
                .error_info(&e)
                .log()
                .await;
            Json(json!({"error": format!("Failed to reach node: {}", e)}))
        }
    }
}

async fn not_found() -> Json<Value> {
    Json(json!({"error": "Not Found"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DiscoveryEvent;
    use crate::server::testing::spawn;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn center(registry: NodeRegistry) -> Arc<CenterState> {
        let proxy = NodeProxy::new(Duration::from_secs(5)).unwrap();
        Arc::new(CenterState::new(registry, proxy, Logger::new("TEST")))
    }

    async fn get_json(url: String) -> (u16, Value, Option<String>) {
        let response = reqwest::get(url).await.unwrap();
        let status = response.status().as_u16();
        let cors = response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        (status, response.json().await.unwrap(), cors)
    }

    #[tokio::test]
    async fn test_list_nodes_follows_registry() {
        let registry = NodeRegistry::new();
        let base = spawn(center_router(center(registry.clone()))).await;

        registry.apply(DiscoveryEvent::Added {
            name: "kitchen".to_string(),
            ip: "192.168.1.20".to_string(),
            port: 8081,
        });
        let (_, body, _) = get_json(format!("{}/api/nodes", base)).await;
        assert_eq!(body["nodes"]["kitchen"]["ip"], "192.168.1.20");

        registry.apply(DiscoveryEvent::Removed { name: "kitchen".to_string() });
        let (_, body, _) = get_json(format!("{}/api/nodes", base)).await;
        assert_eq!(body, json!({"nodes": {}}));
    }

    #[tokio::test]
    async fn test_proxy_relays_node_response() {
        let node = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/speedtest"))
            .and(query_param("tool", "librespeed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "speed_mbps": 212.5, "tool": "librespeed", "duration_seconds": 18.2
            })))
            .expect(1)
            .mount(&node)
            .await;

        let registry = NodeRegistry::new();
        registry.apply(DiscoveryEvent::Added {
            name: "office".to_string(),
            ip: "127.0.0.1".to_string(),
            port: node.address().port(),
        });
        let base = spawn(center_router(center(registry))).await;

        let (status, body, cors) = get_json(format!("{}/api/speedtest?node=office&tool=librespeed", base)).await;
        assert_eq!(status, 200);
        assert_eq!(body["speed_mbps"], 212.5);
        assert_eq!(cors.as_deref(), Some("*"));
    }

    #[tokio::test]
    async fn test_proxy_relays_node_error_body() {
        let node = MockServer::start().await;
        Mock::given(path("/speedtest"))
            .and(query_param("tool", "ookla"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "Unknown tool: x"})))
            .mount(&node)
            .await;

        let registry = NodeRegistry::new();
        registry.apply(DiscoveryEvent::Added {
            name: "office".to_string(),
            ip: "127.0.0.1".to_string(),
            port: node.address().port(),
        });
        let base = spawn(center_router(center(registry))).await;

        let (status, body, _) = get_json(format!("{}/api/speedtest?node=office", base)).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"error": "Unknown tool: x"}));
    }

    #[tokio::test]
    async fn test_unknown_node_makes_no_request() {
        let node = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&node)
            .await;

        let base = spawn(center_router(center(NodeRegistry::new()))).await;
        let (status, body, _) = get_json(format!("{}/api/speedtest?node=X", base)).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"error": "Node 'X' not found"}));
    }

    #[tokio::test]
    async fn test_missing_node_parameter() {
        let base = spawn(center_router(center(NodeRegistry::new()))).await;
        let (_, body, _) = get_json(format!("{}/api/speedtest", base)).await;
        assert_eq!(body, json!({"error": "Missing 'node' parameter"}));
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let registry = NodeRegistry::new();
        registry.apply(DiscoveryEvent::Added {
            name: "gone".to_string(),
            ip: "127.0.0.1".to_string(),
            port: 1,
        });
        let base = spawn(center_router(center(registry))).await;

        let (_, body, _) = get_json(format!("{}/api/speedtest?node=gone", base)).await;
        assert!(body["error"].as_str().unwrap().starts_with("Failed to reach node: "));
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let base = spawn(center_router(center(NodeRegistry::new()))).await;
        let (status, body, cors) = get_json(format!("{}/index.html", base)).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"error": "Not Found"}));
        assert_eq!(cors.as_deref(), Some("*"));
    }
}
