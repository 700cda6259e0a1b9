//! Speedtest server run on each measurement node

use crate::command::CommandRunner;
use crate::error::AppError;
use crate::logging::Logger;
use crate::report::{JsonLinesSink, SpeedtestResult};
use crate::tools::{ToolAdapter, ToolCatalog};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

pub struct NodeState {
    catalog: ToolCatalog,
    runner: Arc<dyn CommandRunner>,
    iperf_server: Option<String>,
    sink: JsonLinesSink,
    // One test at a time; parallel runs would share the link
    test_lock: Mutex<()>,
    logger: Logger,
}

impl NodeState {
    pub fn new(
        catalog: ToolCatalog,
        runner: Arc<dyn CommandRunner>,
        iperf_server: Option<String>,
        sink: JsonLinesSink,
        logger: Logger,
    ) -> Self {
        Self {
            catalog,
            runner,
            iperf_server,
            sink,
            test_lock: Mutex::new(()),
            logger: logger.named("NODE"),
        }
    }

    /// Run `tool` once; the error string is what the client sees
    pub async fn run_speedtest(&self, tool: &str) -> Result<SpeedtestResult, String> {
        let descriptor = self
            .catalog
            .get(tool)
            .ok_or_else(|| format!("Unknown tool: {}", tool))?
            .clone();

        let _running = self.test_lock.lock().await;
        let started = Instant::now();

        let adapter = ToolAdapter::new(descriptor, self.runner.clone())
            .with_server(self.iperf_server.clone())
            .with_logger(self.logger.clone());

        let speed = adapter.try_run("node").await.map_err(|e| match e {
            AppError::ToolUnavailable(_) => {
                format!("Command for {} not found. Please ensure it is installed.", tool)
            }
            AppError::MissingServer(_) => {
                "iPerf requires a server address; set IPERF_SERVER on the node".to_string()
            }
            other => other.to_string(),
        })?;

        let duration = started.elapsed().as_secs_f64();
        Ok(SpeedtestResult {
            speed_mbps: speed,
            tool: adapter.descriptor().id.to_string(),
            duration_seconds: Some((duration * 100.0).round() / 100.0),
        })
    }
}

pub fn node_router(state: Arc<NodeState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/speedtest", get(speedtest))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

#[derive(Debug, Deserialize)]
struct SpeedtestQuery {
    tool: Option<String>,
}

async fn speedtest(
    State(state): State<Arc<NodeState>>,
    Query(query): Query<SpeedtestQuery>,
) -> Response {
    let tool = query
        .tool
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| crate::defaults::DEFAULT_TOOL.to_string());

    match state.run_speedtest(&tool).await {
        Ok(result) => {
            if let Err(e) = state.sink.append(&result).await {
                state.logger.error(&format!("Failed to save result: {}", e))
                    .field("path", state.sink.path().display().to_string())
                    .error_info(&e)
                    .log()
                    .await;
            }
            state.logger.info(&format!("{} finished: {} Mbps", result.tool, result.speed_mbps))
                .field("tool", &result.tool)
                .field("speed_mbps", result.speed_mbps)
                .log()
                .await;
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(message) => {
            state.logger.warn(&format!("Speedtest with {} failed: {}", tool, message))
                .field("tool", &tool)
                .log()
                .await;
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": message}))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fake::FakeRunner;
    use crate::server::testing::spawn;
    use tempfile::TempDir;

    fn state(runner: FakeRunner, iperf_server: Option<&str>, dir: &TempDir) -> Arc<NodeState> {
        Arc::new(NodeState::new(
            ToolCatalog::new(),
            Arc::new(runner),
            iperf_server.map(String::from),
            JsonLinesSink::new(dir.path().join("reports/server_speedtests.jsonl")),
            Logger::new("TEST"),
        ))
    }

    fn ookla_runner() -> FakeRunner {
        FakeRunner::new().reply(
            "speedtest --accept-license --accept-gdpr -f json",
            r#"{"download":{"bandwidth":12500000}}"#,
        )
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let base = spawn(node_router(state(FakeRunner::new(), None, &dir))).await;

        let body: Value = reqwest::get(format!("{}/health", base)).await.unwrap().json().await.unwrap();
        assert_eq!(body, json!({"status": "healthy"}));
    }

    #[tokio::test]
    async fn test_default_tool_is_ookla_and_result_is_saved() {
        let dir = TempDir::new().unwrap();
        let state = state(ookla_runner(), None, &dir);
        let base = spawn(node_router(state.clone())).await;

        let response = reqwest::get(format!("{}/speedtest", base)).await.unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["speed_mbps"], 100.0);
        assert_eq!(body["tool"], "ookla");
        assert!(body["duration_seconds"].is_number());

        let saved = state.sink.read_all().await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0]["speed_mbps"], 100.0);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_500_and_not_saved() {
        let dir = TempDir::new().unwrap();
        let state = state(FakeRunner::new(), None, &dir);
        let base = spawn(node_router(state.clone())).await;

        let response = reqwest::get(format!("{}/speedtest?tool=fast", base)).await.unwrap();
        assert_eq!(response.status(), 500);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"error": "Unknown tool: fast"}));
        assert!(state.sink.read_all().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_message() {
        let dir = TempDir::new().unwrap();
        let state = state(FakeRunner::new(), None, &dir);

        let err = state.run_speedtest("librespeed").await.unwrap_err();
        assert_eq!(err, "Command for librespeed not found. Please ensure it is installed.");
    }

    #[tokio::test]
    async fn test_iperf_needs_server() {
        let dir = TempDir::new().unwrap();
        let without = state(FakeRunner::new(), None, &dir);
        assert!(without.run_speedtest("iperf").await.unwrap_err().contains("server"));

        let with = state(
            FakeRunner::new().reply(
                "iperf3 -c 10.0.0.9 -R -t 5 --json",
                r#"{"end":{"sum_received":{"bits_per_second":94000000}}}"#,
            ),
            Some("10.0.0.9"),
            &dir,
        );
        let result = with.run_speedtest("iperf").await.unwrap();
        assert_eq!(result.speed_mbps, 94.0);
        assert_eq!(result.tool, "iperf");
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let dir = TempDir::new().unwrap();
        let base = spawn(node_router(state(FakeRunner::new(), None, &dir))).await;

        let response = reqwest::get(format!("{}/metrics", base)).await.unwrap();
        assert_eq!(response.status(), 404);
    }
}
