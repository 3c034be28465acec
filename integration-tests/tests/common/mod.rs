use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use uuid::Uuid;

/// One request the mock compute received, body included.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub project_id: Uuid,
    pub node_id: Option<Uuid>,
    pub body: Value,
}

#[derive(Default)]
struct MockState {
    requests: Mutex<Vec<RecordedRequest>>,
    reply: Mutex<Value>,
    fail_with: Mutex<Option<(u16, String)>>,
}

impl MockState {
    fn record(&self, request: RecordedRequest) -> Result<(), (StatusCode, Json<Value>)> {
        if let Some((status, message)) = self.fail_with.lock().unwrap().clone() {
            let status = StatusCode::from_u16(status).unwrap();
            return Err((status, Json(json!({"message": message, "status": status.as_u16()}))));
        }
        self.requests.lock().unwrap().push(request);
        Ok(())
    }
}

/// In-process stand-in for a compute's cloud node endpoints. Records every
/// request and answers create/update with a configurable reply.
pub struct MockCompute {
    url: String,
    state: Arc<MockState>,
    server: tokio::task::JoinHandle<()>,
}

impl MockCompute {
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            reply: Mutex::new(json!({})),
            ..MockState::default()
        });
        let router = Router::new()
            .route("/v1/projects/:project_id/cloud/nodes", post(create_node))
            .route(
                "/v1/projects/:project_id/cloud/nodes/:node_id",
                put(update_node).delete(delete_node),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock compute");
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Mock compute exited");
        });

        Self {
            url: format!("http://{}", addr),
            state,
            server,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Body the mock answers create and update requests with.
    pub fn set_reply(&self, reply: Value) {
        *self.state.reply.lock().unwrap() = reply;
    }

    /// Make every following request fail with the given error body.
    pub fn fail_with(&self, status: u16, message: &str) {
        *self.state.fail_with.lock().unwrap() = Some((status, message.to_string()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for MockCompute {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn create_node(
    State(state): State<Arc<MockState>>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state.record(RecordedRequest {
        method: "POST",
        project_id,
        node_id: None,
        body,
    })?;
    Ok(Json(state.reply.lock().unwrap().clone()))
}

async fn update_node(
    State(state): State<Arc<MockState>>,
    Path((project_id, node_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state.record(RecordedRequest {
        method: "PUT",
        project_id,
        node_id: Some(node_id),
        body,
    })?;
    Ok(Json(state.reply.lock().unwrap().clone()))
}

async fn delete_node(
    State(state): State<Arc<MockState>>,
    Path((project_id, node_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    state.record(RecordedRequest {
        method: "DELETE",
        project_id,
        node_id: Some(node_id),
        body: Value::Null,
    })?;
    Ok(StatusCode::NO_CONTENT)
}
