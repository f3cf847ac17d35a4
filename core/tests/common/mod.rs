//! In-process backupchan server used by the integration tests.

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use backupchan_core::{
    Api, Backup, BackupRecycleAction, BackupRecycleCriteria, BackupTarget, BackupType,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Default)]
pub struct ServerState {
    pub api_key: String,
    pub targets: Vec<BackupTarget>,
    pub backups: Vec<Backup>,
    pub uploads: Vec<(String, Vec<u8>)>,
    /// Adds an undecodable backup record to target detail responses.
    pub malformed_backups: bool,
}

type Shared = Arc<Mutex<ServerState>>;

pub struct FakeServer {
    pub port: u16,
    pub state: Shared,
}

impl FakeServer {
    pub async fn spawn(api_key: &str) -> Self {
        let state: Shared = Arc::new(Mutex::new(ServerState {
            api_key: api_key.to_string(),
            ..Default::default()
        }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { port, state }
    }

    pub fn api(&self, api_key: &str) -> Api {
        Api::new("http://127.0.0.1", self.port, api_key).unwrap()
    }
}

#[derive(Deserialize)]
struct TargetBody {
    name: String,
    backup_type: Option<BackupType>,
    recycle_criteria: BackupRecycleCriteria,
    recycle_value: i64,
    recycle_action: BackupRecycleAction,
    location: String,
    name_template: String,
    deduplicate: bool,
}

#[derive(Deserialize)]
struct DeleteBody {
    delete_files: bool,
}

#[derive(Deserialize)]
struct RecycleBody {
    is_recycled: bool,
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/target", get(list_targets).post(create_target))
        .route(
            "/api/target/:id",
            get(show_target).patch(edit_target).delete(delete_target),
        )
        .route("/api/target/:id/all", delete(delete_target_backups))
        .route("/api/target/:id/upload", post(upload_backup))
        .route("/api/backup/:id", patch(recycle_backup).delete(delete_backup))
        .route("/api/recycle_bin", get(list_recycle_bin).delete(clear_recycle_bin))
        .with_state(state)
}

fn ok(body: serde_json::Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"success": false, "message": message}))).into_response()
}

fn authorized(state: &Shared, headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", state.lock().unwrap().api_key);
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected)
}

macro_rules! require_auth {
    ($state:expr, $headers:expr) => {
        if !authorized(&$state, &$headers) {
            return fail(StatusCode::UNAUTHORIZED, "Invalid API key");
        }
    };
}

async fn list_targets(State(state): State<Shared>, headers: HeaderMap) -> Response {
    require_auth!(state, headers);
    let targets = state.lock().unwrap().targets.clone();
    ok(json!({"success": true, "targets": targets}))
}

async fn create_target(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<TargetBody>,
) -> Response {
    require_auth!(state, headers);
    let Some(backup_type) = body.backup_type else {
        return fail(StatusCode::BAD_REQUEST, "backup_type is required");
    };
    let id = uuid::Uuid::new_v4().to_string();
    state.lock().unwrap().targets.push(BackupTarget {
        id: id.clone(),
        name: body.name,
        backup_type,
        recycle_criteria: body.recycle_criteria,
        recycle_value: body.recycle_value,
        recycle_action: body.recycle_action,
        location: body.location,
        name_template: body.name_template,
        deduplicate: body.deduplicate,
    });
    ok(json!({"success": true, "id": id}))
}

async fn show_target(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    require_auth!(state, headers);
    let guard = state.lock().unwrap();
    let Some(target) = guard.targets.iter().find(|t| t.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Target not found");
    };
    let mut backups: Vec<serde_json::Value> = guard
        .backups
        .iter()
        .filter(|b| b.target_id == id)
        .map(|b| serde_json::to_value(b).unwrap())
        .collect();
    if guard.malformed_backups {
        backups.push(json!({"id": "broken", "created_at": "yesterday"}));
    }
    ok(json!({"success": true, "target": target, "backups": backups}))
}

async fn edit_target(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<TargetBody>,
) -> Response {
    require_auth!(state, headers);
    if body.backup_type.is_some() {
        return fail(StatusCode::BAD_REQUEST, "backup_type cannot be changed");
    }
    let mut guard = state.lock().unwrap();
    let Some(target) = guard.targets.iter_mut().find(|t| t.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Target not found");
    };
    target.name = body.name;
    target.recycle_criteria = body.recycle_criteria;
    target.recycle_value = body.recycle_value;
    target.recycle_action = body.recycle_action;
    target.location = body.location;
    target.name_template = body.name_template;
    target.deduplicate = body.deduplicate;
    ok(json!({"success": true}))
}

async fn delete_target(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(_body): Json<DeleteBody>,
) -> Response {
    require_auth!(state, headers);
    let mut guard = state.lock().unwrap();
    let before = guard.targets.len();
    guard.targets.retain(|t| t.id != id);
    if guard.targets.len() == before {
        return fail(StatusCode::NOT_FOUND, "Target not found");
    }
    guard.backups.retain(|b| b.target_id != id);
    ok(json!({"success": true}))
}

async fn delete_target_backups(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(_body): Json<DeleteBody>,
) -> Response {
    require_auth!(state, headers);
    let mut guard = state.lock().unwrap();
    if !guard.targets.iter().any(|t| t.id == id) {
        return fail(StatusCode::NOT_FOUND, "Target not found");
    }
    guard.backups.retain(|b| b.target_id != id);
    ok(json!({"success": true}))
}

async fn upload_backup(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    require_auth!(state, headers);

    let mut manual = false;
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "manual" => manual = field.text().await.unwrap() == "1",
            "backup_file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.unwrap().to_vec();
                file = Some((filename, data));
            }
            _ => {}
        }
    }
    let Some((filename, data)) = file else {
        return fail(StatusCode::BAD_REQUEST, "backup_file is required");
    };

    let mut guard = state.lock().unwrap();
    if !guard.targets.iter().any(|t| t.id == id) {
        return fail(StatusCode::NOT_FOUND, "Target not found");
    }
    let backup_id = uuid::Uuid::new_v4().to_string();
    guard.backups.push(Backup {
        id: backup_id.clone(),
        target_id: id,
        created_at: Utc::now(),
        manual,
        is_recycled: false,
        filesize: data.len() as u64,
    });
    guard.uploads.push((filename, data));
    ok(json!({"success": true, "id": backup_id}))
}

async fn delete_backup(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(_body): Json<DeleteBody>,
) -> Response {
    require_auth!(state, headers);
    let mut guard = state.lock().unwrap();
    let before = guard.backups.len();
    guard.backups.retain(|b| b.id != id);
    if guard.backups.len() == before {
        return fail(StatusCode::NOT_FOUND, "Backup not found");
    }
    ok(json!({"success": true}))
}

async fn recycle_backup(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RecycleBody>,
) -> Response {
    require_auth!(state, headers);
    let mut guard = state.lock().unwrap();
    let Some(backup) = guard.backups.iter_mut().find(|b| b.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Backup not found");
    };
    backup.is_recycled = body.is_recycled;
    ok(json!({"success": true}))
}

async fn list_recycle_bin(State(state): State<Shared>, headers: HeaderMap) -> Response {
    require_auth!(state, headers);
    let guard = state.lock().unwrap();
    let backups: Vec<&Backup> = guard.backups.iter().filter(|b| b.is_recycled).collect();
    ok(json!({"success": true, "backups": backups}))
}

async fn clear_recycle_bin(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<DeleteBody>,
) -> Response {
    require_auth!(state, headers);
    let _ = body.delete_files;
    state.lock().unwrap().backups.retain(|b| !b.is_recycled);
    ok(json!({"success": true}))
}
