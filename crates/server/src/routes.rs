use std::path::{Path as FsPath, PathBuf};
use std::time::Instant;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use protocol::api::{ErrorResponse, JobSnapshot, LexiconSnapshot, UploadResponse};
use protocol::KeywordPayload;
use system_utils::path::sanitize_file_name;

use crate::processing::{spawn_job, UploadedFile};
use crate::state::AppState;

pub(crate) fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/graph/:graph_type", get(get_graph))
        .route("/jobs/:id", get(get_job))
        .route("/jobs/:id/graph/:graph_type", get(get_job_graph))
        .route("/keywords", get(list_keywords))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
        .layer(middleware::from_fn(log_http_request))
}

pub(crate) struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, body: ErrorResponse) -> Self {
        Self { status, body }
    }

    fn bad_request(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorResponse::new(message))
    }

    fn not_found(message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorResponse::new(message))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn log_http_request(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let started = Instant::now();
    let response = next.run(req).await;
    let status = response.status();
    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "http request"
    );
    response
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(String, bytes::Bytes)> = None;
    let mut keywords_raw: Option<String> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                return Err(ApiError::new(
                    err.status(),
                    ErrorResponse::with_error("Invalid upload", err.body_text()),
                ))
            }
        };
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let contents = field.bytes().await.map_err(|err| {
                    ApiError::new(
                        err.status(),
                        ErrorResponse::with_error("Invalid upload", err.body_text()),
                    )
                })?;
                file = Some((file_name, contents));
            }
            "keywords" => {
                let text = field.text().await.map_err(|err| {
                    ApiError::new(
                        err.status(),
                        ErrorResponse::with_error("Invalid keywords payload", err.body_text()),
                    )
                })?;
                keywords_raw = Some(text);
            }
            _ => {}
        }
    }

    let Some((raw_name, contents)) = file else {
        return Err(ApiError::bad_request("No file uploaded"));
    };
    let Some(file_name) = sanitize_file_name(&raw_name) else {
        return Err(ApiError::bad_request("No selected file"));
    };
    let keywords = match keywords_raw.as_deref() {
        Some(raw) => KeywordPayload::parse(raw).map_err(|err| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_error("Invalid keywords payload", err.to_string()),
            )
        })?,
        None => KeywordPayload::default(),
    };

    let job_id = state.jobs.create(&file_name).await;
    tracing::info!(
        event = "upload.received",
        job_id = %job_id,
        file_name = %file_name,
        bytes = contents.len(),
        high = keywords.high.len(),
        medium = keywords.medium.len(),
        low = keywords.low.len(),
        "upload received"
    );
    let upload = UploadedFile {
        file_name,
        contents,
    };
    let result = match spawn_job(&state, job_id.clone(), upload, keywords).await {
        Ok(result) => result,
        Err(err) => Err(format!("processing task failed: {err}")),
    };

    match result {
        Ok(outcome) => Ok(Json(UploadResponse {
            message: "File processed successfully".to_string(),
            file_path: outcome.upload_path.display().to_string(),
            job_id,
            processed_path: outcome.processed_path.display().to_string(),
            rows: outcome.rows,
            lexicon_version: outcome.lexicon_version,
            sentiment_counts: outcome.distribution.sentiment,
            risk_counts: outcome.distribution.risk,
        })),
        Err(error) => Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::with_error("Error processing file", error),
        )),
    }
}

async fn get_graph(Path(graph_type): Path<String>, State(state): State<AppState>) -> Response {
    serve_graph(state.analyzer.storage.graph_dir(), &graph_type).await
}

async fn get_job_graph(
    Path((id, graph_type)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    if !is_plain_name(&id) {
        return ApiError::not_found("Graph not found").into_response();
    }
    serve_graph(&state.analyzer.storage.job_graph_dir(&id), &graph_type).await
}

async fn serve_graph(dir: &FsPath, graph_type: &str) -> Response {
    let Some(path) = graph_path(dir, graph_type) else {
        return ApiError::not_found("Graph not found").into_response();
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            ApiError::not_found("Graph not found").into_response()
        }
        Err(err) => {
            tracing::warn!(
                event = "graph.read_failed",
                path = %path.display(),
                error = %err,
                "failed to read graph"
            );
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::with_error("Failed to read graph", err.to_string()),
            )
            .into_response()
        }
    }
}

/// Any name maps to `<name>.png` inside `dir`; names that could leave it do not.
fn graph_path(dir: &FsPath, graph_type: &str) -> Option<PathBuf> {
    if !is_plain_name(graph_type) {
        return None;
    }
    Some(dir.join(format!("{graph_type}.png")))
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains(['/', '\\', '\0'])
        && !name.starts_with('.')
}

async fn get_job(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<JobSnapshot>, ApiError> {
    state
        .jobs
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Job not found"))
}

async fn list_keywords(State(state): State<AppState>) -> Json<LexiconSnapshot> {
    let lexicon = state.analyzer.lexicon.snapshot();
    Json(LexiconSnapshot {
        version: lexicon.version(),
        keywords: lexicon.iter().map(str::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::state::build_app_state;
    use reqwest::multipart::{Form, Part};
    use serde_json::Value;
    use tokio::net::TcpListener;

    struct TestServer {
        base: String,
        dir: tempfile::TempDir,
    }

    impl TestServer {
        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base, path)
        }
    }

    async fn spawn_server() -> TestServer {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = ServerConfig::default();
        config.storage.upload_dir = dir.path().join("uploads").to_string_lossy().to_string();
        config.storage.graph_dir = dir.path().join("graphs").to_string_lossy().to_string();
        let state = build_app_state(&config).expect("state");
        let app = build_router(state, config.limits.max_upload_bytes);
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        TestServer {
            base: format!("http://{addr}"),
            dir,
        }
    }

    fn csv_form(file_name: &str, csv: &str) -> Form {
        Form::new().part(
            "file",
            Part::bytes(csv.as_bytes().to_vec()).file_name(file_name.to_string()),
        )
    }

    async fn post_upload(server: &TestServer, form: Form) -> (StatusCode, Value) {
        let response = reqwest::Client::new()
            .post(server.url("/upload"))
            .multipart(form)
            .send()
            .await
            .expect("send");
        let status = StatusCode::from_u16(response.status().as_u16()).expect("status");
        let body = response.json::<Value>().await.expect("json");
        (status, body)
    }

    #[tokio::test]
    async fn graph_is_not_found_before_any_upload() {
        let server = spawn_server().await;
        let response = reqwest::get(server.url("/graph/nonexistent"))
            .await
            .expect("get");
        assert_eq!(response.status().as_u16(), 404);
        let body = response.json::<Value>().await.expect("json");
        assert_eq!(body, serde_json::json!({ "message": "Graph not found" }));
    }

    #[tokio::test]
    async fn upload_scores_classifies_and_serves_graphs() {
        let server = spawn_server().await;
        let (status, body) = post_upload(
            &server,
            csv_form(
                "chat.csv",
                "User,Message\nalice,I will shoot and retaliate tonight\nbob,Let's meet for coffee tomorrow\n",
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["message"], "File processed successfully");
        assert_eq!(body["rows"], 2);
        let job_id = body["job_id"].as_str().expect("job id").to_string();
        assert!(body["file_path"].as_str().expect("file path").ends_with("chat.csv"));

        let processed =
            std::fs::read_to_string(server.dir.path().join("uploads/processed_chat_data.csv"))
                .expect("processed csv");
        let lines: Vec<_> = processed.lines().collect();
        assert_eq!(
            lines[0],
            "User,Message,Sentiment Score,Sentiment Label,Risk Level"
        );
        assert!(lines[1].ends_with(",High Risk"), "{}", lines[1]);
        assert!(lines[2].ends_with(",Low Risk"), "{}", lines[2]);

        for name in ["sentiment_distribution", "risk_distribution"] {
            let response = reqwest::get(server.url(&format!("/graph/{name}")))
                .await
                .expect("get graph");
            assert_eq!(response.status().as_u16(), 200);
            assert_eq!(
                response
                    .headers()
                    .get("content-type")
                    .and_then(|value| value.to_str().ok()),
                Some("image/png")
            );
            let job_graph = reqwest::get(server.url(&format!("/jobs/{job_id}/graph/{name}")))
                .await
                .expect("get job graph");
            assert_eq!(job_graph.status().as_u16(), 200);
        }

        let job = reqwest::get(server.url(&format!("/jobs/{job_id}")))
            .await
            .expect("get job")
            .json::<Value>()
            .await
            .expect("json");
        assert_eq!(job["status"], "completed");
        assert_eq!(job["rows"], 2);
    }

    #[tokio::test]
    async fn request_keywords_extend_the_lexicon() {
        let server = spawn_server().await;
        let form = csv_form("coffee.csv", "Message\nLet's meet for coffee tomorrow\n").text(
            "keywords",
            r#"{"high":["coffee"],"medium":[],"low":[]}"#,
        );
        let (status, body) = post_upload(&server, form).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["lexicon_version"], 1);
        assert_eq!(
            body["risk_counts"],
            serde_json::json!([
                { "label": "Low Risk", "count": 0 },
                { "label": "Medium Risk", "count": 1 },
                { "label": "High Risk", "count": 0 },
            ])
        );

        let keywords = reqwest::get(server.url("/keywords"))
            .await
            .expect("get keywords")
            .json::<Value>()
            .await
            .expect("json");
        assert_eq!(keywords["version"], 1);
        let list = keywords["keywords"].as_array().expect("keywords");
        assert!(list.iter().any(|keyword| keyword == "coffee"));
        assert!(list.iter().any(|keyword| keyword == "cartel"));
    }

    #[tokio::test]
    async fn missing_message_column_is_a_processing_error() {
        let server = spawn_server().await;
        let (status, body) =
            post_upload(&server, csv_form("bad.csv", "User,Text\nalice,hello\n")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Error processing file");
        assert!(body["error"].as_str().expect("error").contains("Message"));
        assert!(!server.dir.path().join("uploads/processed_chat_data.csv").exists());
        assert!(!server.dir.path().join("graphs/risk_distribution.png").exists());
        let leftovers = std::fs::read_dir(server.dir.path().join("uploads"))
            .expect("read uploads")
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn short_rows_are_accepted_and_long_rows_rejected() {
        let server = spawn_server().await;
        let (status, body) = post_upload(
            &server,
            csv_form("short.csv", "Message,User\nI will shoot and retaliate tonight\nhi,bob\n"),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["rows"], 2);

        let (status, body) = post_upload(
            &server,
            csv_form("long.csv", "Message,User\nhi,bob,extra\n"),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().expect("error").contains("fields"));
    }

    #[tokio::test]
    async fn rejects_requests_without_a_file() {
        let server = spawn_server().await;
        let (status, body) = post_upload(&server, Form::new().text("keywords", "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No file uploaded");

        let (status, body) = post_upload(&server, Form::new().text("file", "Message\nhi\n")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No selected file");
    }

    #[tokio::test]
    async fn malformed_keywords_are_a_bad_request() {
        let server = spawn_server().await;
        let form = csv_form("chat.csv", "Message\nhello\n").text("keywords", "{high: [");
        let (status, body) = post_upload(&server, form).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid keywords payload");
    }

    #[tokio::test]
    async fn uploads_get_distinct_jobs() {
        let server = spawn_server().await;
        let (_, first) = post_upload(&server, csv_form("a.csv", "Message\nhello\n")).await;
        let (_, second) = post_upload(&server, csv_form("a.csv", "Message\nbye\n")).await;
        assert_ne!(first["job_id"], second["job_id"]);
        assert_ne!(first["file_path"], second["file_path"]);
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let server = spawn_server().await;
        let response = reqwest::get(server.url("/jobs/missing")).await.expect("get");
        assert_eq!(response.status().as_u16(), 404);
        let body = response.json::<Value>().await.expect("json");
        assert_eq!(body["message"], "Job not found");
    }

    #[test]
    fn graph_names_cannot_escape_the_directory() {
        let dir = FsPath::new("/srv/graphs");
        assert_eq!(
            graph_path(dir, "risk_distribution"),
            Some(PathBuf::from("/srv/graphs/risk_distribution.png"))
        );
        assert_eq!(
            graph_path(dir, "anything"),
            Some(PathBuf::from("/srv/graphs/anything.png"))
        );
        assert!(graph_path(dir, "../secret").is_none());
        assert!(graph_path(dir, "a/b").is_none());
        assert!(graph_path(dir, "").is_none());
        assert!(graph_path(dir, ".hidden").is_none());
    }
}
