//! Graph-service HTTP surface.
//!
//! Read endpoints for visualization and CI tooling, plus the internal
//! mutation routes. All responses are JSON; CORS is permissive since the
//! consumers are dashboards and build bots, not browsers with credentials.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use dora_graph::{FileNode, GraphStore, RepoName, StoreError};

type SharedStore = Arc<dyn GraphStore>;

/// Build the graph-service router.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/graph/{owner}/{repo}", get(get_graph))
        .route(
            "/repository/{owner}/{repo}/lastAnalyzedSha",
            get(get_last_analyzed_sha).put(put_last_analyzed_sha),
        )
        .route("/files/{owner}/{repo}/dependencies", get(get_dependencies))
        .route("/files/{owner}/{repo}/dependents", get(get_dependents))
        .route(
            "/files/{owner}/{repo}/recursive-dependents",
            get(get_recursive_dependents),
        )
        .route("/internal/files", post(upsert_file).delete(delete_file))
        .route("/internal/relationships", post(upsert_edge).delete(delete_outgoing))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(store)
}

/// Handler-level error: store failures plus boundary validation.
enum ApiError {
    BadRequest(String),
    NotFound,
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            Self::Store(err) => {
                error!(error = %err, "graph service store error");
                let status = match err {
                    StoreError::Unavailable(_) => StatusCode::BAD_GATEWAY,
                    StoreError::Constraint(_) => StatusCode::CONFLICT,
                    StoreError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, "graph store error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn repo_name(owner: &str, repo: &str) -> Result<RepoName, ApiError> {
    format!("{owner}/{repo}")
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid repository: {owner}/{repo}")))
}

fn node_json(node: &FileNode) -> Value {
    json!({ "id": node.path, "label": node.name })
}

async fn health() -> &'static str {
    "OK"
}

async fn get_graph(
    State(store): State<SharedStore>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let repo = repo_name(&owner, &repo)?;
    let graph = store.full_graph(&repo).await?;

    let nodes: Vec<Value> = graph.files.iter().map(node_json).collect();
    let edges: Vec<Value> = graph
        .edges
        .iter()
        .map(|e| json!({ "from": e.from, "to": e.to }))
        .collect();

    Ok(Json(json!({ "nodes": nodes, "edges": edges })))
}

async fn get_last_analyzed_sha(
    State(store): State<SharedStore>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let repo = repo_name(&owner, &repo)?;
    match store.last_analyzed_sha(&repo).await? {
        Some(sha) => Ok(Json(json!({ "lastAnalyzedSha": sha }))),
        None => Err(ApiError::NotFound),
    }
}

#[derive(Deserialize)]
struct PutShaBody {
    sha: String,
}

async fn put_last_analyzed_sha(
    State(store): State<SharedStore>,
    Path((owner, repo)): Path<(String, String)>,
    Json(body): Json<PutShaBody>,
) -> Result<StatusCode, ApiError> {
    let repo = repo_name(&owner, &repo)?;
    store.set_last_analyzed_sha(&repo, &body.sha).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileQuery {
    file_path: String,
}

async fn get_dependencies(
    State(store): State<SharedStore>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<FileQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let repo = repo_name(&owner, &repo)?;
    let files = store.dependencies(&repo, &query.file_path).await?;
    Ok(Json(files.iter().map(node_json).collect()))
}

async fn get_dependents(
    State(store): State<SharedStore>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<FileQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let repo = repo_name(&owner, &repo)?;
    let files = store.dependents(&repo, &query.file_path).await?;
    Ok(Json(files.iter().map(node_json).collect()))
}

async fn get_recursive_dependents(
    State(store): State<SharedStore>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<FileQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let repo = repo_name(&owner, &repo)?;
    let files = store.recursive_dependents(&repo, &query.file_path).await?;
    Ok(Json(files.iter().map(node_json).collect()))
}

#[derive(Deserialize)]
struct UpsertFileBody {
    repo: String,
    path: String,
    name: String,
}

async fn upsert_file(
    State(store): State<SharedStore>,
    Json(body): Json<UpsertFileBody>,
) -> Result<StatusCode, ApiError> {
    let repo: RepoName = body
        .repo
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid repository: {}", body.repo)))?;
    store.upsert_file(&repo, &body.path, &body.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct FileRefBody {
    repo: String,
    path: String,
}

async fn delete_file(
    State(store): State<SharedStore>,
    Json(body): Json<FileRefBody>,
) -> Result<StatusCode, ApiError> {
    let repo: RepoName = body
        .repo
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid repository: {}", body.repo)))?;
    store.delete_file(&repo, &body.path).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertEdgeBody {
    repo: String,
    from_path: String,
    to_path: String,
    to_name: String,
}

async fn upsert_edge(
    State(store): State<SharedStore>,
    Json(body): Json<UpsertEdgeBody>,
) -> Result<StatusCode, ApiError> {
    let repo: RepoName = body
        .repo
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid repository: {}", body.repo)))?;
    store
        .upsert_edge(&repo, &body.from_path, &body.to_path, &body.to_name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_outgoing(
    State(store): State<SharedStore>,
    Json(body): Json<FileRefBody>,
) -> Result<StatusCode, ApiError> {
    let repo: RepoName = body
        .repo
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid repository: {}", body.repo)))?;
    store.delete_outgoing_edges(&repo, &body.path).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use dora_graph::MemoryGraphStore;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn seeded_router() -> Router {
        let store = MemoryGraphStore::new();
        let repo: RepoName = "acme/widget".parse().unwrap();
        store
            .upsert_edge(&repo, "src/a.ts", "src/b.ts", "b.ts")
            .await
            .unwrap();
        store.set_last_analyzed_sha(&repo, "abc123").await.unwrap();
        router(Arc::new(store))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = seeded_router().await;
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn graph_endpoint_returns_nodes_and_edges() {
        let app = seeded_router().await;
        let response = app
            .oneshot(Request::get("/graph/acme/widget").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(body["edges"][0]["from"], "src/a.ts");
        assert_eq!(body["edges"][0]["to"], "src/b.ts");
    }

    #[tokio::test]
    async fn last_analyzed_sha_roundtrip() {
        let app = seeded_router().await;
        let response = app
            .clone()
            .oneshot(
                Request::get("/repository/acme/widget/lastAnalyzedSha")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["lastAnalyzedSha"], "abc123");

        let response = app
            .oneshot(
                Request::get("/repository/acme/unknown/lastAnalyzedSha")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn dependents_query_uses_file_path_param() {
        let app = seeded_router().await;
        let response = app
            .oneshot(
                Request::get("/files/acme/widget/dependents?filePath=src/b.ts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let nodes = body.as_array().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0]["id"], "src/a.ts");
    }

    #[tokio::test]
    async fn internal_mutation_roundtrip() {
        let store = Arc::new(MemoryGraphStore::new());
        let app = router(store.clone());

        let response = app
            .clone()
            .oneshot(
                Request::post("/internal/relationships")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"repo":"acme/widget","fromPath":"a.ts","toPath":"b.ts","toName":"b.ts"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::delete("/internal/files")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"repo":"acme/widget","path":"b.ts"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let repo: RepoName = "acme/widget".parse().unwrap();
        let graph = dora_graph::GraphStore::full_graph(store.as_ref(), &repo)
            .await
            .unwrap();
        assert_eq!(graph.files.len(), 1);
        assert!(graph.edges.is_empty());
    }

    #[tokio::test]
    async fn invalid_repo_is_bad_request() {
        let app = seeded_router().await;
        let response = app
            .oneshot(
                Request::get("/files/acme//dependents?filePath=a.ts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        // An empty segment never matches the route.
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
