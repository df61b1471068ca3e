//! Local asset server for the review UI.
//!
//! Serves the review directory (portal files and the generated manifest)
//! and proxies asset reads into the registered project roots through a
//! URL-prefix mapping, so the browser client can load original files
//! without copying them. Responses carry permissive CORS headers and a
//! no-cache directive; the server is strictly local and read-only.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Path as UrlPath, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::ResolvedConfig;

/// Shared state: the review directory and the prefix-to-root mappings,
/// in catalog order (first matching prefix wins)
pub struct ServerState {
    review_dir: PathBuf,
    roots: Vec<(String, PathBuf)>,
}

impl ServerState {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            review_dir: config.review_dir.clone(),
            roots: config
                .catalog
                .projects
                .iter()
                .map(|p| (p.url_prefix(), p.root.clone()))
                .collect(),
        }
    }
}

/// Build the router for the given state
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/*path", get(serve_path))
        .layer(middleware::from_fn(log_failures))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::OPTIONS]),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
        .with_state(state)
}

/// Run the server until interrupted
pub async fn run(config: &ResolvedConfig, port: u16) -> Result<()> {
    let state = Arc::new(ServerState::from_config(config));

    tracing::info!("Review portal: {}", state.review_dir.display());
    for (prefix, root) in &state.roots {
        let status = if root.exists() { "ok" } else { "missing" };
        tracing::info!("  {} -> {} ({})", prefix, root.display(), status);
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;

    Ok(())
}

/// GET / serves the portal index from the review directory
async fn serve_index(State(state): State<Arc<ServerState>>) -> Response {
    serve_from(&state.review_dir, "index.html").await
}

/// Any other path: project prefixes first, then the review directory
async fn serve_path(
    State(state): State<Arc<ServerState>>,
    UrlPath(path): UrlPath<String>,
) -> Response {
    let (base, relative) = resolve_target(&state.roots, &state.review_dir, &path);
    serve_from(base, &relative).await
}

/// Map a URL path to (filesystem base, relative path). The wildcard
/// capture has no leading slash; prefixes are matched against the full
/// URL path, first match wins.
fn resolve_target<'a>(
    roots: &'a [(String, PathBuf)],
    review_dir: &'a Path,
    path: &str,
) -> (&'a Path, String) {
    let url_path = format!("/{}", path);

    for (prefix, root) in roots {
        if let Some(rest) = url_path.strip_prefix(prefix.as_str()) {
            return (root.as_path(), rest.to_string());
        }
    }

    (review_dir, path.to_string())
}

/// Serve one file from under a base directory, refusing path traversal
async fn serve_from(base: &Path, path: &str) -> Response {
    let clean = path.replace("..", "");
    let clean = clean.trim_start_matches('/');
    let file_path = base.join(clean);

    // Ensure the resolved path is still within the base directory
    match file_path.canonicalize() {
        Ok(canonical) => {
            let base_canonical = base.canonicalize().unwrap_or_default();
            if !canonical.starts_with(&base_canonical) {
                return (StatusCode::FORBIDDEN, "Path traversal denied").into_response();
            }
        }
        Err(_) => {
            return (StatusCode::NOT_FOUND, "File not found").into_response();
        }
    }

    if !file_path.is_file() {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }

    match tokio::fs::read(&file_path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&file_path)
                .first_or_octet_stream()
                .to_string();

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, mime)
                .header(header::CONTENT_LENGTH, bytes.len().to_string())
                .body(Body::from(bytes))
                .unwrap_or_else(|_| {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Response build failed").into_response()
                })
        }
        Err(_) => (StatusCode::NOT_FOUND, "File not found").into_response(),
    }
}

/// Successful requests stay quiet; everything else is logged
async fn log_failures(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    if !response.status().is_success() {
        tracing::warn!("{} {}", response.status().as_u16(), path);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_target_prefix_wins() {
        let roots = vec![
            ("/SpellEngine/".to_string(), PathBuf::from("/proj/spell")),
            ("/Hash/".to_string(), PathBuf::from("/proj/hash")),
        ];
        let review = PathBuf::from("/review");

        let (base, rest) = resolve_target(&roots, &review, "SpellEngine/assets/a.png");
        assert_eq!(base, Path::new("/proj/spell"));
        assert_eq!(rest, "assets/a.png");

        let (base, rest) = resolve_target(&roots, &review, "Hash/img/b.png");
        assert_eq!(base, Path::new("/proj/hash"));
        assert_eq!(rest, "img/b.png");
    }

    #[test]
    fn test_resolve_target_first_match_wins() {
        let roots = vec![
            ("/P/".to_string(), PathBuf::from("/first")),
            ("/P/".to_string(), PathBuf::from("/second")),
        ];
        let review = PathBuf::from("/review");

        let (base, _) = resolve_target(&roots, &review, "P/x");
        assert_eq!(base, Path::new("/first"));
    }

    #[test]
    fn test_resolve_target_falls_back_to_review_dir() {
        let roots = vec![("/SpellEngine/".to_string(), PathBuf::from("/proj/spell"))];
        let review = PathBuf::from("/review");

        let (base, rest) = resolve_target(&roots, &review, "manifest.json");
        assert_eq!(base, Path::new("/review"));
        assert_eq!(rest, "manifest.json");
    }

    #[tokio::test]
    async fn test_serve_from_reads_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("manifest.json"), b"{}").unwrap();

        let response = serve_from(temp.path(), "manifest.json").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_serve_from_missing_file_404() {
        let temp = TempDir::new().unwrap();

        let response = serve_from(temp.path(), "gone.png").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_from_refuses_traversal() {
        let temp = TempDir::new().unwrap();
        let inner = temp.path().join("inner");
        std::fs::create_dir_all(&inner).unwrap();
        std::fs::write(temp.path().join("secret.txt"), b"s").unwrap();

        // ".." segments are stripped, so the lookup misses instead of
        // escaping the base directory
        let response = serve_from(&inner, "../secret.txt").await;
        assert_ne!(response.status(), StatusCode::OK);
    }
}
