//! End-to-end hosting tests: a tree uploaded by the synchronizer is served
//! back through the router.

use std::fs;

use aura_core::{DeploymentId, Namespace};
use aura_serve::{StaticResolver, hosting_router};
use aura_store::ObjectStoreClient;
use aura_sync::TreeSync;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

async fn deployed_site() -> ObjectStoreClient {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("css")).unwrap();
    fs::write(dir.path().join("index.html"), "<h1>hello</h1>").unwrap();
    fs::write(dir.path().join("css/site.css"), "h1{}").unwrap();
    fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
    fs::write(dir.path().join("hello world.css"), "p{}").unwrap();
    fs::write(dir.path().join("café.html"), "<p>café</p>").unwrap();

    let client = ObjectStoreClient::in_memory();
    let sync = TreeSync::new(client.clone(), 4);
    let id = DeploymentId::parse("abc123").unwrap();
    sync.upload_tree(dir.path(), Namespace::Dist, &id).await.unwrap();
    client
}

async fn get(client: &ObjectStoreClient, host: &str, path: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let app = hosting_router(StaticResolver::new(client.clone()));
    let resp = app
        .oneshot(
            Request::builder()
                .uri(path)
                .header(header::HOST, host)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, content_type, body)
}

#[tokio::test]
async fn serves_index_with_html_type() {
    let client = deployed_site().await;
    let (status, content_type, body) = get(&client, "abc123.example.com", "/index.html").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/html"));
    assert_eq!(body, b"<h1>hello</h1>");
}

#[tokio::test]
async fn content_types_follow_suffix() {
    let client = deployed_site().await;
    let (_, css, _) = get(&client, "abc123.example.com:3001", "/css/site.css").await;
    assert_eq!(css.as_deref(), Some("text/css"));
    let (_, js, _) = get(&client, "ABC123.example.com", "/app.js").await;
    assert_eq!(js.as_deref(), Some("application/javascript"));
}

#[tokio::test]
async fn encoded_names_are_served() {
    let client = deployed_site().await;
    let (status, content_type, body) =
        get(&client, "abc123.example.com", "/hello%20world.css").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/css"));
    assert_eq!(body, b"p{}");

    let (status, content_type, body) = get(&client, "abc123.example.com", "/caf%C3%A9.html").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/html"));
    assert_eq!(body, "<p>café</p>".as_bytes());
}

#[tokio::test]
async fn unknown_tenant_or_file_is_404() {
    let client = deployed_site().await;
    let (status, _, _) = get(&client, "nobody.example.com", "/index.html").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = get(&client, "abc123.example.com", "/missing.html").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = get(&client, "abc123.example.com", "/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_host_is_400() {
    let client = deployed_site().await;
    let (status, _, _) = get(&client, "bad_label.example.com", "/index.html").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn encoded_traversal_is_400() {
    let client = deployed_site().await;
    let (status, _, _) = get(&client, "abc123.example.com", "/%2e%2e/output/abc123/secret").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_get_is_rejected() {
    let app = hosting_router(StaticResolver::new(ObjectStoreClient::in_memory()));
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/index.html")
                .header(header::HOST, "abc123.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}
