//! Page shell routes.

mod common;

use common::{app, get, send};

#[tokio::test]
async fn index_declares_interaction_targets() {
    let resp = send(app(), get("/")).await;

    assert_eq!(resp.status, 200);
    assert!(resp.content_type.starts_with("text/html"));

    let body = &resp.body;
    assert!(body.starts_with("<!DOCTYPE html>"));
    assert!(body.contains("htmx.org"));
    assert!(body.contains(r##"hx-post="/greet" hx-target="#greeting""##));
    assert!(body.contains(r#"hx-post="/counter""#));
    assert!(body.contains(r#"hx-get="/birds/1""#));
    assert!(body.contains(r#"hx-get="/ai/panel""#));
    assert!(body.contains(r#"id="greeting""#));
}

#[tokio::test]
async fn index_shows_counter_at_zero_and_default_prompt() {
    let resp = send(app(), get("/")).await;

    assert!(resp.body.contains("Clicked 0 times"));
    assert!(resp.body.contains("What is the capital of France?"));
}

#[tokio::test]
async fn birds_page_renders_catalogue() {
    let resp = send(app(), get("/birds")).await;

    assert_eq!(resp.status, 200);
    assert!(resp.body.contains("<h1>Welcome to the story of birds</h1>"));
    assert!(resp.body.contains("adler-3366239_1280.jpg"));
    for bird in hxloop::catalog::all() {
        assert!(resp.body.contains(bird.name), "missing {}", bird.name);
    }
}

#[tokio::test]
async fn unknown_route_is_html_404() {
    let resp = send(app(), get("/nowhere")).await;

    assert_eq!(resp.status, 404);
    assert!(resp.content_type.starts_with("text/html"));
    assert!(resp.body.contains(r#"data-error-type="not_found""#));
}

#[tokio::test]
async fn health_reports_service() {
    let resp = send(app(), get("/health")).await;

    assert_eq!(resp.status, 200);
    let json: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "hxloop");
}
