mod common;
mod upstreams;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::read_json;
use tower::ServiceExt;
use upstreams::{open_rules, portal_app, spawn_upstreams};

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn system_endpoints_answer_from_memory() {
    let upstreams = spawn_upstreams().await;
    let app = portal_app(&upstreams, open_rules());

    let response = app
        .clone()
        .oneshot(get("/v1/system/info"))
        .await
        .expect("info");
    assert_eq!(response.status(), StatusCode::OK);
    let info = read_json(response).await;
    assert_eq!(info["service"], "wwky-portal");
    assert_eq!(info["api_version"], "v1");
    assert_eq!(info["map_defaults"]["longitude"], -85.8);
    assert_eq!(info["map_defaults"]["latitude"], 37.8);
    assert_eq!(info["map_defaults"]["zoom"], 7);

    let response = app
        .clone()
        .oneshot(get("/v1/system/health"))
        .await
        .expect("health");
    assert_eq!(response.status(), StatusCode::OK);
    let health = read_json(response).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["upstreams"]["cms_token_configured"], false);
}

#[tokio::test]
async fn openapi_document_lists_the_routes() {
    let upstreams = spawn_upstreams().await;
    let app = portal_app(&upstreams, open_rules());

    let response = app
        .clone()
        .oneshot(get("/v1/openapi.json"))
        .await
        .expect("openapi");
    assert_eq!(response.status(), StatusCode::OK);
    let document = read_json(response).await;
    assert_eq!(document["info"]["title"], "wwky-portal");
    let paths = document["paths"].as_object().expect("paths");
    assert!(paths.contains_key("/v1/map/views"));
    assert!(paths.contains_key("/v1/map/views/{view_id}/layers/{category}"));
    assert!(paths.contains_key("/v1/session"));
    assert!(paths.contains_key("/unauthorized"));
}

#[tokio::test]
async fn unauthorized_landing_echoes_where_the_caller_came_from() {
    let upstreams = spawn_upstreams().await;
    let app = portal_app(&upstreams, open_rules());

    let response = app
        .clone()
        .oneshot(get("/unauthorized?from=%2Fportal%2Fusers%3Fpage%3D2"))
        .await
        .expect("landing");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["from"], "/portal/users?page=2");
    assert!(
        payload["message"]
            .as_str()
            .expect("message")
            .contains("not authorized")
    );
}
