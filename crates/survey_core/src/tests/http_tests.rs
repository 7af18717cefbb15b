use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use serde::Deserialize;
use tokio::net::TcpListener;

use super::*;

#[derive(Debug, Deserialize, PartialEq)]
struct Greeting {
    message: String,
}

async fn spawn_server(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn resolves_with_the_parsed_body_on_success() {
    let base = spawn_server(
        Router::new().route("/greeting.json", get(|| async { r#"{"message":"hi"}"# })),
    )
    .await;

    let greeting: Greeting = HttpClient::new()
        .get(&format!("{base}/greeting.json"))
        .await
        .expect("fetch");

    assert_eq!(
        greeting,
        Greeting {
            message: "hi".to_string()
        }
    );
}

#[tokio::test]
async fn non_success_status_is_a_transport_error() {
    let base = spawn_server(
        Router::new().route("/missing.json", get(|| async { StatusCode::NOT_FOUND })),
    )
    .await;

    let err = HttpClient::new()
        .get::<Greeting>(&format!("{base}/missing.json"))
        .await
        .expect_err("must fail");

    match err {
        FetchError::Transport { status, .. } => {
            assert_eq!(status, Some(reqwest::StatusCode::NOT_FOUND));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn invalid_body_is_a_parse_error_carrying_the_raw_body() {
    let base = spawn_server(
        Router::new().route("/broken.json", get(|| async { "not json at all" })),
    )
    .await;

    let err = HttpClient::new()
        .get::<Greeting>(&format!("{base}/broken.json"))
        .await
        .expect_err("must fail");

    match err {
        FetchError::Parse { body, .. } => assert_eq!(body, "not json at all"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn slow_responses_time_out() {
    let base = spawn_server(Router::new().route(
        "/slow.json",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "{}"
        }),
    ))
    .await;

    let err = HttpClient::new()
        .get_with_timeout::<Greeting>(&format!("{base}/slow.json"), Duration::from_millis(100))
        .await
        .expect_err("must time out");

    assert!(matches!(err, FetchError::Timeout { .. }));
}
