//! PushNotifier against a local capture endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;

use pulse_core::config::PushConfig;
use pulse_server::PushNotifier;

type Captured = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn spawn_endpoint(reply: StatusCode) -> (String, Captured) {
    let captured: Captured = Arc::default();
    let app = Router::new()
        .route(
            "/push",
            get(
                move |State(seen): State<Captured>, Query(params): Query<HashMap<String, String>>| async move {
                    seen.lock().push(params);
                    reply
                },
            ),
        )
        .with_state(captured.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/push"), captured)
}

fn notifier(url: Option<String>) -> PushNotifier {
    PushNotifier::from_config(&PushConfig {
        url,
        ..PushConfig::default()
    })
    .expect("notifier")
}

#[tokio::test]
async fn sends_title_and_text_as_query_parameters() {
    let (url, captured) = spawn_endpoint(StatusCode::OK).await;
    let notifier = notifier(Some(url));

    assert!(notifier.send(Some("Bank"), "OTP 482913 & more").await);
    assert!(notifier.send(None, "plain").await);

    let seen = captured.lock().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0]["pushTitle"], "Bank");
    assert_eq!(seen[0]["pushText"], "OTP 482913 & more");
    assert_eq!(seen[1]["pushTitle"], "Notification");
}

#[tokio::test]
async fn endpoint_error_is_reported_not_raised() {
    let (url, captured) = spawn_endpoint(StatusCode::INTERNAL_SERVER_ERROR).await;
    let notifier = notifier(Some(url));

    assert!(!notifier.send(None, "hello").await);
    assert_eq!(captured.lock().len(), 1);
}

#[tokio::test]
async fn missing_url_disables_delivery() {
    let disabled = notifier(None);
    assert!(!disabled.is_enabled());
    assert!(!disabled.send(None, "dropped").await);

    assert!(!notifier(Some("   ".into())).is_enabled());
}

#[tokio::test]
async fn unreachable_endpoint_is_reported_not_raised() {
    // Bind then drop to get a port with nothing listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    assert!(!notifier(Some(format!("http://{addr}/push"))).send(None, "x").await);
}
