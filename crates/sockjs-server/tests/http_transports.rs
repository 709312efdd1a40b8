#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use sockjs_server::{app_state::AppState, config, router};

const CONFIG: &str = r#"
version: 1
endpoints:
  - prefix: "/echo"
    service: "echo"
  - prefix: "/close"
    service: "close"
  - prefix: "/cookie_needed_echo"
    service: "echo"
    options:
      cookie_needed: true
  - prefix: "/polling_only"
    service: "echo"
    options:
      transports: ["xhr"]
"#;

fn app() -> Router {
    let cfg = config::load_from_str(CONFIG).unwrap();
    router::build_router(AppState::new(cfg).unwrap())
}

fn request(method: Method, uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body))
        .unwrap()
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn welcome_and_info() {
    let app = app();

    let resp = app.clone().oneshot(request(Method::GET, "/echo", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "Welcome to SockJS!\n");

    let resp = app.clone().oneshot(request(Method::GET, "/echo/info", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()[header::CACHE_CONTROL].to_str().unwrap().contains("no-store"));
    let info: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(info["websocket"], true);
    assert_eq!(info["cookie_needed"], false);
    assert_eq!(info["origins"], serde_json::json!(["*:*"]));
    assert!(info["entropy"].is_u64());

    let resp = app.oneshot(request(Method::OPTIONS, "/echo/info", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_MAX_AGE], "31536000");
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn iframe_is_cacheable_by_etag() {
    let app = app();
    let resp = app.clone().oneshot(request(Method::GET, "/echo/iframe.html", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let etag = resp.headers()[header::ETAG].clone();
    assert!(body_string(resp).await.contains("SockJS.bootstrap_iframe()"));

    let req = Request::builder()
        .uri("/echo/iframe-1.6.1.html")
        .header(header::IF_NONE_MATCH, etag)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

    let resp = app.oneshot(request(Method::GET, "/echo/favicon.ico", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn xhr_round_trip_through_echo() {
    let app = app();

    let resp = app.clone().oneshot(request(Method::POST, "/echo/000/abc/xhr", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "application/javascript; charset=UTF-8"
    );
    assert_eq!(body_string(resp).await, "o\n");

    let resp = app
        .clone()
        .oneshot(request(Method::POST, "/echo/000/abc/xhr_send", r#"["hi","there"]"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.oneshot(request(Method::POST, "/echo/000/abc/xhr", "")).await.unwrap();
    let body = body_string(resp).await;
    assert!(body == "a[\"hi\",\"there\"]\n" || body == "a[\"hi\"]\n", "body={body}");
}

#[tokio::test]
async fn send_errors() {
    let app = app();

    let resp = app
        .clone()
        .oneshot(request(Method::POST, "/echo/000/nope/xhr_send", r#"["x"]"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.clone().oneshot(request(Method::POST, "/echo/000/s1/xhr", "")).await.unwrap();
    assert_eq!(body_string(resp).await, "o\n");

    for (payload, expected) in [
        ("", "Payload expected.\n"),
        ("[\"x\"", "Broken JSON encoding.\n"),
        ("[1,2]", "Broken JSON encoding.\n"),
    ] {
        let resp = app
            .clone()
            .oneshot(request(Method::POST, "/echo/000/s1/xhr_send", payload))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(resp).await, expected);
    }

    let resp = app.oneshot(request(Method::GET, "/metrics", "")).await.unwrap();
    let metrics = body_string(resp).await;
    assert!(metrics.contains("sockjs_payload_errors_total{endpoint=\"/echo\"} 3"), "{metrics}");
    assert!(metrics.contains("sockjs_sessions_opened_total{endpoint=\"/echo\"} 1"), "{metrics}");
}

#[tokio::test]
async fn dotted_segments_are_not_found() {
    let app = app();
    for uri in ["/echo/a.b/abc/xhr", "/echo/000/a.b/xhr"] {
        let resp = app.clone().oneshot(request(Method::POST, uri, "")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "uri={uri}");
    }
}

#[tokio::test]
async fn second_connection_gets_2010() {
    let app = app();

    let resp = app.clone().oneshot(request(Method::POST, "/echo/000/race/xhr", "")).await.unwrap();
    assert_eq!(body_string(resp).await, "o\n");

    // parked poll: nothing to deliver, so it stays attached
    let held = app.clone().oneshot(request(Method::POST, "/echo/000/race/xhr", "")).await.unwrap();
    assert_eq!(held.status(), StatusCode::OK);

    let resp = app
        .oneshot(request(Method::POST, "/echo/000/race/xhr_streaming", ""))
        .await
        .unwrap();
    let body = body_string(resp).await;
    let mut expected = "h".repeat(2048);
    expected.push('\n');
    expected.push_str("c[2010,\"Another connection still open\"]\n");
    assert_eq!(body, expected);

    drop(held);
}

#[tokio::test]
async fn eventsource_streams_frames() {
    let app = app();
    let resp = app
        .oneshot(request(Method::GET, "/echo/000/ev/eventsource", ""))
        .await
        .unwrap();
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream; charset=UTF-8");

    let mut body = resp.into_body();
    let prelude = body.frame().await.unwrap().unwrap().into_data().unwrap();
    assert_eq!(&prelude[..], b"\r\n");
    let open = body.frame().await.unwrap().unwrap().into_data().unwrap();
    assert_eq!(&open[..], b"data: o\r\n\r\n");
}

#[tokio::test]
async fn htmlfile_and_jsonp_need_callback() {
    let app = app();

    let resp = app.clone().oneshot(request(Method::GET, "/echo/000/h1/htmlfile", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(resp).await, "\"callback\" parameter required\n");

    let resp = app
        .clone()
        .oneshot(request(Method::GET, "/echo/000/j1/jsonp?c=%3Cscript%3E", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let resp = app.clone().oneshot(request(Method::GET, "/echo/000/j1/jsonp?c=cb", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "cb(\"o\");\r\n");

    let req = Request::builder()
        .method(Method::POST)
        .uri("/echo/000/j1/jsonp_send")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("d=%5B%22x%22%5D"))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "ok");

    let resp = app.oneshot(request(Method::GET, "/echo/000/h2/htmlfile?c=cb", "")).await.unwrap();
    let mut body = resp.into_body();
    let prelude = body.frame().await.unwrap().unwrap().into_data().unwrap();
    assert!(prelude.len() > 1024);
    assert!(std::str::from_utf8(&prelude).unwrap().contains("var c = parent.cb;"));
    let open = body.frame().await.unwrap().unwrap().into_data().unwrap();
    assert_eq!(&open[..], b"<script>\np(\"o\");\n</script>\r\n");
}

#[tokio::test]
async fn close_service_replays_close_frame() {
    let app = app();
    let resp = app.clone().oneshot(request(Method::POST, "/close/000/c1/xhr", "")).await.unwrap();
    assert_eq!(body_string(resp).await, "o\n");

    for _ in 0..2 {
        let resp = app.clone().oneshot(request(Method::POST, "/close/000/c1/xhr", "")).await.unwrap();
        assert_eq!(body_string(resp).await, "c[3000,\"Go away!\"]\n");
    }
}

#[tokio::test]
async fn cookie_needed_sets_jsessionid() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(request(Method::POST, "/cookie_needed_echo/000/k1/xhr", ""))
        .await
        .unwrap();
    assert_eq!(resp.headers()[header::SET_COOKIE], "JSESSIONID=dummy; Path=/");

    let req = Request::builder()
        .method(Method::POST)
        .uri("/cookie_needed_echo/000/k2/xhr")
        .header(header::COOKIE, "JSESSIONID=abcdef")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.headers()[header::SET_COOKIE], "JSESSIONID=abcdef; Path=/");
}

#[tokio::test]
async fn session_routes_answer_cors() {
    let app = app();

    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/cookie_needed_echo/000/c1/xhr")
        .header(header::ORIGIN, "https://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-custom")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let h = resp.headers();
    assert_eq!(h[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://example.com");
    assert_eq!(h[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(h[header::ACCESS_CONTROL_ALLOW_HEADERS], "x-custom");
    assert_eq!(h[header::ACCESS_CONTROL_ALLOW_METHODS], "OPTIONS, POST");
    assert_eq!(h[header::ACCESS_CONTROL_MAX_AGE], "31536000");
    assert_eq!(h[header::SET_COOKIE], "JSESSIONID=dummy; Path=/");

    let req = Request::builder()
        .method(Method::POST)
        .uri("/echo/000/c2/xhr")
        .header(header::ORIGIN, "https://example.com")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://example.com");
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(body_string(resp).await, "o\n");
}

#[tokio::test]
async fn disabled_transports_are_not_found() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(request(Method::GET, "/polling_only/000/e1/eventsource", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.oneshot(request(Method::POST, "/polling_only/000/e1/xhr", "")).await.unwrap();
    assert_eq!(body_string(resp).await, "o\n");
}

#[test]
fn unknown_service_fails_startup() {
    let cfg = config::load_from_str(
        "version: 1\nendpoints:\n  - prefix: \"/x\"\n    service: \"nope\"\n",
    )
    .unwrap();
    let err = AppState::new(cfg).err().expect("must fail");
    assert_eq!(err.class().as_str(), "CONFIG");
}
