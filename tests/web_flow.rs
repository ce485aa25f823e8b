//! Page flow driven through the router without a listening socket

mod common;

use std::time::Duration;

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    routing::post,
};
use serde_json::{Value, json};
use taiwan_guide::{AppConfig, AppState, web};
use tower::ServiceExt;

use common::{closed_port, config_for, spawn_backend};

fn app(config: AppConfig) -> Router {
    web::router(AppState::new(config).unwrap())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, location, String::from_utf8(body.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn form(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

/// Open a fresh tab and return its session id
async fn open_tab(app: &Router) -> String {
    let (status, location, _) = send(app, get("/")).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let location = location.unwrap();
    location
        .strip_prefix("/?sid=")
        .expect("redirect carries a session id")
        .to_string()
}

#[tokio::test]
async fn first_visit_gets_a_session_and_the_full_page() {
    let app = app(config_for(&closed_port().await));
    let sid = open_tab(&app).await;
    assert_eq!(sid.len(), 32);

    let (status, _, html) = send(&app, get(&format!("/?sid={sid}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.starts_with("<!DOCTYPE html>"));
    for id in ["chat", "itinerary", "spots", "transport", "search", "weather", "places"] {
        assert!(html.contains(&format!("id=\"{id}\"")), "missing section {id}");
    }
    assert_eq!(html.matches("data-day=").count(), taiwan_guide::itinerary::ITINERARY.len());
}

#[tokio::test]
async fn unknown_session_starts_over() {
    let app = app(config_for(&closed_port().await));
    let (status, location, _) = send(&app, get("/?sid=not-a-session")).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let location = location.unwrap();
    assert!(location.starts_with("/?sid="));
    assert!(!location.contains("not-a-session"));

    let (status, location, _) = send(
        &app,
        form("/chat", &[("sid", "not-a-session"), ("question", "hi")]),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert!(location.unwrap().starts_with("/?sid="));
}

#[tokio::test]
async fn chat_round_trips_show_up_in_order() {
    let backend = Router::new().route(
        "/models/{call}",
        post(|Json(body): Json<Value>| async move {
            let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
            let question = prompt.rsplit("Question: ").next().unwrap_or_default();
            Json(json!({
                "candidates": [{"content": {"parts": [{"text": format!("Answer to {question}")}]}}]
            }))
        }),
    );
    let mut config = config_for(&spawn_backend(backend).await);
    config.completion.api_key = Some("test-key".to_string());
    let app = app(config);
    let sid = open_tab(&app).await;

    for question in ["Where is Jiufen?", "Is tea <sweet>?"] {
        let (status, location, _) =
            send(&app, form("/chat", &[("sid", &sid), ("question", question)])).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.unwrap(), format!("/?sid={sid}#chat"));
    }

    let (_, _, html) = send(&app, get(&format!("/?sid={sid}"))).await;
    assert_eq!(html.matches("data-role=\"you\"").count(), 2);
    assert_eq!(html.matches("data-role=\"guide\"").count(), 2);
    let first = html.find("Where is Jiufen?").unwrap();
    let answer = html.find("Answer to Where is Jiufen?").unwrap();
    let second = html.find("Is tea &lt;sweet&gt;?").unwrap();
    assert!(first < answer && answer < second);
    assert!(!html.contains("<sweet>"));
}

#[tokio::test]
async fn unconfigured_chat_shows_notice_without_bubbles() {
    let app = app(config_for(&closed_port().await));
    let sid = open_tab(&app).await;

    send(&app, form("/chat", &[("sid", &sid), ("question", "Hello?")])).await;
    let (_, _, html) = send(&app, get(&format!("/?sid={sid}"))).await;
    assert!(html.contains("GOOGLE_API_KEY"));
    assert!(!html.contains("data-role=\"you\""));
}

#[tokio::test]
async fn sessions_are_isolated_per_tab() {
    let app = app(config_for(&closed_port().await));
    let first = open_tab(&app).await;
    let second = open_tab(&app).await;
    assert_ne!(first, second);

    send(&app, form("/place", &[("sid", &first), ("place", "Kenting National Park")])).await;
    let (_, _, html) = send(&app, get(&format!("/?sid={second}"))).await;
    assert!(!html.contains("Kenting%20National%20Park"));
}

#[tokio::test]
async fn place_form_renders_both_deep_links() {
    let app = app(config_for(&closed_port().await));
    let sid = open_tab(&app).await;

    let (status, location, _) =
        send(&app, form("/place", &[("sid", &sid), ("place", "Kenting National Park")])).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.unwrap(), format!("/?sid={sid}#places"));

    let (_, _, html) = send(&app, get(&format!("/?sid={sid}"))).await;
    assert!(html.contains("https://www.google.com/maps/search/?api=1&amp;query=Kenting%20National%20Park"));
    assert!(html.contains("dropoff[formatted_address]=Kenting%20National%20Park"));

    send(&app, form("/place", &[("sid", &sid), ("place", "   ")])).await;
    let (_, _, html) = send(&app, get(&format!("/?sid={sid}"))).await;
    assert!(!html.contains("Kenting%20National%20Park"));
}

#[tokio::test]
async fn weather_form_without_key_shows_placeholder() {
    let app = app(config_for(&closed_port().await));
    let sid = open_tab(&app).await;

    send(&app, form("/weather", &[("sid", &sid), ("city", "Hualien")])).await;
    let (_, _, html) = send(&app, get(&format!("/?sid={sid}"))).await;
    assert!(html.contains("Weather information is currently unavailable."));
    assert!(html.contains("<option value=\"Hualien\" selected=\"selected\">"));
}

#[tokio::test]
async fn search_form_without_credentials_reports_inline() {
    let app = app(config_for(&closed_port().await));
    let sid = open_tab(&app).await;

    send(&app, form("/search", &[("sid", &sid), ("query", "beef noodles")])).await;
    let (status, _, html) = send(&app, get(&format!("/?sid={sid}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("NAVER_CLIENT_ID"));
    assert!(html.contains("value=\"beef noodles\""));
}

#[tokio::test]
async fn api_serves_itinerary_and_links() {
    let app = app(config_for(&closed_port().await));

    let (status, _, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _, body) = send(&app, get("/api/itinerary")).await;
    assert_eq!(status, StatusCode::OK);
    let entries: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(entries.len(), taiwan_guide::itinerary::ITINERARY.len());
    let days: Vec<u64> = entries.iter().map(|e| e["day"].as_u64().unwrap()).collect();
    assert!(days.windows(2).all(|w| w[0] <= w[1]));

    let (status, _, body) = send(&app, get("/api/links?place=Taipei%20101")).await;
    assert_eq!(status, StatusCode::OK);
    let links: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        links["map"],
        "https://www.google.com/maps/search/?api=1&query=Taipei%20101"
    );
}

#[tokio::test]
async fn api_weather_without_key_is_unavailable() {
    let app = app(config_for(&closed_port().await));
    let (status, _, body) = send(&app, get("/api/weather?city=Tainan")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let error: Value = serde_json::from_str(&body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("OPENWEATHER_API_KEY"));
}

fn slow_completion_backend(delay: Duration) -> Router {
    Router::new().route(
        "/models/{call}",
        post(move || async move {
            tokio::time::sleep(delay).await;
            Json(json!({"candidates": [{"content": {"parts": [{"text": "late"}]}}]}))
        }),
    )
}

#[tokio::test]
async fn slow_chat_backend_ends_in_inline_notice() {
    let mut config = config_for(&spawn_backend(slow_completion_backend(Duration::from_secs(3))).await);
    config.completion.api_key = Some("test-key".to_string());
    config.completion.timeout_seconds = 1;
    config.server.request_timeout_seconds = 2;
    config.validate().unwrap();
    let app = app(config);
    let sid = open_tab(&app).await;

    let (status, location, _) =
        send(&app, form("/chat", &[("sid", &sid), ("question", "Still there?")])).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.unwrap(), format!("/?sid={sid}#chat"));

    let (_, _, html) = send(&app, get(&format!("/?sid={sid}"))).await;
    assert!(html.contains("AI guide took too long to answer"));
    assert!(!html.contains("data-role=\"you\""));
}

#[tokio::test]
async fn interrupted_action_is_reported_on_next_render() {
    let mut config = config_for(&spawn_backend(slow_completion_backend(Duration::from_secs(5))).await);
    config.completion.api_key = Some("test-key".to_string());
    let app = app(config);
    let sid = open_tab(&app).await;

    // Dropping the request future mid-call mimics a client that went away.
    let cut_off = tokio::time::timeout(
        Duration::from_millis(300),
        send(&app, form("/chat", &[("sid", &sid), ("question", "Hello?")])),
    )
    .await;
    assert!(cut_off.is_err());

    let (_, _, html) = send(&app, get(&format!("/?sid={sid}"))).await;
    assert!(html.contains("Your last request was interrupted"));

    let (_, _, html) = send(&app, get(&format!("/?sid={sid}"))).await;
    assert!(!html.contains("Your last request was interrupted"));
}
