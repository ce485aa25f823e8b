//! HTTP front end
//!
//! Every user action is a form post. The handler locks the tab's session for
//! the whole action, so one tab never has two external calls in flight, then
//! redirects back to the page, which is rebuilt from session state.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Form, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::clients::{City, Clients};
use crate::config::AppConfig;
use crate::session::{SearchPanel, SessionStore};
use crate::view::{PageContext, render_document};

/// Shared, read-only application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub clients: Clients,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let clients = Clients::new(&config)?;
        let sessions = Arc::new(SessionStore::new(
            config.session.idle_timeout(),
            config.session.max_sessions,
        ));
        Ok(Self {
            config: Arc::new(config),
            clients,
            sessions,
        })
    }
}

pub fn router(state: AppState) -> Router {
    let server = &state.config.server;
    let static_files = ServeDir::new(&server.static_dir);

    Router::new()
        .route("/", get(show_page))
        .route("/chat", post(submit_chat))
        .route("/search", post(submit_search))
        .route("/weather", post(submit_weather))
        .route("/place", post(submit_place))
        .nest("/api", api::router())
        .nest_service("/static", static_files)
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            server.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    sid: String,
    #[serde(default)]
    question: String,
}

#[derive(Debug, Deserialize)]
struct SearchForm {
    sid: String,
    #[serde(default)]
    query: String,
}

#[derive(Debug, Deserialize)]
struct WeatherForm {
    sid: String,
    #[serde(default)]
    city: String,
}

#[derive(Debug, Deserialize)]
struct PlaceForm {
    sid: String,
    #[serde(default)]
    place: String,
}

const INTERRUPTED: &str = "Your last request was interrupted before it finished. Please try again.";

fn back_to(sid: &str, section: &str) -> Response {
    Redirect::to(&format!("/?sid={sid}#{section}")).into_response()
}

fn new_tab(state: &AppState) -> Response {
    let sid = state.sessions.create();
    Redirect::to(&format!("/?sid={sid}")).into_response()
}

async fn show_page(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Response {
    let Some(sid) = query.sid else {
        return new_tab(&state);
    };
    let Some(session) = state.sessions.get(&sid) else {
        tracing::debug!("Unknown or expired session, starting a new one");
        return new_tab(&state);
    };

    let mut session = session.lock().await;
    if session.recover_interrupted() {
        tracing::warn!("Previous action was cut off before it finished");
        session.page_notice = Some(INTERRUPTED.to_string());
    }
    let ctx = PageContext::new(&sid, state.clients.completion.model());
    let html = render_document(&ctx, &session);
    session.page_notice = None;
    session.mark_rendered();
    Html(html).into_response()
}

async fn submit_chat(State(state): State<AppState>, Form(form): Form<ChatForm>) -> Response {
    let Some(session) = state.sessions.get(&form.sid) else {
        return new_tab(&state);
    };
    let question = form.question.trim();
    if question.is_empty() {
        return back_to(&form.sid, "chat");
    }

    let mut session = session.lock().await;
    session.begin_request();
    session.chat_notice = None;
    let result = state
        .clients
        .completion
        .converse(&mut session.history, question)
        .await;
    if let Err(err) = result {
        tracing::warn!(kind = ?err.kind(), "Chat request failed: {err}");
        session.chat_notice = Some(err.user_message());
    }
    session.finish_request();

    back_to(&form.sid, "chat")
}

async fn submit_search(State(state): State<AppState>, Form(form): Form<SearchForm>) -> Response {
    let Some(session) = state.sessions.get(&form.sid) else {
        return new_tab(&state);
    };
    let query = form.query.trim();
    if query.is_empty() {
        return back_to(&form.sid, "search");
    }

    let mut session = session.lock().await;
    session.begin_request();
    let search = &state.clients.search;
    let outcome = search.search(query, search.default_limit()).await;
    session.search = Some(SearchPanel {
        query: query.to_string(),
        outcome,
    });
    session.finish_request();

    back_to(&form.sid, "search")
}

async fn submit_weather(State(state): State<AppState>, Form(form): Form<WeatherForm>) -> Response {
    let Some(session) = state.sessions.get(&form.sid) else {
        return new_tab(&state);
    };
    let city = City::from_name(&form.city);

    let mut session = session.lock().await;
    session.begin_request();
    session.city = Some(city);
    session.weather = Some(state.clients.weather.current_weather(city.query_name()).await);
    session.finish_request();

    back_to(&form.sid, "weather")
}

async fn submit_place(State(state): State<AppState>, Form(form): Form<PlaceForm>) -> Response {
    let Some(session) = state.sessions.get(&form.sid) else {
        return new_tab(&state);
    };
    let place = form.place.trim();

    let mut session = session.lock().await;
    session.place = (!place.is_empty()).then(|| place.to_string());

    back_to(&form.sid, "places")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[cfg(feature = "tls")]
async fn serve_tls(addr: SocketAddr, app: Router, cert: &str, key: &str) -> Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let tls = RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| format!("Failed to load TLS certificate {cert} / key {key}"))?;

    let handle = axum_server::Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(std::time::Duration::from_secs(10)));
    });

    tracing::info!("Web server running at https://{addr}");
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .context("TLS server failed")
}

/// Serve the guide until interrupted
pub async fn run(config: AppConfig) -> Result<()> {
    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind_address()))?;
    let tls_paths = config
        .server
        .tls_cert_path
        .clone()
        .zip(config.server.tls_key_path.clone());

    let state = AppState::new(config)?;
    let clients = &state.clients;
    tracing::info!(
        chat = clients.completion.is_configured(),
        search = clients.search.is_configured(),
        weather = clients.weather.is_configured(),
        "External services"
    );
    let app = router(state);

    #[cfg(feature = "tls")]
    {
        if let Some((cert, key)) = &tls_paths {
            return serve_tls(addr, app, cert, key).await;
        }
    }
    #[cfg(not(feature = "tls"))]
    {
        if tls_paths.is_some() {
            tracing::warn!("TLS paths configured but the `tls` feature is disabled; serving plain HTTP");
        }
    }

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}
