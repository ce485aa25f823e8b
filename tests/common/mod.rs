//! Local stand-ins for the external backends

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use taiwan_guide::AppConfig;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral port and return its base URL
pub async fn spawn_backend(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing is listening on
pub async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Counts requests reaching a mock backend
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn record(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Config with every backend pointed at `base_url` and no credentials
pub fn config_for(base_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.completion.base_url = base_url.to_string();
    config.search.base_url = base_url.to_string();
    config.weather.base_url = base_url.to_string();
    config
}
