//! Clients for the three external services
//!
//! Each client issues exactly one HTTP request per call and converts every
//! failure into a [`GuideError`](crate::error::GuideError) or a placeholder
//! string. None of them retries.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::config::AppConfig;

pub mod completion;
pub mod search;
pub mod weather;

pub use completion::CompletionClient;
pub use search::{SearchClient, SearchOutcome, SearchResult, strip_tags};
pub use weather::{City, WeatherClient, WeatherReading};

const USER_AGENT: &str = concat!("TaiwanGuide/", env!("CARGO_PKG_VERSION"));

/// Upper bound for any single call; clients set tighter per-request timeouts.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the HTTP client shared by all service clients
pub fn http_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .with_context(|| "Failed to create HTTP client")
}

/// The three service clients, built once at startup
#[derive(Clone)]
pub struct Clients {
    pub completion: CompletionClient,
    pub search: SearchClient,
    pub weather: WeatherClient,
}

impl Clients {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let http = http_client()?;
        Ok(Self {
            completion: CompletionClient::new(http.clone(), &config.completion),
            search: SearchClient::new(http.clone(), &config.search),
            weather: WeatherClient::new(http, &config.weather),
        })
    }
}
