//! Taiwan travel guide
//!
//! A day-by-day trip page with three thin integrations: an AI guide chat,
//! a blog search proxy and a weather lookup, plus deep links into map and
//! ride-hailing apps.

pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod itinerary;
pub mod links;
pub mod session;
pub mod telemetry;
pub mod view;
pub mod web;

// Re-export core types for public API
pub use clients::{
    City, Clients, CompletionClient, SearchClient, SearchOutcome, SearchResult, WeatherClient,
    WeatherReading,
};
pub use config::AppConfig;
pub use error::{ErrorKind, GuideError, Service};
pub use itinerary::{Category, ItineraryEntry};
pub use links::{build_map_link, build_ride_hail_link};
pub use session::{ChatHistory, ChatMessage, ChatRole, Session, SessionStore};
pub use web::AppState;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
