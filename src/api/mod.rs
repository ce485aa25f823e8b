use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    clients::{City, WeatherReading},
    error::ErrorKind,
    itinerary::{self, ItineraryEntry},
    links::PlaceLinks,
    web::AppState,
};

#[derive(Serialize)]
pub struct ApiEntry {
    pub day: u8,
    pub title: String,
    pub body: String,
    pub category: String,
    pub place: Option<PlaceLinks>,
}

impl From<&ItineraryEntry> for ApiEntry {
    fn from(entry: &ItineraryEntry) -> Self {
        Self {
            day: entry.day,
            title: entry.title.to_string(),
            body: entry.body.to_string(),
            category: entry.category.label().to_string(),
            place: entry.place_query.map(PlaceLinks::new),
        }
    }
}

#[derive(Serialize)]
pub struct ApiWeather {
    pub city: City,
    pub reading: Option<WeatherReading>,
    pub display: String,
}

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Deserialize)]
pub struct LinksQuery {
    #[serde(default)]
    pub place: String,
}

#[derive(Deserialize)]
pub struct WeatherQuery {
    #[serde(default)]
    pub city: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/itinerary", get(get_itinerary))
        .route("/links", get(get_links))
        .route("/weather", get(get_weather))
}

async fn health() -> &'static str {
    "ok"
}

async fn get_itinerary() -> Json<Vec<ApiEntry>> {
    Json(itinerary::ITINERARY.iter().map(ApiEntry::from).collect())
}

async fn get_links(Query(query): Query<LinksQuery>) -> Json<PlaceLinks> {
    Json(PlaceLinks::new(query.place.trim()))
}

async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<ApiWeather>, (StatusCode, Json<ApiError>)> {
    let city = City::from_name(&query.city);
    match state.clients.weather.reading(city).await {
        Ok(reading) => Ok(Json(ApiWeather {
            city,
            display: reading.display(city),
            reading: Some(reading),
        })),
        Err(err) => {
            let status = match err.kind() {
                ErrorKind::Unconfigured => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            };
            Err((
                status,
                Json(ApiError {
                    error: err.user_message(),
                }),
            ))
        }
    }
}
