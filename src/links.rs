//! Deep links into map and ride-hailing apps
//!
//! Both builders are pure: the free text is percent-encoded and placed into a
//! fixed template. Any input, including an empty string, yields a valid URL;
//! callers decide whether an empty destination is worth showing.

use std::sync::LazyLock;

use serde::Serialize;
use url::Url;

static MAP_SEARCH: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://www.google.com/maps/search/").unwrap());

static RIDE_PICKUP: LazyLock<Url> = LazyLock::new(|| Url::parse("https://m.uber.com/ul/").unwrap());

fn with_query(base: &Url, query: String) -> Url {
    let mut url = base.clone();
    url.set_query(Some(&query));
    url
}

/// Map search for a place name
#[must_use]
pub fn build_map_link(place_name: &str) -> Url {
    with_query(
        &MAP_SEARCH,
        format!("api=1&query={}", urlencoding::encode(place_name)),
    )
}

/// Ride-hail request from the current position to `destination`
#[must_use]
pub fn build_ride_hail_link(destination: &str) -> Url {
    with_query(
        &RIDE_PICKUP,
        format!(
            "action=setPickup&pickup=my_location&dropoff[formatted_address]={}",
            urlencoding::encode(destination)
        ),
    )
}

/// Both links for one place, as served by the JSON API
#[derive(Debug, Clone, Serialize)]
pub struct PlaceLinks {
    pub place: String,
    pub map: String,
    pub ride: String,
}

impl PlaceLinks {
    #[must_use]
    pub fn new(place: &str) -> Self {
        Self {
            place: place.to_string(),
            map: build_map_link(place).to_string(),
            ride: build_ride_hail_link(place).to_string(),
        }
    }
}
