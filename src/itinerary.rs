//! Hand-authored trip content
//!
//! The tables here are fixed at compile time and only ever read.

use std::fmt;

use serde::Serialize;

/// Number of days the plan covers
pub const TRIP_DAYS: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    Transport,
    Sightseeing,
    Lodging,
    Meal,
}

impl Category {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Category::Transport => "Transport",
            Category::Sightseeing => "Sightseeing",
            Category::Lodging => "Lodging",
            Category::Meal => "Meal",
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Category::Transport => "🚇",
            Category::Sightseeing => "📸",
            Category::Lodging => "🏨",
            Category::Meal => "🍜",
        }
    }

    /// CSS modifier for the card
    #[must_use]
    pub fn css_class(self) -> &'static str {
        match self {
            Category::Transport => "card--transport",
            Category::Sightseeing => "card--sightseeing",
            Category::Lodging => "card--lodging",
            Category::Meal => "card--meal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItineraryEntry {
    pub day: u8,
    pub title: &'static str,
    pub body: &'static str,
    pub category: Category,
    /// Name to search in map and ride-hailing apps
    pub place_query: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Spot {
    pub name: &'static str,
    pub blurb: &'static str,
    pub place_query: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TipTone {
    Tip,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransportTip {
    pub tone: TipTone,
    pub text: &'static str,
}

const fn entry(
    day: u8,
    category: Category,
    title: &'static str,
    body: &'static str,
    place_query: Option<&'static str>,
) -> ItineraryEntry {
    ItineraryEntry {
        day,
        title,
        body,
        category,
        place_query,
    }
}

pub static ITINERARY: &[ItineraryEntry] = &[
    entry(
        1,
        Category::Transport,
        "Arrive at Taoyuan Airport",
        "Take the Airport MRT express to Taipei Main Station (about 40 minutes). Buy an EasyCard at the arrivals hall.",
        Some("Taipei Main Station"),
    ),
    entry(
        1,
        Category::Lodging,
        "Check in near Ximending",
        "Drop the bags and walk the pedestrian streets of Ximending.",
        Some("Ximending"),
    ),
    entry(
        1,
        Category::Meal,
        "Dinner at Ningxia Night Market",
        "Oyster omelette, taro balls and braised pork rice.",
        Some("Ningxia Night Market"),
    ),
    entry(
        2,
        Category::Sightseeing,
        "National Palace Museum",
        "Allow three hours; the jadeite cabbage gallery gets crowded after 11:00.",
        Some("National Palace Museum"),
    ),
    entry(
        2,
        Category::Sightseeing,
        "Sunset at Taipei 101",
        "Observatory on the 89th floor; book the time slot online to skip the queue.",
        Some("Taipei 101"),
    ),
    entry(
        2,
        Category::Meal,
        "Xiaolongbao at Din Tai Fung",
        "The original Xinyi Road branch. Put your name down early.",
        Some("Din Tai Fung Xinyi"),
    ),
    entry(
        3,
        Category::Transport,
        "Bus 1062 to Jiufen",
        "Leaves from Zhongxiao Fuxing MRT exit 1, roughly 90 minutes.",
        Some("Zhongxiao Fuxing Station"),
    ),
    entry(
        3,
        Category::Sightseeing,
        "Shifen sky lanterns and Jiufen old street",
        "Write a wish on a lantern at Shifen, then watch the red lanterns light up in Jiufen at dusk.",
        Some("Jiufen Old Street"),
    ),
    entry(
        4,
        Category::Transport,
        "High-speed rail to Taichung",
        "About one hour from Taipei; continue by bus to Sun Moon Lake.",
        Some("Taichung HSR Station"),
    ),
    entry(
        4,
        Category::Sightseeing,
        "Sun Moon Lake",
        "Cycle the lakeside path and take the ropeway to the Formosan Aboriginal Culture Village.",
        Some("Sun Moon Lake"),
    ),
    entry(
        4,
        Category::Lodging,
        "Lakeside hotel at Shuishe",
        "Stay by the pier for the morning mist over the lake.",
        Some("Shuishe Pier"),
    ),
    entry(
        5,
        Category::Meal,
        "Bubble tea at Chun Shui Tang",
        "Taichung is where pearl milk tea began.",
        Some("Chun Shui Tang Taichung"),
    ),
    entry(
        5,
        Category::Transport,
        "Back to Taoyuan Airport",
        "High-speed rail to Taoyuan station, then the Airport MRT. Leave three hours before the flight.",
        Some("Taoyuan International Airport"),
    ),
];

pub static TOP_SPOTS: &[Spot] = &[
    Spot {
        name: "Taipei 101",
        blurb: "Taiwan's landmark skyscraper and observatory",
        place_query: "Taipei 101",
    },
    Spot {
        name: "Jiufen",
        blurb: "Hillside alleys lit by red lanterns",
        place_query: "Jiufen Old Street",
    },
    Spot {
        name: "Shilin Night Market",
        blurb: "The biggest food paradise in Taiwan",
        place_query: "Shilin Night Market",
    },
];

pub static TRANSPORT_TIPS: &[TransportTip] = &[
    TransportTip {
        tone: TipTone::Tip,
        text: "One EasyCard covers the MRT, buses and convenience stores.",
    },
    TransportTip {
        tone: TipTone::Warning,
        text: "No eating or drinking, not even water, inside MRT stations and trains. Fines apply.",
    },
];

/// Entries grouped by day, in day order. Days without entries are skipped.
#[must_use]
pub fn days(entries: &[ItineraryEntry]) -> Vec<(u8, Vec<&ItineraryEntry>)> {
    (1..=TRIP_DAYS)
        .map(|day| (day, entries.iter().filter(|e| e.day == day).collect::<Vec<_>>()))
        .filter(|(_, day_entries)| !day_entries.is_empty())
        .collect()
}
