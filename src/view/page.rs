//! Full page composition
//!
//! The whole page is rebuilt from session state on every request. Given the
//! same content tables and the same session, the output is identical.

use crate::clients::City;
use crate::itinerary::{self, ItineraryEntry, Spot, TipTone, TransportTip};
use crate::links::{build_map_link, build_ride_hail_link};
use crate::session::{ChatMessage, ChatRole, SearchPanel, Session};

use super::{Element, Node, card, el, hidden_input, link_button, submit_button};

/// Read-only inputs shared by every render
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub session_id: &'a str,
    pub itinerary: &'a [ItineraryEntry],
    pub spots: &'a [Spot],
    pub tips: &'a [TransportTip],
    /// Model name shown under the title
    pub model: &'a str,
}

impl<'a> PageContext<'a> {
    /// Context over the built-in trip tables
    #[must_use]
    pub fn new(session_id: &'a str, model: &'a str) -> Self {
        Self {
            session_id,
            itinerary: itinerary::ITINERARY,
            spots: itinerary::TOP_SPOTS,
            tips: itinerary::TRANSPORT_TIPS,
            model,
        }
    }
}

/// Build the `<html>` tree for one tab
#[must_use]
pub fn render_page(ctx: &PageContext<'_>, session: &Session) -> Node {
    let html = el("html")
        .attr("lang", "en")
        .child(
            el("head")
                .child(el("meta").attr("charset", "utf-8"))
                .child(
                    el("meta")
                        .attr("name", "viewport")
                        .attr("content", "width=device-width, initial-scale=1"),
                )
                .child(el("title").text("Taiwan Travel Guide 🇹🇼"))
                .child(
                    el("link")
                        .attr("rel", "stylesheet")
                        .attr("href", "/static/style.css"),
                ),
        )
        .child(
            el("body").child(
                el("main")
                    .class("page")
                    .child(header(ctx, session))
                    .child(tabs())
                    .child(chat_section(ctx, session))
                    .child(itinerary_section(ctx))
                    .child(spots_section(ctx))
                    .child(transport_section(ctx))
                    .child(search_section(ctx, session))
                    .child(weather_section(ctx, session))
                    .child(place_section(ctx, session)),
            ),
        );

    html.into()
}

fn header(ctx: &PageContext<'_>, session: &Session) -> Element {
    let header = el("header")
        .class("page__header")
        .child(el("h1").text("🇹🇼 AI Taiwan Travel Guide"))
        .child(
            el("p")
                .class("caption")
                .text(format!("🚀 Powered by {}", ctx.model)),
        )
        .child(el("p").text(
            "Ask things like \"Plan four days for me\" or \"When does the bus to Jiufen leave?\"",
        ));
    match &session.page_notice {
        Some(notice) => header.child(
            el("p")
                .class("notice notice--warning")
                .attr("role", "status")
                .text(notice.as_str()),
        ),
        None => header,
    }
}

const SECTIONS: [(&str, &str); 7] = [
    ("chat", "🤖 AI Guide"),
    ("itinerary", "🗓️ Itinerary"),
    ("spots", "📸 Top Spots"),
    ("transport", "🚇 Transport"),
    ("search", "🔎 Blog Search"),
    ("weather", "☀️ Weather"),
    ("places", "📍 Places"),
];

fn tabs() -> Element {
    el("nav").class("tabs").children(
        SECTIONS
            .iter()
            .map(|(id, label)| el("a").class("tabs__tab").attr("href", format!("#{id}")).text(*label)),
    )
}

fn section(id: &'static str, heading: &str) -> Element {
    el("section")
        .id(id)
        .class("section")
        .child(el("h2").text(heading))
}

fn action_form(ctx: &PageContext<'_>, action: &str, section_class: &str) -> Element {
    el("form")
        .attr("method", "post")
        .attr("action", action.to_string())
        .class(section_class.to_string())
        .child(hidden_input("sid", ctx.session_id))
}

fn chat_bubble(message: &ChatMessage) -> Element {
    let (class, who) = match message.role {
        ChatRole::User => ("bubble bubble--user", "You"),
        ChatRole::Assistant => ("bubble bubble--assistant", "Guide"),
    };
    el("div")
        .class(class)
        .attr("data-role", who.to_lowercase())
        .child(el("span").class("bubble__who").text(who))
        .child(el("p").class("bubble__text").text(message.text.as_str()))
}

fn chat_section(ctx: &PageContext<'_>, session: &Session) -> Element {
    let mut section = section("chat", "Ask anything!").child(
        el("div")
            .class("chat")
            .children(session.history.messages().iter().map(chat_bubble)),
    );

    if let Some(notice) = &session.chat_notice {
        section = section.child(el("p").class("notice notice--error").text(notice.as_str()));
    }

    section.child(
        action_form(ctx, "/chat", "chat__form")
            .child(
                el("input")
                    .attr("type", "text")
                    .attr("name", "question")
                    .attr("placeholder", "Type your question...")
                    .attr("autocomplete", "off"),
            )
            .child(submit_button("Send")),
    )
}

fn place_actions(place: &str) -> Element {
    el("div")
        .class("card__actions")
        .child(link_button("🗺️ Map", build_map_link(place).as_str()))
        .child(link_button("🚕 Ride", build_ride_hail_link(place).as_str()))
}

fn itinerary_card(entry: &ItineraryEntry) -> Element {
    let title = format!("{} {}", entry.category.icon(), entry.title);
    let card = card(entry.category.css_class(), &title, entry.body)
        .attr("data-day", entry.day.to_string())
        .child(el("span").class("card__tag").text(entry.category.label()));
    match entry.place_query {
        Some(place) => card.child(place_actions(place)),
        None => card,
    }
}

fn itinerary_section(ctx: &PageContext<'_>) -> Element {
    section("itinerary", "Day-by-day plan").children(itinerary::days(ctx.itinerary).into_iter().map(
        |(day, entries)| {
            el("div")
                .class("day")
                .child(el("h3").text(format!("Day {day}")))
                .children(entries.into_iter().map(itinerary_card))
        },
    ))
}

fn spots_section(ctx: &PageContext<'_>) -> Element {
    section("spots", "Taiwan hot places").child(
        el("div").class("columns").children(ctx.spots.iter().map(|spot| {
            card("card--spot", spot.name, spot.blurb).child(place_actions(spot.place_query))
        })),
    )
}

fn transport_section(ctx: &PageContext<'_>) -> Element {
    section("transport", "Getting around").children(ctx.tips.iter().map(|tip| {
        let class = match tip.tone {
            TipTone::Tip => "notice notice--tip",
            TipTone::Warning => "notice notice--warning",
        };
        el("p").class(class).text(tip.text)
    }))
}

fn search_results(panel: &SearchPanel) -> Element {
    let list = el("div").class("search__results");
    if let Some(error) = &panel.outcome.error {
        return list.child(
            el("p")
                .class("notice notice--error")
                .text(error.user_message()),
        );
    }
    if panel.outcome.results.is_empty() {
        return list.child(
            el("p")
                .class("notice")
                .text(format!("No results for \"{}\".", panel.query)),
        );
    }
    list.child(el("ul").children(panel.outcome.results.iter().map(|result| {
        let date = result
            .published_at
            .map_or_else(|| "date unknown".to_string(), |d| d.format("%Y-%m-%d").to_string());
        el("li")
            .class("search__result")
            .child(link_button(&result.title, result.link.as_str()))
            .child(el("span").class("search__date").text(date))
    })))
}

fn search_section(ctx: &PageContext<'_>, session: &Session) -> Element {
    let query = session
        .search
        .as_ref()
        .map(|panel| panel.query.clone())
        .unwrap_or_default();
    let section = section("search", "Latest blog posts").child(
        action_form(ctx, "/search", "search__form")
            .child(
                el("input")
                    .attr("type", "text")
                    .attr("name", "query")
                    .attr("placeholder", "e.g. night market, milk tea")
                    .attr("value", query),
            )
            .child(submit_button("Search")),
    );
    match &session.search {
        Some(panel) => section.child(search_results(panel)),
        None => section,
    }
}

fn weather_section(ctx: &PageContext<'_>, session: &Session) -> Element {
    let selected = session.city.unwrap_or_default();
    let select = el("select").attr("name", "city").children(City::ALL.iter().map(|city| {
        let option = el("option")
            .attr("value", city.query_name())
            .text(format!("{} ({})", city.query_name(), city.korean_name()));
        if *city == selected {
            option.attr("selected", "selected")
        } else {
            option
        }
    }));

    let section = section("weather", "Weather now").child(
        action_form(ctx, "/weather", "weather__form")
            .child(select)
            .child(submit_button("Check")),
    );
    match &session.weather {
        Some(display) => section.child(el("p").class("weather__reading").text(display.as_str())),
        None => section,
    }
}

fn place_section(ctx: &PageContext<'_>, session: &Session) -> Element {
    let place = session.place.clone().unwrap_or_default();
    let section = section("places", "Go somewhere").child(
        action_form(ctx, "/place", "place__form")
            .child(
                el("input")
                    .attr("type", "text")
                    .attr("name", "place")
                    .attr("placeholder", "Place name, e.g. Sun Moon Lake")
                    .attr("value", place.clone()),
            )
            .child(submit_button("Get links")),
    );
    if place.trim().is_empty() {
        section
    } else {
        section.child(place_actions(&place))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{SearchOutcome, SearchResult};
    use crate::view::render_document;
    use crate::error::{GuideError, Service};
    use url::Url;

    fn cards_in(node: &Node, section_id: &str) -> Vec<String> {
        node.elements()
            .into_iter()
            .find(|e| e.attr_value("id") == Some(section_id))
            .map(|section| {
                Node::Element(section.clone())
                    .elements()
                    .into_iter()
                    .filter(|e| e.has_class("card"))
                    .map(|e| e.attr_value("data-day").unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_one_card_per_entry_in_day_order() {
        let ctx = PageContext::new("sid", "gemini-2.5-flash");
        let page = render_page(&ctx, &Session::default());
        let days = cards_in(&page, "itinerary");
        assert_eq!(days.len(), itinerary::ITINERARY.len());
        let numbers: Vec<u8> = days.iter().map(|d| d.parse().unwrap()).collect();
        assert!(numbers.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(numbers.first(), Some(&1));
        assert_eq!(numbers.last(), Some(&5));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let ctx = PageContext::new("sid", "gemini-2.5-flash");
        let mut session = Session::default();
        session.history.record_exchange("Best dumplings?", "Din Tai Fung.");
        session.place = Some("Sun Moon Lake".to_string());

        let first = render_page(&ctx, &session);
        let second = render_page(&ctx, &session);
        assert_eq!(first, second);
        assert_eq!(
            render_document(&ctx, &session),
            render_document(&ctx, &session)
        );
    }

    #[test]
    fn test_chat_bubbles_follow_history() {
        let ctx = PageContext::new("sid", "m");
        let mut session = Session::default();
        session.history.record_exchange("q1", "a1");
        session.history.record_exchange("q2", "a2");
        let page = render_page(&ctx, &session);
        let roles: Vec<&str> = page
            .elements()
            .into_iter()
            .filter_map(|e| e.attr_value("data-role"))
            .collect();
        assert_eq!(roles, vec!["you", "guide", "you", "guide"]);
    }

    #[test]
    fn test_empty_search_renders_no_results() {
        let ctx = PageContext::new("sid", "m");
        let mut session = Session::default();
        session.search = Some(SearchPanel {
            query: "rare thing".to_string(),
            outcome: SearchOutcome::default(),
        });
        let html = render_document(&ctx, &session);
        assert!(html.contains("No results for &quot;rare thing&quot;."));
    }

    #[test]
    fn test_search_error_and_results() {
        let ctx = PageContext::new("sid", "m");
        let mut session = Session::default();
        session.search = Some(SearchPanel {
            query: "tea".to_string(),
            outcome: SearchOutcome {
                results: Vec::new(),
                error: Some(GuideError::connection(Service::Search, "refused")),
            },
        });
        let html = render_document(&ctx, &session);
        assert!(html.contains("Unable to reach the blog search"));

        session.search = Some(SearchPanel {
            query: "tea".to_string(),
            outcome: SearchOutcome {
                results: vec![SearchResult {
                    title: "Tea & cake".to_string(),
                    link: Url::parse("https://blog.naver.com/x/1").unwrap(),
                    published_at: None,
                }],
                error: None,
            },
        });
        let html = render_document(&ctx, &session);
        assert!(html.contains("Tea &amp; cake"));
        assert!(html.contains("https://blog.naver.com/x/1"));
        assert!(html.contains("date unknown"));
    }

    #[test]
    fn test_place_links_only_for_non_empty_place() {
        let ctx = PageContext::new("sid", "m");
        let mut session = Session::default();
        session.place = Some("   ".to_string());
        let html = render_document(&ctx, &session);
        assert!(!html.contains("query=%20%20%20"));

        session.place = Some("Sun Moon Lake".to_string());
        let html = render_document(&ctx, &session);
        assert!(html.contains("query=Sun%20Moon%20Lake"));
    }

    #[test]
    fn test_document_starts_with_doctype() {
        let ctx = PageContext::new("abc", "m");
        let html = render_document(&ctx, &Session::default());
        assert!(html.starts_with("<!DOCTYPE html><html lang=\"en\">"));
        assert!(html.contains("name=\"sid\" value=\"abc\""));
    }

    #[test]
    fn test_selected_city_is_marked() {
        let ctx = PageContext::new("sid", "m");
        let mut session = Session::default();
        session.city = Some(City::Kaohsiung);
        session.weather = Some("Kaohsiung: clear sky, 30.0°C".to_string());
        let page = render_page(&ctx, &session);
        let selected: Vec<&str> = page
            .elements()
            .into_iter()
            .filter(|e| e.tag == "option" && e.attr_value("selected").is_some())
            .filter_map(|e| e.attr_value("value"))
            .collect();
        assert_eq!(selected, vec!["Kaohsiung"]);
        assert!(page.to_html().contains("30.0°C"));
    }

    #[test]
    fn test_page_notice_renders_in_header() {
        let ctx = PageContext::new("sid", "m");
        let mut session = Session::default();
        assert!(!render_document(&ctx, &session).contains("role=\"status\""));

        session.page_notice = Some("Your last request was interrupted.".to_string());
        let page = render_page(&ctx, &session);
        let notice = page
            .elements()
            .into_iter()
            .find(|e| e.attr_value("role") == Some("status"))
            .map(|e| Node::Element(e.clone()).text_content());
        assert_eq!(notice.as_deref(), Some("Your last request was interrupted."));
    }
}
