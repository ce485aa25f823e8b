//! Structured view nodes and their HTML serialization
//!
//! Pages are assembled from [`Node`] values instead of formatted strings, so
//! every piece of text and every attribute is escaped in one place.

use std::fmt::{self, Write};

pub mod page;

pub use page::{PageContext, render_page};

use crate::session::Session;

/// Void elements never get a closing tag
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "link", "meta"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: &'static str,
    pub attrs: Vec<(&'static str, String)>,
    pub children: Vec<Node>,
}

impl Element {
    #[must_use]
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    #[must_use]
    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr("class", value)
    }

    #[must_use]
    pub fn id(self, value: impl Into<String>) -> Self {
        self.attr("id", value)
    }

    #[must_use]
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    #[must_use]
    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }

    #[must_use]
    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attr_value("class")
            .is_some_and(|value| value.split_whitespace().any(|c| c == class))
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

/// Shorthand for `Element::new`
#[must_use]
pub fn el(tag: &'static str) -> Element {
    Element::new(tag)
}

/// Content card with a title, body and optional actions
#[must_use]
pub fn card(class: &str, title: &str, body: &str) -> Element {
    el("article")
        .class(format!("card {class}").trim_end().to_string())
        .child(el("h4").class("card__title").text(title))
        .child(el("p").class("card__body").text(body))
}

/// Link opening in a new tab, styled as a button
#[must_use]
pub fn link_button(label: &str, href: &str) -> Element {
    el("a")
        .class("button")
        .attr("href", href)
        .attr("target", "_blank")
        .attr("rel", "noopener noreferrer")
        .text(label)
}

#[must_use]
pub fn submit_button(label: &str) -> Element {
    el("button").attr("type", "submit").class("button").text(label)
}

#[must_use]
pub fn hidden_input(name: &str, value: &str) -> Element {
    el("input")
        .attr("type", "hidden")
        .attr("name", name.to_string())
        .attr("value", value.to_string())
}

impl Node {
    /// Depth-first walk over every element
    pub fn elements(&self) -> Vec<&Element> {
        let mut found = Vec::new();
        collect_elements(self, &mut found);
        found
    }

    /// Concatenated text of this subtree
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) -> fmt::Result {
        match self {
            Node::Text(text) => out.write_str(&escape_html(text)),
            Node::Element(element) => {
                write!(out, "<{}", element.tag)?;
                for (name, value) in &element.attrs {
                    write!(out, " {name}=\"{}\"", escape_html(value))?;
                }
                out.write_char('>')?;
                if VOID_TAGS.contains(&element.tag) {
                    return Ok(());
                }
                for child in &element.children {
                    child.write_html(out)?;
                }
                write!(out, "</{}>", element.tag)
            }
        }
    }
}

/// Serialize the full page for one tab, doctype included
#[must_use]
pub fn render_document(ctx: &PageContext<'_>, session: &Session) -> String {
    format!("<!DOCTYPE html>{}", render_page(ctx, session).to_html())
}

fn collect_elements<'a>(node: &'a Node, found: &mut Vec<&'a Element>) {
    if let Node::Element(element) = node {
        found.push(element);
        for child in &element.children {
            collect_elements(child, found);
        }
    }
}

fn collect_text(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(text),
        Node::Element(element) => {
            for child in &element.children {
                collect_text(child, out);
            }
        }
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
