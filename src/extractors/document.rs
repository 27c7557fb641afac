// src/extractors/document.rs
use scraper::{ElementRef, Html};

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Parsed HTML page, read-only for the duration of one extraction.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html_content: &str) -> Self {
        Self {
            html: Html::parse_document(html_content),
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// First element (document order) whose `id` attribute equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<ElementRef<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().id() == Some(id))
    }

    /// First element named `tag` that starts after `anchor` in document order.
    /// Descendants of `anchor` count, as they open after it.
    pub fn next_element_named<'a>(&'a self, anchor: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
        self.html
            .root_element()
            .descendants()
            .skip_while(|node| node.id() != anchor.id())
            .skip(1)
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().name() == tag)
    }
}

/// Nearest `h1`..`h6` strictly above `element`.
pub fn enclosing_heading(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| HEADING_TAGS.contains(&ancestor.value().name()))
}

/// Text content of an element with runs of whitespace (including NBSP) collapsed.
pub fn clean_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
