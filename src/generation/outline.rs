use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::plan::PART_COUNT;

lazy_static! {
    static ref PART_MARKER: Regex = Regex::new(r"\n\d+\.\s+").expect("valid part marker regex");
    static ref QUOTED_TITLE: Regex =
        Regex::new(r#""([^"\n]+)"|«([^»\n]+)»"#).expect("valid title regex");
}

const NOT_FOUND_MARKERS: [&str; 4] = ["не существует", "не найдена", "does not exist", "not found"];

/// A book split into its seven parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookOutline {
    /// Exact title as given by the LLM.
    pub title: String,
    /// Exactly seven part descriptions.
    pub parts: Vec<String>,
}

/// Result of asking the LLM for a book outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineLookup {
    /// The book exists.
    Found(BookOutline),
    /// The LLM says there is no such book.
    NotFound,
    /// The reply could not be split into seven parts.
    Malformed,
}

/// Parses the outline reply. The requested title is used when the reply does
/// not quote one.
pub fn parse_outline(reply: &str, requested_title: &str) -> OutlineLookup {
    let lowered = reply.to_lowercase();
    if NOT_FOUND_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return OutlineLookup::NotFound;
    }

    let text = format!("\n{}", reply.replace("\r\n", "\n"));
    let markers: Vec<_> = PART_MARKER.find_iter(&text).take(PART_COUNT).collect();
    if markers.len() < PART_COUNT {
        return OutlineLookup::Malformed;
    }

    let parts: Vec<String> = markers
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let end = markers.get(i + 1).map_or(text.len(), |next| next.start());
            text[m.end()..end].trim().to_string()
        })
        .collect();
    if parts.iter().any(String::is_empty) {
        return OutlineLookup::Malformed;
    }

    OutlineLookup::Found(BookOutline { title: extract_title(reply, requested_title), parts })
}

fn extract_title(reply: &str, requested_title: &str) -> String {
    QUOTED_TITLE
        .captures(reply)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| requested_title.trim().to_string())
}
