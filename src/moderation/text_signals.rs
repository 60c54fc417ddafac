//! Lexical and link feature extraction
//!
//! Turns the raw (markup-bearing) text of a piece of content into the numeric
//! features the detection rules score against. Extraction is pure and total:
//! any input produces a well-formed `TextSignals`, worst case all zeroes.

use once_cell::sync::Lazy;
use phf::phf_set;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use url::Url;

/// HTML-ish tags, replaced with spaces so "</p><p>" still separates words
static TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

/// Character entities like &amp; and &#39;
static ENTITY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#?[a-zA-Z0-9]{1,12};").expect("Invalid entity regex"));

static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Tolerant URL pattern; also catches scheme-less www. links
static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s"'<>]+"#).expect("Invalid URL regex")
});

/// Words of four or more characters, hyphens allowed
static TOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w-]{4,}").expect("Invalid token regex"));

/// Link shortener and redirect hosts that hide the real destination
static SUSPICIOUS_HOSTS: phf::Set<&'static str> = phf_set! {
    "bit.ly",
    "tinyurl.com",
    "t.co",
    "t.me",
    "wa.me",
    "goo.gl",
    "is.gd",
    "cutt.ly",
    "rb.gy",
    "ow.ly",
};

/// Numeric features of one piece of content text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextSignals {
    /// Characters in the normalized text
    pub text_length: u32,
    pub token_count: u32,
    /// Distinct tokens / total tokens, rounded to 4 decimals. 0.0 for no tokens.
    pub unique_token_ratio: f64,
    pub url_count: u32,
    /// Links whose host is a known shortener or redirector
    pub suspicious_url_count: u32,
    /// Total links minus distinct links (case-insensitive)
    pub duplicate_url_count: u32,
    /// Occurrences of the single most repeated token
    pub repeated_token_count: u32,
    /// Non-empty lines minus distinct lines, after per-line normalization
    pub duplicate_line_count: u32,
}

/// Extract all text features in one pass over the content.
pub fn extract_text_signals(raw: &str) -> TextSignals {
    let stripped = strip_markup(raw);

    // Line features come from the newline-preserving form
    let mut line_count: u32 = 0;
    let mut distinct_lines = HashSet::new();
    for line in stripped.lines() {
        let line = WHITESPACE_REGEX.replace_all(line, " ");
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        line_count += 1;
        distinct_lines.insert(line.to_lowercase());
    }
    let duplicate_line_count = line_count - distinct_lines.len() as u32;

    // Everything else works on whitespace-collapsed text
    let normalized = WHITESPACE_REGEX.replace_all(&stripped, " ");
    let normalized = normalized.trim();

    let mut url_count: u32 = 0;
    let mut suspicious_url_count: u32 = 0;
    let mut distinct_urls = HashSet::new();
    for found in URL_REGEX.find_iter(normalized) {
        url_count += 1;
        distinct_urls.insert(found.as_str().to_lowercase());
        if let Some(host) = link_host(found.as_str()) {
            if SUSPICIOUS_HOSTS.contains(host.as_str()) {
                suspicious_url_count += 1;
            }
        }
    }
    let duplicate_url_count = url_count - distinct_urls.len() as u32;

    let lowered = normalized.to_lowercase();
    let mut token_counts: HashMap<&str, u32> = HashMap::new();
    for token in TOKEN_REGEX.find_iter(&lowered) {
        *token_counts.entry(token.as_str()).or_insert(0) += 1;
    }
    let token_count: u32 = token_counts.values().sum();
    let repeated_token_count = token_counts.values().copied().max().unwrap_or(0);
    let unique_token_ratio = if token_count == 0 {
        0.0
    } else {
        round4(token_counts.len() as f64 / token_count as f64)
    };

    TextSignals {
        text_length: normalized.chars().count() as u32,
        token_count,
        unique_token_ratio,
        url_count,
        suspicious_url_count,
        duplicate_url_count,
        repeated_token_count,
        duplicate_line_count,
    }
}

fn strip_markup(raw: &str) -> String {
    let stripped = TAG_REGEX.replace_all(raw, " ");
    ENTITY_REGEX.replace_all(&stripped, " ").into_owned()
}

/// Host of a matched link, lowercased and with any "www." prefix dropped.
/// None for text the url crate cannot parse; such links still count as links.
fn link_host(link: &str) -> Option<String> {
    let lowered = link.to_ascii_lowercase();
    let parsed = if lowered.starts_with("www.") {
        Url::parse(&format!("http://{}", link)).ok()?
    } else {
        Url::parse(link).ok()?
    };
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    Some(host.to_ascii_lowercase())
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
