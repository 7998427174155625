//! Static HTML documents
//!
//! A lightweight, regex-driven reading of an HTML string that approximates
//! what a browser's `innerText` reports: scripts and styles are dropped,
//! block boundaries become newlines and common entities are decoded.

use super::PageDocument;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static HIDDEN_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<noscript\b[^>]*>.*?</noscript\s*>|<template\b[^>]*>.*?</template\s*>")
        .unwrap()
});

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap());

static HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<head\b[^>]*>.*?</head\s*>").unwrap());

static BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>").unwrap());

static OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<([a-z][a-z0-9-]*)\b([^>]*)>").unwrap());

static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)([a-z][a-z0-9-]*)\b([^>]*)>").unwrap());

static ROLE_MAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)role\s*=\s*(?:"main"|'main'|main(?:\s|/|$))"#).unwrap()
});

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

static BLOCK_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:p|div|li|h[1-6]|tr|section|article|main|header|footer|nav|aside|ul|ol|table|blockquote|pre|figure|figcaption|form|dl|dt|dd)\b[^>]*>")
        .unwrap()
});

static CELL_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</t[dh]\s*>").unwrap());

static REMAINING_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());

static INLINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}\r\f]+").unwrap());

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// An HTML page parsed into the texts the extractor asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDocument {
    url: String,
    title: String,
    body_text: String,
    main_regions: Vec<String>,
    paragraphs: Vec<String>,
}

impl HtmlDocument {
    /// Parse `html` served from `url`
    pub fn parse(url: impl Into<String>, html: &str) -> Self {
        let cleaned = HIDDEN_BLOCKS.replace_all(html, "");

        let title = TITLE
            .captures(&cleaned)
            .and_then(|caps| caps.get(1))
            .map(|m| collapse_inline(&decode_entities(m.as_str())))
            .unwrap_or_default();

        let body = match BODY.captures(&cleaned).and_then(|caps| caps.get(1)) {
            Some(m) => m.as_str().to_string(),
            None => HEAD.replace_all(&cleaned, "").into_owned(),
        };

        let mut main_regions = Vec::new();
        let mut paragraphs = Vec::new();
        for caps in OPEN_TAG.captures_iter(&body) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let attrs = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            if attrs.trim_end().ends_with('/') {
                continue;
            }
            let tag = name.as_str().to_lowercase();
            let is_region = tag == "article" || tag == "main" || ROLE_MAIN.is_match(attrs);
            if !is_region && tag != "p" {
                continue;
            }

            let inner = if tag == "p" {
                paragraph_inner(&body, whole.end())
            } else {
                element_inner(&body, &tag, whole.end())
            };
            let text = html_to_text(inner);
            if is_region {
                main_regions.push(text.clone());
            }
            if tag == "p" {
                paragraphs.push(text);
            }
        }

        Self {
            url: url.into(),
            title,
            body_text: html_to_text(&body),
            main_regions,
            paragraphs,
        }
    }

    /// Build a document directly from plain text
    pub fn from_text(url: impl Into<String>, title: impl Into<String>, text: &str) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            body_text: text.to_string(),
            main_regions: Vec::new(),
            paragraphs: Vec::new(),
        }
    }
}

impl PageDocument for HtmlDocument {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn url(&self) -> String {
        self.url.clone()
    }

    fn body_text(&self) -> String {
        self.body_text.clone()
    }

    fn main_region_texts(&self) -> Vec<String> {
        self.main_regions.clone()
    }

    fn paragraph_texts(&self) -> Vec<String> {
        self.paragraphs.clone()
    }
}

/// Markup between an opening tag ending at `start` and its matching close
///
/// Nested elements with the same name are balanced; an unclosed element runs
/// to the end of the fragment.
fn element_inner<'a>(html: &'a str, tag: &str, start: usize) -> &'a str {
    let rest = &html[start..];
    let mut depth = 1usize;
    for caps in ANY_TAG.captures_iter(rest) {
        let name = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        if !name.eq_ignore_ascii_case(tag) {
            continue;
        }
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = caps
            .get(3)
            .is_some_and(|m| m.as_str().trim_end().ends_with('/'));
        if closing {
            depth -= 1;
            if depth == 0 {
                let end = caps.get(0).map(|m| m.start()).unwrap_or(rest.len());
                return &rest[..end];
            }
        } else if !self_closing {
            depth += 1;
        }
    }
    rest
}

/// Markup of a paragraph whose opening tag ends at `start`
///
/// `</p>` is optional: the paragraph also ends at the next block-level
/// opening or closing tag, including another `<p>`.
fn paragraph_inner(html: &str, start: usize) -> &str {
    let rest = &html[start..];
    match BLOCK_BOUNDARY.find(rest) {
        Some(boundary) => &rest[..boundary.start()],
        None => rest,
    }
}

/// Render an HTML fragment as `innerText`-like plain text
pub fn html_to_text(fragment: &str) -> String {
    let text = LINE_BREAK.replace_all(fragment, "\n");
    let text = BLOCK_BOUNDARY.replace_all(&text, "\n");
    let text = CELL_END.replace_all(&text, " ");
    let text = REMAINING_TAGS.replace_all(&text, "");
    let text = decode_entities(&text);

    let lines: Vec<String> = text.lines().map(collapse_inline).collect();
    let joined = lines.join("\n");
    BLANK_RUNS
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

fn collapse_inline(line: &str) -> String {
    INLINE_SPACE.replace_all(line, " ").trim().to_string()
}

/// Decode numeric and common named character references
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        _ => return None,
    };
    Some(c)
}
