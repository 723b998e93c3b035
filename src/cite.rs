//! Citation rewriting for backend answers
//!
//! Answers arrive as plain text with inline markers such as `[3]` or `[1, 2]`
//! that refer to entries of a per-answer citation table. Rewriting resolves each
//! marker to the cited page numbers, then splits the text into paragraphs with
//! `**strong**` spans picked out.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, Regex};

const CITATION_ID_KEYS: [&str; 3] = ["citation_id", "citationId", "id"];

/// One entry of an answer's citation table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub citation_id: u64,
    pub page: u32,
}

impl Citation {
    /// Read a table entry, taking the id from the first key present
    pub fn from_value(entry: &Value) -> Option<Self> {
        let citation_id = CITATION_ID_KEYS
            .iter()
            .find_map(|key| entry.get(*key).filter(|v| !v.is_null()))?
            .as_u64()?;
        let page = u32::try_from(entry.get("page")?.as_u64()?).ok()?;
        Some(Self { citation_id, page })
    }
}

impl<'de> Deserialize<'de> for Citation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entry = Value::deserialize(deserializer)?;
        Citation::from_value(&entry)
            .ok_or_else(|| de::Error::custom("citation needs an integer id and page"))
    }
}

/// A run of text inside a paragraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Span {
    Plain(String),
    Strong(String),
}

/// One renderable paragraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub spans: Vec<Span>,
}

impl TextBlock {
    fn parse(paragraph: &str) -> Self {
        let mut spans = Vec::new();
        let mut last = 0;

        for caps in strong_pattern().captures_iter(paragraph) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                spans.push(Span::Plain(paragraph[last..whole.start()].to_string()));
            }
            spans.push(Span::Strong(inner.as_str().to_string()));
            last = whole.end();
        }

        if last < paragraph.len() {
            spans.push(Span::Plain(paragraph[last..].to_string()));
        }

        Self { spans }
    }

    /// Text content with emphasis markup removed
    pub fn plain_text(&self) -> String {
        self.spans
            .iter()
            .map(|span| match span {
                Span::Plain(text) | Span::Strong(text) => text.as_str(),
            })
            .collect()
    }
}

impl fmt::Display for TextBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for span in &self.spans {
            match span {
                Span::Plain(text) => f.write_str(text)?,
                Span::Strong(text) => write!(f, "**{}**", text)?,
            }
        }
        Ok(())
    }
}

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[\s*([0-9]+(?:\s*,\s*[0-9]+)*)\s*\]").expect("citation marker pattern is valid")
    })
}

fn strong_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("strong pattern is valid"))
}

fn paragraph_break() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\n[ \t\r]*\n").expect("paragraph pattern is valid"))
}

/// Replace every citation marker with its page annotation
pub fn resolve_markers(answer: &str, citations: &[Citation]) -> String {
    // Later entries overwrite earlier ones for a repeated id
    let pages: HashMap<u64, u32> = citations
        .iter()
        .map(|c| (c.citation_id, c.page))
        .collect();

    marker_pattern()
        .replace_all(answer, |caps: &Captures| {
            let mut resolved: Vec<u32> = Vec::new();
            for id in caps[1].split(',') {
                let Ok(id) = id.trim().parse::<u64>() else {
                    continue;
                };
                if let Some(page) = pages.get(&id) {
                    if !resolved.contains(page) {
                        resolved.push(*page);
                    }
                }
            }
            page_annotation(&resolved)
        })
        .into_owned()
}

fn page_annotation(pages: &[u32]) -> String {
    match pages {
        [] => String::new(),
        [page] => format!(" [Page {}]", page),
        _ => {
            let list: Vec<String> = pages.iter().map(u32::to_string).collect();
            format!(" [Pages {}]", list.join(", "))
        }
    }
}

/// Split text on blank lines into non-empty blocks
pub fn split_paragraphs(text: &str) -> Vec<TextBlock> {
    paragraph_break()
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(TextBlock::parse)
        .collect()
}

/// Rewrite a backend answer into display blocks
pub fn rewrite(answer: &str, citations: &[Citation]) -> Vec<TextBlock> {
    split_paragraphs(&resolve_markers(answer, citations))
}
