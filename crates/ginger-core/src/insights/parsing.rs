//! Section parsing for model output
//!
//! Splits free-form model text into [`SectionKind`] buckets. Header shapes are
//! recognized in two tiers:
//!
//! - Labeled headers: a Markdown heading, a bold label (`**Activities**`), or
//!   a short line ending in `:`, whose text names a section.
//! - Numbered headers: unindented `1.` / `2)` lines. The text decides the
//!   section when it names one; otherwise positions 1, 2 and 3 map to
//!   improvements, conversation topics and activities. A numbered line is a
//!   header only when it is followed by content or directly continues a
//!   numbered header sequence, and never when it names the section already
//!   open. A plain numbered list stays content.
//!
//! When any labeled header is present, numbered lines are content. Text before
//! the first header, or in a reply with no headers at all, goes to
//! [`SectionKind::General`]. Nothing is dropped.

use regex::Regex;

use crate::error::Result;

use super::types::{SectionKind, Sections};

/// Longest line still treated as a `Label:` header
const MAX_LABEL_LEN: usize = 60;

/// Numbered headers longer than this keep their text as the first item
const MAX_HEADER_WORDS: usize = 5;

/// Label keywords, matched case-insensitively; the earliest match in a label wins
const SECTION_KEYWORDS: &[(&str, SectionKind)] = &[
    ("improv", SectionKind::Improvements),
    ("quality time", SectionKind::Improvements),
    ("conversation", SectionKind::ConversationTopics),
    ("topic", SectionKind::ConversationTopics),
    ("activit", SectionKind::Activities),
];

#[derive(Debug, Clone, PartialEq)]
enum Line {
    /// Header from a labeled shape
    Labeled {
        kind: SectionKind,
        rest: Option<String>,
    },
    /// Numbered header candidate
    Numbered {
        number: u32,
        kind: SectionKind,
        by_keyword: bool,
        label: String,
        rest: Option<String>,
        raw: String,
    },
    Content(String),
}

/// Compiled header patterns
pub struct SectionParser {
    markdown: Regex,
    bold: Regex,
    numbered: Regex,
    colon: Regex,
    marker: Regex,
}

impl SectionParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            markdown: Regex::new(r"^\s{0,3}#{1,6}\s+(.*?)\s*#*\s*$")?,
            bold: Regex::new(r"^\s*(?:\d+[.)]\s*)?\*\*(.+?)\*\*\s*:?\s*(.*)$")?,
            numbered: Regex::new(r"^(\d+)[.)]\s+(.*)$")?,
            colon: Regex::new(r"^\s*([^\s\-*•+][^:]*):\s*$")?,
            marker: Regex::new(r"^\s*(?:[-*•+]|\d+[.)])\s+")?,
        })
    }

    /// Split `text` into sections
    pub fn parse(&self, text: &str) -> Sections {
        let lines: Vec<Line> = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| self.classify(l.trim_end()))
            .collect();

        let has_labeled = lines.iter().any(|l| matches!(l, Line::Labeled { .. }));

        let mut sections = Sections::new();
        let mut current: Option<SectionKind> = None;
        let mut last_numbered: Option<u32> = None;

        for (i, line) in lines.iter().enumerate() {
            let header = match line {
                Line::Labeled { kind, rest } => Some((*kind, rest.clone())),
                Line::Numbered {
                    number,
                    kind,
                    by_keyword,
                    label,
                    rest,
                    ..
                } if !has_labeled && current != Some(*kind) => {
                    let before_content = matches!(lines.get(i + 1), Some(Line::Content(_)));
                    let continues =
                        *by_keyword && last_numbered == Some(number.saturating_sub(1));
                    if before_content || continues {
                        last_numbered = Some(*number);
                        // A long keyword line is a suggestion that doubles as a header
                        let rest = match rest {
                            None if label.split_whitespace().count() > MAX_HEADER_WORDS => {
                                Some(label.clone())
                            }
                            other => other.clone(),
                        };
                        Some((*kind, rest))
                    } else {
                        None
                    }
                }
                _ => None,
            };

            match header {
                Some((kind, rest)) => {
                    current = Some(kind);
                    let items = sections.entry(kind).or_default();
                    if let Some(rest) = rest {
                        let cleaned = self.clean(&rest);
                        if !cleaned.is_empty() {
                            items.push(cleaned);
                        }
                    }
                }
                None => {
                    let raw = match line {
                        Line::Content(text) => text.as_str(),
                        Line::Numbered { raw, .. } => raw.as_str(),
                        // Labeled lines are always headers
                        Line::Labeled { .. } => continue,
                    };
                    let cleaned = self.clean(raw);
                    if cleaned.is_empty() {
                        continue;
                    }
                    sections
                        .entry(current.unwrap_or(SectionKind::General))
                        .or_default()
                        .push(cleaned);
                }
            }
        }

        sections
    }

    fn classify(&self, line: &str) -> Line {
        if let Some(caps) = self.markdown.captures(line) {
            let label = caps.get(1).map_or("", |m| m.as_str());
            let (label, rest) = split_label(&self.strip_marker(label));
            return match keyword_section(&label) {
                Some(kind) => Line::Labeled { kind, rest },
                None => Line::Content(line.trim_start_matches(['#', ' ']).to_string()),
            };
        }

        if let Some(caps) = self.bold.captures(line) {
            let label = caps.get(1).map_or("", |m| m.as_str());
            let rest = caps.get(2).map(|m| m.as_str().trim().to_string());
            if let Some(kind) = keyword_section(label) {
                return Line::Labeled {
                    kind,
                    rest: rest.filter(|r| !r.is_empty()),
                };
            }
            return Line::Content(line.to_string());
        }

        if let Some(caps) = self.numbered.captures(line) {
            let number: u32 = caps
                .get(1)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            let text = caps.get(2).map_or("", |m| m.as_str());
            let (label, rest) = split_label(text);

            if let Some(kind) = keyword_section(&label) {
                return Line::Numbered {
                    number,
                    kind,
                    by_keyword: true,
                    label,
                    rest,
                    raw: line.to_string(),
                };
            }
            if let Some(kind) = SectionKind::from_position(number) {
                return Line::Numbered {
                    number,
                    kind,
                    by_keyword: false,
                    label,
                    rest,
                    raw: line.to_string(),
                };
            }
            return Line::Content(line.to_string());
        }

        if let Some(caps) = self.colon.captures(line) {
            let label = caps.get(1).map_or("", |m| m.as_str());
            if label.len() <= MAX_LABEL_LEN {
                if let Some(kind) = keyword_section(label) {
                    return Line::Labeled { kind, rest: None };
                }
            }
        }

        Line::Content(line.to_string())
    }

    fn strip_marker(&self, text: &str) -> String {
        self.marker.replace(text, "").to_string()
    }

    /// Content text without list markers or bold markup
    fn clean(&self, text: &str) -> String {
        self.strip_marker(text).replace("**", "").trim().to_string()
    }
}

/// `"Activities: go hiking"` → (`"Activities"`, `Some("go hiking")`)
fn split_label(text: &str) -> (String, Option<String>) {
    let text = text.replace("**", "");
    match text.split_once(':') {
        Some((label, rest)) => {
            let rest = rest.trim();
            (
                label.trim().to_string(),
                (!rest.is_empty()).then(|| rest.to_string()),
            )
        }
        None => (text.trim().to_string(), None),
    }
}

fn keyword_section(label: &str) -> Option<SectionKind> {
    let lower = label.to_lowercase();
    SECTION_KEYWORDS
        .iter()
        .filter_map(|(keyword, kind)| lower.find(keyword).map(|pos| (pos, *kind)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, kind)| kind)
}
