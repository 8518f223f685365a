use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use std::sync::OnceLock;

/// Default upper bound on characters sent to the backend in one request
pub const DEFAULT_MAX_SEGMENT_LENGTH: usize = 250;

/// A bounded slice of the input text; one segment is one TTS call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSegment {
    pub index: usize,
    pub content: String,
}

fn sentence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^.!?]*[.!?]+").expect("sentence pattern is valid"))
}

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\S+").expect("word pattern is valid"))
}

/// Split text into segments of at most `max_length` characters.
///
/// Sentences (runs ending in `.`, `!` or `?`) are packed greedily. A sentence that is
/// longer than the limit on its own is broken into word groups; a single word longer
/// than the limit is kept whole rather than cut. Segments are trimmed and never empty.
///
/// Lengths are counted in `char`s, not bytes.
pub fn segment(text: &str, max_length: usize) -> Vec<TextSegment> {
    let max_length = max_length.max(1);
    let mut spans: Vec<Range<usize>> = Vec::new();
    let mut current: Option<Range<usize>> = None;

    for unit in sentence_units(text) {
        if text[unit.clone()].trim().is_empty() {
            continue;
        }

        if trimmed_len(text, &unit) > max_length {
            if let Some(span) = current.take() {
                spans.push(span);
            }
            spans.extend(word_groups(text, unit, max_length));
            continue;
        }

        current = match current.take() {
            Some(span) if trimmed_len(text, &(span.start..unit.end)) <= max_length => {
                Some(span.start..unit.end)
            }
            Some(span) => {
                spans.push(span);
                Some(unit)
            }
            None => Some(unit),
        };
    }

    if let Some(span) = current {
        spans.push(span);
    }

    let segments: Vec<TextSegment> = spans
        .into_iter()
        .map(|span| text[span].trim())
        .filter(|content| !content.is_empty())
        .enumerate()
        .map(|(index, content)| TextSegment {
            index,
            content: content.to_string(),
        })
        .collect();

    tracing::debug!(
        text_length = text.len(),
        max_length = max_length,
        segment_count = segments.len(),
        "Text segmented"
    );

    segments
}

/// Contiguous byte ranges covering `text`, each ending at a sentence terminator
/// except possibly the last.
fn sentence_units(text: &str) -> Vec<Range<usize>> {
    let mut units = Vec::new();
    let mut last_end = 0;

    for mat in sentence_pattern().find_iter(text) {
        units.push(last_end..mat.end());
        last_end = mat.end();
    }

    if last_end < text.len() {
        units.push(last_end..text.len());
    }

    units
}

fn word_groups(text: &str, unit: Range<usize>, max_length: usize) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut current: Option<Range<usize>> = None;

    for mat in word_pattern().find_iter(&text[unit.clone()]) {
        let word = unit.start + mat.start()..unit.start + mat.end();

        current = match current.take() {
            Some(group) if trimmed_len(text, &(group.start..word.end)) <= max_length => {
                Some(group.start..word.end)
            }
            Some(group) => {
                groups.push(group);
                Some(word)
            }
            None => Some(word),
        };
    }

    if let Some(group) = current {
        groups.push(group);
    }

    groups
}

fn trimmed_len(text: &str, span: &Range<usize>) -> usize {
    text[span.clone()].trim().chars().count()
}
