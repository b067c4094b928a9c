//! Keyword section extraction and section combining.
//!
//! Text is split into paragraphs on blank lines (a blank line is empty or
//! whitespace-only). Paragraphs mentioning any keyword are kept and then
//! packed greedily into sections of at most [`MAX_SECTION_CHARS`]
//! characters, so the model sees more context per call.

use tracing::info;

/// Soft cap on a combined section, in characters.
pub const MAX_SECTION_CHARS: usize = 4096;

/// Split text into trimmed, non-empty paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    let mut paragraphs = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        if line.trim().is_empty() {
            if let Some(s) = start.take() {
                paragraphs.push(text[s..end].trim());
            }
        } else {
            if start.is_none() {
                start = Some(line_start);
            }
            end = offset;
        }
    }

    if let Some(s) = start {
        paragraphs.push(text[s..end].trim());
    }

    paragraphs
}

/// Paragraphs of `text` that contain at least one keyword, compared
/// case-insensitively. Order is preserved; empty keywords never match.
pub fn extract_relevant_sections(text: &str, keywords: &[String]) -> Vec<String> {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    let sections: Vec<String> = split_paragraphs(text)
        .into_iter()
        .filter(|paragraph| {
            let lower = paragraph.to_lowercase();
            keywords.iter().any(|k| lower.contains(k.as_str()))
        })
        .map(str::to_string)
        .collect();

    info!("Extracted {} relevant sections", sections.len());
    sections
}

/// Greedily join consecutive sections with a single space while the result
/// stays within `max_chars`. A section that alone exceeds the cap is emitted
/// unchanged as its own combined section.
pub fn combine_sections(sections: &[String], max_chars: usize) -> Vec<String> {
    let mut combined = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for section in sections {
        let section = section.trim();
        if section.is_empty() {
            continue;
        }
        let len = section.chars().count();

        if current.is_empty() {
            current.push_str(section);
            current_chars = len;
        } else if current_chars + 1 + len <= max_chars {
            current.push(' ');
            current.push_str(section);
            current_chars += 1 + len;
        } else {
            combined.push(std::mem::take(&mut current));
            current.push_str(section);
            current_chars = len;
        }
    }

    if !current.is_empty() {
        combined.push(current);
    }

    combined
}
