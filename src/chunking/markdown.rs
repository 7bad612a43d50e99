//! Header-aware markdown splitting.

use crate::vector_store::HeaderLevel;

/// Deepest header level that opens a new section.
const MAX_HEADER_LEVEL: usize = 4;

/// A run of body text under one header path.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Header path, outermost first.
    pub headers: Vec<HeaderLevel>,
    /// Body text with the header lines stripped.
    pub body: String,
}

/// Parse a header line (`#` through `####` followed by a space).
fn parse_header(line: &str) -> Option<HeaderLevel> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > MAX_HEADER_LEVEL {
        return None;
    }

    let rest = &trimmed[level..];
    if !rest.starts_with(' ') && !rest.is_empty() {
        return None;
    }

    let title = rest.trim();
    if title.is_empty() {
        return None;
    }

    Some(HeaderLevel {
        level: level as u8,
        title: title.to_string(),
    })
}

fn flush(sections: &mut Vec<Section>, path: &[HeaderLevel], body: &mut Vec<&str>) {
    let text = body.join("\n").trim().to_string();
    if !text.is_empty() {
        sections.push(Section {
            headers: path.to_vec(),
            body: text,
        });
    }
    body.clear();
}

/// Split markdown into sections at `#`..`####` headers.
///
/// A header at level L closes every open header at level L or deeper.
/// Lines inside fenced code blocks are never treated as headers. Sections
/// without body text are dropped.
pub fn split_by_headers(markdown: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut path: Vec<HeaderLevel> = Vec::new();
    let mut body: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") || line.trim_start().starts_with("~~~") {
            in_fence = !in_fence;
            body.push(line);
            continue;
        }

        if !in_fence {
            if let Some(header) = parse_header(line) {
                flush(&mut sections, &path, &mut body);
                path.retain(|h| h.level < header.level);
                path.push(header);
                continue;
            }
        }

        body.push(line);
    }
    flush(&mut sections, &path, &mut body);

    sections
}
