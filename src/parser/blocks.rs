use std::sync::LazyLock;

use regex::Regex;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*$").unwrap());
static SINGLE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[([^\]]*)\]\(([^)]+)\)$").unwrap());
static INLINE_LINKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)\s]+)\)").unwrap());
static CLOSE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\]\(([^)]+)\)(.*)$").unwrap());
static LIST_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:[-*+•]|\d{1,2}[.)])\s+(.+)$").unwrap());
static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(id|owner|applicant|published|updated|visit website|website|uploaded by|source|technology readiness level|readiness level|trl|intellectual property|localized name|name \(cn\)|patent status|description|details|benefits)(\s*:\s*|\s+|$)(.*)$",
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Link { text: String, url: String },
    /// `Key: value`, `Key [value]` or a bare label line. `key` is canonical lower case.
    Labeled { key: String, value: String },
    ListItem(String),
    Text(String),
    Empty,
}

/// Labels that accept a free value without a `:` separator.
const FREE_VALUE_KEYS: &[&str] = &["uploaded by", "published", "updated", "owner", "applicant"];

pub fn classify_lines(text: &str) -> Vec<Block> {
    if text.trim().is_empty() {
        return vec![Block::Empty];
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let cleaned = lines[i].replace("**", "").replace("__", "");
        let line = cleaned.trim();

        if line.is_empty() {
            blocks.push(Block::Empty);
            i += 1;
            continue;
        }

        // ── Multi-line link: "[" on its own line ──
        if line == "[" {
            i = consume_multiline_link(&lines, i, &mut blocks);
            continue;
        }

        // ── Stray ](url) continuation ──
        if line.starts_with("](") {
            if let Some(caps) = CLOSE_LINK_RE.captures(line) {
                blocks.push(link("", &caps[1]));
                if caps[2].trim() == "[" {
                    i = consume_multiline_link(&lines, i + 1, &mut blocks);
                    continue;
                }
            }
            i += 1;
            continue;
        }

        if let Some(caps) = HEADING_RE.captures(line) {
            blocks.push(Block::Heading {
                level: caps[1].len() as u8,
                text: caps[2].trim().to_string(),
            });
            i += 1;
            continue;
        }

        if let Some(caps) = SINGLE_LINK_RE.captures(line) {
            blocks.push(link(&caps[1], &caps[2]));
            i += 1;
            continue;
        }

        if let Some(block) = classify_label(line) {
            blocks.push(block);
            // Inline links after a label still count as links (e.g. "Website: [x](url)").
            push_inline_links(line, &mut blocks);
            i += 1;
            continue;
        }

        if let Some(caps) = LIST_ITEM_RE.captures(line) {
            blocks.push(Block::ListItem(strip_link_syntax(caps[1].trim())));
            push_inline_links(line, &mut blocks);
            i += 1;
            continue;
        }

        // ── Plain text, possibly carrying inline links ──
        if line.contains("](") && line.contains('[') {
            let text = strip_link_syntax(line);
            if !text.trim().is_empty() {
                blocks.push(Block::Text(text.trim().to_string()));
            }
            push_inline_links(line, &mut blocks);
            i += 1;
            continue;
        }

        blocks.push(Block::Text(line.to_string()));
        i += 1;
    }

    blocks
}

fn classify_label(line: &str) -> Option<Block> {
    let caps = LABEL_RE.captures(line)?;
    let key = canonical_key(&caps[1]);
    let sep = &caps[2];
    let value = caps[3].trim();

    // Without a colon the value has to look like a label value, otherwise
    // this is prose that merely starts with a label word ("Source of ...").
    if !sep.contains(':') && !value.is_empty() {
        let structured = value.starts_with('[')
            || value.starts_with(|c: char| c.is_ascii_digit())
            || value.starts_with("http")
            || value.starts_with("www.");
        if !structured && !FREE_VALUE_KEYS.contains(&key.as_str()) {
            return None;
        }
        if key == "owner" || key == "applicant" {
            if !value.starts_with('[') {
                return None;
            }
        }
    }

    // Prose beginning with "Published in ..." or "Updated turbines ..." is not a date label.
    if (key == "published" || key == "updated") && !sep.contains(':') && !value.is_empty()
        && !value.starts_with(|c: char| c.is_ascii_digit())
        && !value.to_lowercase().starts_with("on ")
    {
        return None;
    }

    Some(Block::Labeled {
        key,
        value: value.to_string(),
    })
}

fn canonical_key(raw: &str) -> String {
    let lower = raw.to_lowercase();
    match lower.as_str() {
        "technology readiness level" | "readiness level" | "trl" => "readiness level".to_string(),
        "name (cn)" => "localized name".to_string(),
        "details" => "description".to_string(),
        _ => lower,
    }
}

/// Consume a multi-line link starting at `start` (a "[" line or the line after a trailing "[").
/// Returns the next line index to process.
fn consume_multiline_link(lines: &[&str], start: usize, blocks: &mut Vec<Block>) -> usize {
    let mut text_parts = Vec::new();
    let mut j = start;

    if j < lines.len() && lines[j].trim() == "[" {
        j += 1;
    }

    while j < lines.len() {
        let l = lines[j].trim();
        if let Some(url_part) = l.strip_prefix("](") {
            let (url, has_trailing_open) = match url_part.find(')') {
                Some(end) => {
                    let rest = url_part[end + 1..].trim();
                    (&url_part[..end], rest.ends_with('['))
                }
                None => (url_part.trim_end_matches(')'), false),
            };

            blocks.push(link(&text_parts.join(" "), url));

            if has_trailing_open {
                return consume_multiline_link(lines, j + 1, blocks);
            }
            return j + 1;
        }
        text_parts.push(l);
        j += 1;
    }

    // Never closed: keep the text
    for part in text_parts.into_iter().filter(|p| !p.is_empty()) {
        blocks.push(Block::Text(part.to_string()));
    }
    j
}

fn push_inline_links(line: &str, blocks: &mut Vec<Block>) {
    for caps in INLINE_LINKS_RE.captures_iter(line) {
        blocks.push(link(&caps[1], &caps[2]));
    }
}

fn link(text: &str, url: &str) -> Block {
    Block::Link {
        text: text.trim().to_string(),
        url: url.trim().trim_matches(['<', '>']).to_string(),
    }
}

/// Replace `[text](url)` with `text`.
pub fn strip_link_syntax(line: &str) -> String {
    INLINE_LINKS_RE.replace_all(line, "$1").to_string()
}
