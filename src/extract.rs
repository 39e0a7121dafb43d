//! Markdown metadata extraction.
//!
//! A single line-oriented pass that pulls out everything the index wants
//! from a note: tags (frontmatter and inline), ATX headings, link targets,
//! block references, code-fence labels, and the searchable body. No
//! markdown AST — the fields the engine cares about are all line- or
//! token-shaped, and a hand scan keeps the cold-index pass cheap.

use std::collections::HashSet;

/// Everything extracted from one note's raw content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteContent {
    pub tags: Vec<String>,
    pub headings: Vec<String>,
    /// Wikilink and markdown link targets, in document order.
    pub links: Vec<String>,
    /// `^block-id` references.
    pub block_refs: Vec<String>,
    /// Language labels on fenced code blocks.
    pub fence_labels: Vec<String>,
    /// Lowercased content, frontmatter and fence markers stripped. Fenced
    /// code content is included only when asked.
    pub body: String,
}

impl NoteContent {
    /// Link targets, block refs, and fence labels flattened into the
    /// `symbols` field of a document record.
    pub fn symbols(&self) -> Vec<String> {
        self.links
            .iter()
            .map(|target| format!("[[{target}]]"))
            .chain(self.block_refs.iter().map(|id| format!("^{id}")))
            .chain(self.fence_labels.iter().cloned())
            .collect()
    }
}

/// Parse raw markdown. Total: any input produces some structure.
pub fn parse_markdown(content: &str, include_code_blocks: bool) -> NoteContent {
    let mut out = NoteContent::default();
    let mut seen_tags = HashSet::new();
    let mut body_lines: Vec<&str> = Vec::new();

    let (frontmatter, rest) = split_frontmatter(content);
    if let Some(frontmatter) = frontmatter {
        for tag in frontmatter_tags(frontmatter) {
            if seen_tags.insert(tag.clone()) {
                out.tags.push(tag);
            }
        }
    }

    let mut in_fence: Option<&str> = None;
    for line in rest.lines() {
        let trimmed = line.trim_start();

        if let Some(marker) = fence_marker(trimmed) {
            match in_fence {
                Some(open) if trimmed.starts_with(open) => in_fence = None,
                Some(_) => {
                    // A different fence kind inside a block is content
                    if include_code_blocks {
                        body_lines.push(line);
                    }
                }
                None => {
                    let label = trimmed[marker.len()..].trim();
                    if !label.is_empty() {
                        out.fence_labels.push(label.to_string());
                    }
                    in_fence = Some(marker);
                }
            }
            continue;
        }

        if in_fence.is_some() {
            if include_code_blocks {
                body_lines.push(line);
            }
            continue;
        }

        if let Some(heading) = heading_text(trimmed) {
            out.headings.push(heading.to_string());
        }

        scan_inline(line, &mut out, &mut seen_tags);
        body_lines.push(line);
    }

    out.body = body_lines.join("\n").to_lowercase();
    out
}

/// Split a leading `---` frontmatter block off the content.
fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let after_open = match content.strip_prefix("---\n") {
        Some(rest) => rest,
        None => match content.strip_prefix("---\r\n") {
            Some(rest) => rest,
            None => return (None, content),
        },
    };
    for (offset, line) in line_offsets(after_open) {
        if line.trim_end() == "---" {
            let block = &after_open[..offset];
            return (Some(block), &after_open[offset + line.len()..]);
        }
    }
    (None, content)
}

fn line_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |line| {
        let start = offset;
        offset += line.len();
        (start, line)
    })
}

/// Tags from a frontmatter block: `tags: a, b`, `tags: [a, b]`, or a
/// dash-list under a bare `tags:` key.
fn frontmatter_tags(block: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let mut in_list = false;

    for line in block.lines() {
        let trimmed = line.trim();
        if let Some(value) = trimmed
            .strip_prefix("tags:")
            .or_else(|| trimmed.strip_prefix("tag:"))
        {
            let value = value.trim();
            if value.is_empty() {
                in_list = true;
                continue;
            }
            in_list = false;
            let value = value
                .trim_start_matches('[')
                .trim_end_matches(']');
            for piece in value.split(',') {
                push_tag(piece, &mut tags);
            }
        } else if in_list {
            if let Some(item) = trimmed.strip_prefix("- ") {
                push_tag(item, &mut tags);
            } else if !trimmed.is_empty() {
                in_list = false;
            }
        }
    }

    tags
}

fn push_tag(raw: &str, tags: &mut Vec<String>) {
    let tag = raw.trim().trim_matches('"').trim_matches('\'');
    let tag = tag.trim_start_matches('#');
    if !tag.is_empty() {
        tags.push(tag.to_string());
    }
}

/// ``` or ~~~ fence opener/closer, if this line is one.
fn fence_marker(trimmed: &str) -> Option<&'static str> {
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

/// ATX heading text, if this line is a heading.
fn heading_text(trimmed: &str) -> Option<&str> {
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    rest.strip_prefix(' ').map(str::trim).filter(|t| !t.is_empty())
}

/// One pass over a content line for inline tags, links, and block refs.
fn scan_inline(line: &str, out: &mut NoteContent, seen_tags: &mut HashSet<String>) {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '#' => {
                let at_boundary = i == 0 || !(chars[i - 1].is_alphanumeric() || chars[i - 1] == '#');
                let heading_marker = i == 0 && matches!(chars.get(1), Some(' ') | Some('#'));
                if at_boundary && !heading_marker {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && is_tag_char(chars[end]) {
                        end += 1;
                    }
                    let tag: String = chars[start..end].iter().collect();
                    // Pure-numeric runs are headings anchors or issue refs
                    if tag.chars().any(|c| c.is_alphabetic()) {
                        if seen_tags.insert(tag.clone()) {
                            out.tags.push(tag);
                        }
                        i = end;
                        continue;
                    }
                }
                i += 1;
            }
            '[' if chars.get(i + 1) == Some(&'[') => {
                if let Some(close) = find_seq(&chars, i + 2, &[']', ']']) {
                    let inner: String = chars[i + 2..close].iter().collect();
                    let target = inner.split('|').next().unwrap_or("").trim();
                    if !target.is_empty() {
                        out.links.push(target.to_string());
                    }
                    i = close + 2;
                    continue;
                }
                i += 1;
            }
            ']' if chars.get(i + 1) == Some(&'(') => {
                if let Some(close) = chars[i + 2..].iter().position(|&c| c == ')') {
                    let target: String = chars[i + 2..i + 2 + close].iter().collect();
                    let target = target.trim();
                    if !target.is_empty() {
                        out.links.push(target.to_string());
                    }
                    i = i + 2 + close + 1;
                    continue;
                }
                i += 1;
            }
            '^' => {
                let at_boundary = i == 0 || chars[i - 1].is_whitespace();
                if at_boundary {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len()
                        && (chars[end].is_ascii_alphanumeric() || chars[end] == '-')
                    {
                        end += 1;
                    }
                    if end > start {
                        out.block_refs.push(chars[start..end].iter().collect());
                        i = end;
                        continue;
                    }
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
}

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '/')
}

/// Find `needle` as a consecutive run in `chars` starting at `from`.
fn find_seq(chars: &[char], from: usize, needle: &[char]) -> Option<usize> {
    if chars.len() < needle.len() {
        return None;
    }
    (from..=chars.len() - needle.len()).find(|&i| &chars[i..i + needle.len()] == needle)
}
