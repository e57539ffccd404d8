//! Minimal frontmatter extraction for `SKILL.md`.
//!
//! Full discovery needs exactly one key out of the YAML frontmatter: the
//! `targets:` list. Nothing else in the document is parsed, so this is a
//! hand-rolled scanner rather than a YAML dependency: it reads lines until
//! the closing `---`, finds the top-level `targets` key, and understands the
//! scalar forms real skill files use (bare, single-quoted, double-quoted,
//! and block scalars).

/// Extracts the `targets:` list from a `SKILL.md` document.
///
/// Returns `None` when the document has no frontmatter, no `targets` key, or
/// an explicitly null value. `Some(vec![])` means "targets present, matches
/// nothing" (e.g. an empty inline list).
pub fn parse_targets(content: &str) -> Option<Vec<String>> {
    let body = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = body.lines();

    if lines.next().map(str::trim_end) != Some("---") {
        return None;
    }

    let fm: Vec<&str> = lines
        .take_while(|l| {
            let t = l.trim_end();
            t != "---" && t != "..."
        })
        .collect();

    let mut i = 0;
    while i < fm.len() {
        let line = fm[i];
        i += 1;
        // Top-level keys only: nested maps are indented.
        if line.starts_with(' ') || line.starts_with('\t') {
            continue;
        }
        let Some(rest) = line.strip_prefix("targets:") else {
            continue;
        };
        let value = rest.trim();

        if value.is_empty() || value == "~" || value == "null" {
            // Either a null value or a block sequence on the following lines.
            let mut items = Vec::new();
            let mut saw_item = false;
            while i < fm.len() {
                let item_line = fm[i];
                let trimmed = item_line.trim_start();
                if let Some(item) = trimmed.strip_prefix("- ").or_else(|| {
                    (trimmed == "-").then_some("")
                }) {
                    i += 1;
                    items.push(parse_scalar_item(item, &fm, &mut i));
                    saw_item = true;
                } else if trimmed.is_empty() || trimmed.starts_with('#') {
                    i += 1;
                } else {
                    break;
                }
            }
            return if saw_item { Some(items) } else { None };
        }

        if let Some(inner) = value.strip_prefix('[') {
            let inner = inner.strip_suffix(']').unwrap_or(inner);
            let items = inner
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(parse_scalar)
                .collect();
            return Some(items);
        }

        if let Some(header) = block_scalar_header(value) {
            let scalar = parse_block_scalar(header, &fm, &mut i);
            return if scalar.is_empty() {
                Some(Vec::new())
            } else {
                Some(vec![scalar])
            };
        }

        // Plain scalar value: a single-element list.
        return Some(vec![parse_scalar(value)]);
    }
    None
}

/// Parses one sequence item, which may itself open a block scalar.
fn parse_scalar_item(item: &str, fm: &[&str], i: &mut usize) -> String {
    let trimmed = item.trim();
    if let Some(header) = block_scalar_header(trimmed) {
        parse_block_scalar(header, fm, i)
    } else {
        parse_scalar(trimmed)
    }
}

#[derive(Clone, Copy)]
enum BlockStyle {
    Literal,
    Folded,
}

fn block_scalar_header(value: &str) -> Option<BlockStyle> {
    let mut chars = value.chars();
    let style = match chars.next() {
        Some('|') => BlockStyle::Literal,
        Some('>') => BlockStyle::Folded,
        _ => return None,
    };
    // Chomping indicators and an explicit indent digit are accepted and
    // otherwise ignored; anything else makes this a plain scalar.
    if chars.all(|c| matches!(c, '+' | '-') || c.is_ascii_digit()) {
        Some(style)
    } else {
        None
    }
}

/// Consumes the indented body following a block scalar header.
///
/// A header with no body yields the empty string. `*i` is left on the first
/// line after the body.
fn parse_block_scalar(style: BlockStyle, fm: &[&str], i: &mut usize) -> String {
    let mut body: Vec<&str> = Vec::new();
    let mut indent: Option<usize> = None;
    while *i < fm.len() {
        let line = fm[*i];
        if line.trim().is_empty() {
            body.push("");
            *i += 1;
            continue;
        }
        let line_indent = line.len() - line.trim_start().len();
        if line_indent == 0 {
            break;
        }
        let keep = *indent.get_or_insert(line_indent);
        if line_indent < keep {
            break;
        }
        body.push(&line[keep..]);
        *i += 1;
    }
    while body.last().is_some_and(|l| l.is_empty()) {
        body.pop();
    }
    match style {
        BlockStyle::Literal => body.join("\n"),
        BlockStyle::Folded => body.join(" "),
    }
}

/// Unwraps a bare, single-quoted, or double-quoted scalar.
fn parse_scalar(value: &str) -> String {
    let value = value.trim();
    if value.len() >= 2 {
        if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
            return inner.replace("''", "'");
        }
        if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
            return inner.replace("\\\"", "\"").replace("\\\\", "\\");
        }
    }
    // Bare scalars may carry a trailing comment.
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end().to_string(),
        None => value.to_string(),
    }
}
