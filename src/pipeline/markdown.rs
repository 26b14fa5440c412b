//! HTML → Markdown.
//!
//! A fixed chain of regex rules over the HTML produced by
//! [`crate::pipeline::docx`], followed by one tidy pass over the lines.
//!
//! ## Rule Order
//!
//! Inline elements are rewritten first, then tables as whole blocks (so
//! breaks inside a cell never split a row), then the remaining block
//! elements. Entities are decoded after the catch-all tag strip so that
//! escaped `&lt;tags&gt;` in the text survive as literal text. `&amp;` is
//! decoded last so `&amp;lt;` becomes `&lt;`, not `<`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Convert HTML to Markdown.
///
/// Rules (applied in order):
/// 1. Headings `<h1>`…`<h6>` → `#`…`######`
/// 2. `<strong>`/`<b>` → `**text**`
/// 3. `<em>`/`<i>` → `*text*`
/// 4. Links → `[text](href)`
/// 5. Tables → GFM pipe tables; the first row is the header
/// 6. `<p>` → text + blank line
/// 7. `<br>` → newline
/// 8. Lists → `- item` / `1. item`, numbered per list, nested lists indented
/// 9. Strip remaining tags
/// 10. Decode entities
/// 11. Tidy lines (trailing whitespace, blank runs, invisible characters)
pub fn html_to_markdown(html: &str) -> String {
    let s = convert_headings(html);
    let s = convert_bold(&s);
    let s = convert_italic(&s);
    let s = convert_links(&s);
    let s = convert_tables(&s);
    let s = convert_paragraphs(&s);
    let s = convert_line_breaks(&s);
    let s = convert_lists(&s);
    let s = strip_tags(&s);
    let s = decode_entities(&s);
    tidy_lines(&s)
}

// ── Rule 1: Headings ─────────────────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h([1-6])(?:\s[^>]*)?>(.*?)</h[1-6]>").unwrap());

fn convert_headings(input: &str) -> String {
    RE_HEADING
        .replace_all(input, |caps: &Captures<'_>| {
            let level: usize = caps[1].parse().unwrap_or(1);
            format!("{} {}\n\n", "#".repeat(level), caps[2].trim())
        })
        .to_string()
}

// ── Rule 2–3: Emphasis ───────────────────────────────────────────────────────

static RE_BOLD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(?:strong|b)(?:\s[^>]*)?>(.*?)</(?:strong|b)>").unwrap()
});
static RE_ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(?:em|i)(?:\s[^>]*)?>(.*?)</(?:em|i)>").unwrap());

fn convert_bold(input: &str) -> String {
    RE_BOLD.replace_all(input, "**$1**").to_string()
}

fn convert_italic(input: &str) -> String {
    RE_ITALIC.replace_all(input, "*$1*").to_string()
}

// ── Rule 4: Links ────────────────────────────────────────────────────────────

static RE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap()
});

fn convert_links(input: &str) -> String {
    RE_LINK.replace_all(input, "[$2]($1)").to_string()
}

// ── Rule 5: Tables ───────────────────────────────────────────────────────────
//
// The DOCX reader emits flat `<table><tr><td>…` markup with no `<thead>`, so
// the first row becomes the header and the delimiter row is written once,
// right after it. Rows are never dropped, including rows of empty cells.

static RE_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<table(?:\s[^>]*)?>(.*?)</table>").unwrap());
static RE_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<tr(?:\s[^>]*)?>(.*?)</tr>").unwrap());
static RE_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(td|th)(?:\s[^>]*)?>(.*?)</(?:td|th)>").unwrap());
static RE_CELL_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>|</p>|</li>").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn convert_tables(input: &str) -> String {
    RE_TABLE
        .replace_all(input, |caps: &Captures<'_>| render_table(&caps[1]))
        .to_string()
}

fn render_table(inner: &str) -> String {
    let rows: Vec<Vec<String>> = RE_ROW
        .captures_iter(inner)
        .map(|row| {
            RE_CELL
                .captures_iter(&row[1])
                .map(|cell| cell_text(&cell[2], cell[1].eq_ignore_ascii_case("th")))
                .collect()
        })
        .collect();
    let Some(columns) = rows.first().map(|r| r.len().max(1)) else {
        return String::new();
    };

    let mut out = String::from("\n\n");
    for (i, cells) in rows.iter().enumerate() {
        out.push('|');
        for cell in cells {
            out.push(' ');
            out.push_str(cell);
            out.push_str(" |");
        }
        if cells.is_empty() {
            out.push_str("  |");
        }
        out.push('\n');
        if i == 0 {
            out.push('|');
            out.push_str(&" --- |".repeat(columns));
            out.push('\n');
        }
    }
    out.push('\n');
    out
}

/// One line of cell text: breaks become spaces, tags go, pipes are escaped.
fn cell_text(html: &str, header: bool) -> String {
    let text = RE_CELL_BREAK.replace_all(html, " ");
    let text = strip_tags(&text);
    let text = RE_WHITESPACE.replace_all(text.trim(), " ").replace('|', "\\|");
    if header && !text.is_empty() {
        format!("**{text}**")
    } else {
        text
    }
}

// ── Rule 6–7: Paragraphs and line breaks ─────────────────────────────────────

static RE_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p>").unwrap());
static RE_BR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

fn convert_paragraphs(input: &str) -> String {
    RE_PARAGRAPH.replace_all(input, "$1\n\n").to_string()
}

fn convert_line_breaks(input: &str) -> String {
    RE_BR.replace_all(input, "\n").to_string()
}

// ── Rule 8: Lists ────────────────────────────────────────────────────────────
//
// A tag scanner rather than a single regex: `<li>(.*?)</li>` cannot see list
// boundaries, so numbering would run across separate `<ol>` blocks and nested
// lists would be cut in half.

static RE_LIST_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(/?)(ul|ol|li)(?:\s[^>]*)?>").unwrap());

fn convert_lists(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    // (ordered, next number) per open list, innermost last
    let mut stack: Vec<(bool, usize)> = Vec::new();
    let mut last = 0;

    for caps in RE_LIST_TAG.captures_iter(input) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&input[last..whole.start()]);
        last = whole.end();

        let closing = !caps[1].is_empty();
        let tag = caps[2].to_ascii_lowercase();
        match (tag.as_str(), closing) {
            ("ul" | "ol", false) => stack.push((tag == "ol", 1)),
            ("ul" | "ol", true) => {
                stack.pop();
                if stack.is_empty() {
                    out.push_str("\n\n");
                }
            }
            ("li", false) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                let depth = stack.len().max(1);
                out.push_str(&"  ".repeat(depth - 1));
                match stack.last_mut() {
                    Some((true, n)) => {
                        out.push_str(&format!("{n}. "));
                        *n += 1;
                    }
                    _ => out.push_str("- "),
                }
            }
            _ => {}
        }
    }
    out.push_str(&input[last..]);
    out
}

// ── Rule 9–10: Tags and entities ─────────────────────────────────────────────

static RE_ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

fn strip_tags(input: &str) -> String {
    RE_ANY_TAG.replace_all(input, "").to_string()
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

// ── Rule 11: Tidy lines ──────────────────────────────────────────────────────

/// Zero-width and soft-hyphen characters Word leaves in runs.
fn is_invisible(c: char) -> bool {
    matches!(c, '\u{00AD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}')
}

/// Trim line ends, keep at most one blank line in a row, and drop invisible
/// characters. `str::lines` already folds `\r\n`.
fn tidy_lines(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut blank_run = 0usize;
    for line in input.lines() {
        let line: String = line.chars().filter(|c| !is_invisible(*c)).collect();
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
