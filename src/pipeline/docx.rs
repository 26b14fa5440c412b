//! DOCX → semantic HTML.
//!
//! Reads the WordprocessingML package directly (zip + quick-xml) and emits
//! the small HTML vocabulary the Markdown stage understands: `h1`–`h6`, `p`,
//! `ul`/`ol`/`li`, `strong`, `em`, `a`, `br` and flat tables. Layout and
//! styling are dropped on purpose; the output is for reading, not printing
//! pixel-perfect.
//!
//! Problems that do not stop the conversion (unknown paragraph styles,
//! images) come back as [`ConversionMessage`]s.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;
use zip::ZipArchive;

use crate::error::{ConversionMessage, SowError};

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const NUMBERING_PART: &str = "word/numbering.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// Paragraph styles that render as a plain `<p>` without a warning.
const PLAIN_STYLES: &[&str] = &["normal", "listparagraph", "bodytext", "nospacing"];

/// HTML plus the non-fatal messages collected along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlConversion {
    pub html: String,
    pub messages: Vec<ConversionMessage>,
}

/// Convert a DOCX file's bytes to HTML.
///
/// CPU-bound; call from `spawn_blocking` in async code.
pub fn docx_to_html(bytes: &[u8]) -> Result<HtmlConversion, SowError> {
    let mut package = DocxPackage::open(bytes)?;
    let document = package
        .read_part(DOCUMENT_PART)?
        .ok_or_else(|| SowError::Docx(format!("missing {DOCUMENT_PART}")))?;

    let styles = match package.read_part(STYLES_PART)? {
        Some(xml) => parse_styles(&xml)?,
        None => HashMap::new(),
    };
    let numbering = match package.read_part(NUMBERING_PART)? {
        Some(xml) => Numbering::parse(&xml)?,
        None => Numbering::default(),
    };
    let relationships = match package.read_part(DOCUMENT_RELS_PART)? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };
    debug!(
        "DOCX parts: {} styles, {} numbering definitions, {} relationships",
        styles.len(),
        numbering.nums.len(),
        relationships.len()
    );

    let context = DocxContext {
        styles,
        numbering,
        relationships,
    };
    BodyParser::new(&context).run(&document)
}

// ── Package access ───────────────────────────────────────────────────────

struct DocxPackage<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> DocxPackage<'a> {
    fn open(bytes: &'a [u8]) -> Result<Self, SowError> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| SowError::Docx(format!("not a DOCX (zip) file: {e}")))?;
        Ok(Self { archive })
    }

    /// `Ok(None)` when the part does not exist.
    fn read_part(&mut self, path: &str) -> Result<Option<String>, SowError> {
        let mut file = match self.archive.by_name(path) {
            Ok(f) => f,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| SowError::Docx(format!("failed to read {path}: {e}")))?;
        Ok(Some(contents))
    }
}

// ── XML helpers ──────────────────────────────────────────────────────────

fn xml_reader(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader
}

/// Attribute by local name, ignoring the namespace prefix.
fn attr(e: &BytesStart, local: &str) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.local_name().as_ref() == local.as_bytes())
        .map(|a| {
            a.unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned())
        })
}

/// Attribute by exact qualified name, e.g. `r:id`.
fn qualified_attr(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name.as_bytes())
        .map(|a| {
            a.unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned())
        })
}

/// Toggle properties (`<w:b/>`, `<w:i w:val="0"/>`) are on unless switched off.
fn toggle_on(e: &BytesStart) -> bool {
    !matches!(
        attr(e, "val").as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("0" | "false" | "off" | "none")
    )
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// ── Auxiliary parts ──────────────────────────────────────────────────────

/// Style id → style name.
fn parse_styles(xml: &str) -> Result<HashMap<String, String>, SowError> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut styles = HashMap::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"style" => current = attr(&e, "styleId"),
                b"name" => {
                    if let (Some(id), Some(name)) = (&current, attr(&e, "val")) {
                        styles.insert(id.clone(), name);
                    }
                }
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"style" => current = None,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(styles)
}

/// Relationship id → target.
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, SowError> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut rels = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, "Id"), attr(&e, "Target")) {
                    rels.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

/// `numId` → abstract definition → per-level number format.
#[derive(Debug, Default)]
struct Numbering {
    abstract_formats: HashMap<String, HashMap<u32, String>>,
    nums: HashMap<String, String>,
}

impl Numbering {
    fn parse(xml: &str) -> Result<Self, SowError> {
        let mut reader = xml_reader(xml);
        let mut buf = Vec::new();
        let mut numbering = Numbering::default();
        let mut abstract_id: Option<String> = None;
        let mut level: Option<u32> = None;
        let mut num_id: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"abstractNum" => abstract_id = attr(&e, "abstractNumId"),
                    b"lvl" => level = attr(&e, "ilvl").and_then(|v| v.parse().ok()),
                    b"numFmt" => {
                        if let (Some(a), Some(l), Some(fmt)) = (&abstract_id, level, attr(&e, "val")) {
                            numbering
                                .abstract_formats
                                .entry(a.clone())
                                .or_default()
                                .insert(l, fmt);
                        }
                    }
                    b"num" => num_id = attr(&e, "numId"),
                    b"abstractNumId" => {
                        if let (Some(n), Some(a)) = (&num_id, attr(&e, "val")) {
                            numbering.nums.insert(n.clone(), a);
                        }
                    }
                    _ => {}
                },
                Event::End(e) => match e.local_name().as_ref() {
                    b"abstractNum" => abstract_id = None,
                    b"lvl" => level = None,
                    b"num" => num_id = None,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(numbering)
    }

    /// `true` for decimal/letter/roman formats; bullets and unknown
    /// definitions render as unordered lists.
    fn is_ordered(&self, num_id: &str, level: u32) -> bool {
        self.nums
            .get(num_id)
            .and_then(|a| self.abstract_formats.get(a))
            .and_then(|levels| levels.get(&level))
            .is_some_and(|fmt| fmt != "bullet" && fmt != "none")
    }
}

struct DocxContext {
    styles: HashMap<String, String>,
    numbering: Numbering,
    relationships: HashMap<String, String>,
}

/// `Heading1`…`Heading6` / `heading 1`… / `Title`, by id or by name.
fn heading_level(style_id: &str, style_name: Option<&str>) -> Option<u8> {
    let level_of = |s: &str| -> Option<u8> {
        let norm: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        if norm == "title" {
            return Some(1);
        }
        let n: u8 = norm.strip_prefix("heading")?.parse().ok()?;
        (1..=6).contains(&n).then_some(n)
    };
    level_of(style_id).or_else(|| style_name.and_then(level_of))
}

// ── Document body ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ParagraphState {
    style_id: Option<String>,
    num_id: Option<String>,
    level: u32,
    html: String,
    link: Option<(String, usize)>,
}

#[derive(Debug, Default)]
struct RunState {
    bold: bool,
    italic: bool,
    text: String,
}

#[derive(Debug, Default)]
struct TableRow {
    header: bool,
    cells: Vec<String>,
}

struct BodyParser<'c> {
    ctx: &'c DocxContext,
    out: String,
    /// Open lists, innermost last; `true` = ordered.
    lists: Vec<bool>,
    messages: Vec<ConversionMessage>,
    seen_messages: HashSet<String>,
    paragraph: Option<ParagraphState>,
    run: Option<RunState>,
    in_paragraph_props: bool,
    in_run_props: bool,
    in_text: bool,
    table_depth: usize,
    rows: Vec<TableRow>,
}

impl<'c> BodyParser<'c> {
    fn new(ctx: &'c DocxContext) -> Self {
        Self {
            ctx,
            out: String::new(),
            lists: Vec::new(),
            messages: Vec::new(),
            seen_messages: HashSet::new(),
            paragraph: None,
            run: None,
            in_paragraph_props: false,
            in_run_props: false,
            in_text: false,
            table_depth: 0,
            rows: Vec::new(),
        }
    }

    fn run(mut self, xml: &str) -> Result<HtmlConversion, SowError> {
        let mut reader = xml_reader(xml);
        let mut buf = Vec::new();
        let mut skip_buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    if self.is_skipped_subtree(&e) {
                        let end = e.to_end().into_owned();
                        reader.read_to_end_into(end.name(), &mut skip_buf)?;
                        skip_buf.clear();
                    } else {
                        self.open(&e);
                    }
                }
                Event::Empty(e) => {
                    if !self.is_skipped_subtree(&e) {
                        self.open(&e);
                        self.close(e.local_name().as_ref());
                    }
                }
                Event::End(e) => self.close(e.local_name().as_ref()),
                Event::Text(t) => {
                    if self.in_text {
                        let text = t
                            .unescape()
                            .map_err(|e| SowError::Docx(format!("bad text node: {e}")))?;
                        if let Some(run) = self.run.as_mut() {
                            run.text.push_str(&escape_text(&text));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        self.close_lists();
        Ok(HtmlConversion {
            html: self.out,
            messages: self.messages,
        })
    }

    fn warn_once(&mut self, message: String) {
        if self.seen_messages.insert(message.clone()) {
            self.messages.push(ConversionMessage::warning(message));
        }
    }

    /// Subtrees whose text must not leak into the output.
    fn is_skipped_subtree(&mut self, e: &BytesStart) -> bool {
        match e.local_name().as_ref() {
            b"drawing" | b"pict" | b"object" => {
                self.warn_once("An image was found but was not converted".to_string());
                true
            }
            // AlternateContent repeats its Choice in the Fallback.
            b"Fallback" => true,
            _ => false,
        }
    }

    fn open(&mut self, e: &BytesStart) {
        match e.local_name().as_ref() {
            b"p" => {
                self.paragraph = Some(ParagraphState::default());
            }
            b"pPr" => self.in_paragraph_props = true,
            b"pStyle" if self.in_paragraph_props => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.style_id = attr(e, "val");
                }
            }
            b"ilvl" if self.in_paragraph_props => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.level = attr(e, "val").and_then(|v| v.parse().ok()).unwrap_or(0);
                }
            }
            b"numId" if self.in_paragraph_props => {
                if let Some(p) = self.paragraph.as_mut() {
                    // numId 0 removes numbering inherited from the style.
                    p.num_id = attr(e, "val").filter(|v| v != "0");
                }
            }
            b"r" if self.paragraph.is_some() => self.run = Some(RunState::default()),
            b"rPr" if self.run.is_some() => self.in_run_props = true,
            b"b" if self.in_run_props => {
                if let Some(run) = self.run.as_mut() {
                    run.bold = toggle_on(e);
                }
            }
            b"i" if self.in_run_props => {
                if let Some(run) = self.run.as_mut() {
                    run.italic = toggle_on(e);
                }
            }
            b"t" => self.in_text = self.run.is_some(),
            b"tab" if !self.in_paragraph_props => self.push_run_text(" "),
            b"br" => {
                if attr(e, "type").as_deref() != Some("page") {
                    self.push_run_text("<br />");
                }
            }
            b"cr" => self.push_run_text("<br />"),
            b"hyperlink" => {
                let href = qualified_attr(e, "r:id")
                    .and_then(|id| self.ctx.relationships.get(&id).cloned())
                    .or_else(|| attr(e, "anchor").map(|a| format!("#{a}")));
                if let (Some(href), Some(p)) = (href, self.paragraph.as_mut()) {
                    p.link = Some((href, p.html.len()));
                }
            }
            b"tbl" => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.close_lists();
                    self.rows.clear();
                }
            }
            b"tr" if self.table_depth == 1 => self.rows.push(TableRow::default()),
            b"tblHeader" if self.table_depth == 1 => {
                if let Some(row) = self.rows.last_mut() {
                    row.header = toggle_on(e);
                }
            }
            b"tc" if self.table_depth == 1 => {
                if let Some(row) = self.rows.last_mut() {
                    row.cells.push(String::new());
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, local: &[u8]) {
        match local {
            b"pPr" => self.in_paragraph_props = false,
            b"rPr" => self.in_run_props = false,
            b"t" => self.in_text = false,
            b"r" => self.finish_run(),
            b"hyperlink" => {
                if let Some(p) = self.paragraph.as_mut() {
                    if let Some((href, start)) = p.link.take() {
                        let inner = p.html.split_off(start);
                        if !inner.is_empty() {
                            p.html
                                .push_str(&format!("<a href=\"{}\">{inner}</a>", escape_text(&href)));
                        }
                    }
                }
            }
            b"p" => {
                if let Some(p) = self.paragraph.take() {
                    self.finish_paragraph(p);
                }
            }
            b"tbl" => {
                self.table_depth = self.table_depth.saturating_sub(1);
                if self.table_depth == 0 {
                    let rows = std::mem::take(&mut self.rows);
                    self.write_table(rows);
                }
            }
            _ => {}
        }
    }

    fn push_run_text(&mut self, html: &str) {
        if let Some(run) = self.run.as_mut() {
            run.text.push_str(html);
        }
    }

    fn finish_run(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        self.in_run_props = false;
        if run.text.is_empty() {
            return;
        }
        let mut html = run.text;
        if run.italic {
            html = format!("<em>{html}</em>");
        }
        if run.bold {
            html = format!("<strong>{html}</strong>");
        }
        if let Some(p) = self.paragraph.as_mut() {
            p.html.push_str(&html);
        }
    }

    fn finish_paragraph(&mut self, p: ParagraphState) {
        let content = p.html.trim();
        if content.is_empty() {
            return;
        }

        if self.table_depth > 0 {
            if let Some(cell) = self.rows.last_mut().and_then(|r| r.cells.last_mut()) {
                if !cell.is_empty() {
                    cell.push(' ');
                }
                cell.push_str(content);
            }
            return;
        }

        let ctx = self.ctx;
        let style_name = p
            .style_id
            .as_ref()
            .and_then(|id| ctx.styles.get(id))
            .map(String::as_str);

        if let Some(level) = p
            .style_id
            .as_deref()
            .and_then(|id| heading_level(id, style_name))
        {
            self.close_lists();
            self.out.push_str(&format!("<h{level}>{content}</h{level}>"));
            return;
        }

        if let Some(num_id) = &p.num_id {
            let ordered = ctx.numbering.is_ordered(num_id, p.level);
            self.write_list_item(p.level as usize, ordered, content);
            return;
        }

        if let Some(id) = &p.style_id {
            let plain = PLAIN_STYLES.contains(&id.to_ascii_lowercase().as_str());
            if !plain {
                let name = style_name.unwrap_or(id);
                self.warn_once(format!(
                    "Unrecognised paragraph style: '{name}' (Style ID: {id})"
                ));
            }
        }
        self.close_lists();
        self.out.push_str(&format!("<p>{content}</p>"));
    }

    fn write_list_item(&mut self, level: usize, ordered: bool, content: &str) {
        let depth = level + 1;
        while self.lists.len() > depth {
            self.close_innermost_list();
        }
        if self.lists.len() == depth && self.lists.last() != Some(&ordered) {
            self.close_innermost_list();
        }
        if self.lists.len() == depth {
            self.out.push_str("</li>");
        }
        while self.lists.len() < depth {
            self.out.push_str(if ordered { "<ol>" } else { "<ul>" });
            self.lists.push(ordered);
        }
        self.out.push_str("<li>");
        self.out.push_str(content);
    }

    fn close_innermost_list(&mut self) {
        if let Some(ordered) = self.lists.pop() {
            self.out.push_str(if ordered { "</li></ol>" } else { "</li></ul>" });
        }
    }

    fn close_lists(&mut self) {
        while !self.lists.is_empty() {
            self.close_innermost_list();
        }
    }

    fn write_table(&mut self, rows: Vec<TableRow>) {
        if rows.is_empty() {
            return;
        }
        self.out.push_str("<table>");
        let mut in_header = true;
        for row in rows {
            in_header &= row.header;
            let tag = if in_header { "th" } else { "td" };
            self.out.push_str("<tr>");
            for cell in row.cells {
                self.out.push_str(&format!("<{tag}>{cell}</{tag}>"));
            }
            self.out.push_str("</tr>");
        }
        self.out.push_str("</table>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const W_NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;

    fn docx(parts: &[(&str, String)]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn body(xml: &str) -> Vec<(&'static str, String)> {
        vec![(
            DOCUMENT_PART,
            format!(r#"<?xml version="1.0"?><w:document {W_NS}><w:body>{xml}</w:body></w:document>"#),
        )]
    }

    fn para(style: Option<&str>, runs: &str) -> String {
        let ppr = style
            .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{s}"/></w:pPr>"#))
            .unwrap_or_default();
        format!("<w:p>{ppr}{runs}</w:p>")
    }

    fn run(text: &str) -> String {
        format!(r#"<w:r><w:t xml:space="preserve">{text}</w:t></w:r>"#)
    }

    #[test]
    fn headings_paragraphs_and_emphasis() {
        let xml = [
            para(Some("Heading1"), &run("Scope")),
            para(None, &format!(
                r#"{}<w:r><w:rPr><w:b/></w:rPr><w:t>bold</w:t></w:r><w:r><w:rPr><w:i/><w:b w:val="0"/></w:rPr><w:t> it</w:t></w:r>"#,
                run("Plain ")
            )),
            para(None, ""),
            para(Some("Title"), &run("Main")),
        ]
        .concat();
        let out = docx_to_html(&docx(&body(&xml))).unwrap();
        assert_eq!(
            out.html,
            "<h1>Scope</h1><p>Plain <strong>bold</strong><em> it</em></p><h1>Main</h1>"
        );
        assert!(out.messages.is_empty());
    }

    #[test]
    fn heading_detected_by_style_name() {
        let mut parts = body(&para(Some("Custom2"), &run("Phase")));
        parts.push((
            STYLES_PART,
            format!(r#"<w:styles {W_NS}><w:style w:type="paragraph" w:styleId="Custom2"><w:name w:val="heading 2"/></w:style></w:styles>"#),
        ));
        let out = docx_to_html(&docx(&parts)).unwrap();
        assert_eq!(out.html, "<h2>Phase</h2>");
    }

    #[test]
    fn text_is_escaped() {
        let out = docx_to_html(&docx(&body(&para(None, &run("R&amp;D &lt;core&gt;"))))).unwrap();
        assert_eq!(out.html, "<p>R&amp;D &lt;core&gt;</p>");
    }

    #[test]
    fn numbered_paragraphs_become_lists() {
        let item = |num: &str, lvl: u32, text: &str| {
            format!(
                r#"<w:p><w:pPr><w:pStyle w:val="ListParagraph"/><w:numPr><w:ilvl w:val="{lvl}"/><w:numId w:val="{num}"/></w:numPr></w:pPr>{}</w:p>"#,
                run(text)
            )
        };
        let xml = [
            item("1", 0, "one"),
            item("1", 0, "two"),
            item("2", 0, "dot"),
            para(None, &run("after")),
        ]
        .concat();
        let mut parts = body(&xml);
        parts.push((
            NUMBERING_PART,
            format!(
                r#"<w:numbering {W_NS}>
                <w:abstractNum w:abstractNumId="10"><w:lvl w:ilvl="0"><w:numFmt w:val="decimal"/></w:lvl></w:abstractNum>
                <w:abstractNum w:abstractNumId="20"><w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/></w:lvl></w:abstractNum>
                <w:num w:numId="1"><w:abstractNumId w:val="10"/></w:num>
                <w:num w:numId="2"><w:abstractNumId w:val="20"/></w:num>
                </w:numbering>"#
            ),
        ));
        let out = docx_to_html(&docx(&parts)).unwrap();
        assert_eq!(
            out.html,
            "<ol><li>one</li><li>two</li></ol><ul><li>dot</li></ul><p>after</p>"
        );
    }

    #[test]
    fn nested_list_items_open_inner_lists() {
        let item = |lvl: u32, text: &str| {
            format!(
                r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="{lvl}"/><w:numId w:val="5"/></w:numPr></w:pPr>{}</w:p>"#,
                run(text)
            )
        };
        let xml = [item(0, "a"), item(1, "b"), item(0, "c")].concat();
        let out = docx_to_html(&docx(&body(&xml))).unwrap();
        assert_eq!(out.html, "<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>");
    }

    #[test]
    fn hyperlinks_resolve_through_relationships() {
        let xml = para(
            None,
            &format!(
                r#"{}<w:hyperlink r:id="rId7">{}</w:hyperlink><w:hyperlink w:anchor="scope">{}</w:hyperlink>"#,
                run("See "),
                run("docs"),
                run(" here")
            ),
        );
        let mut parts = body(&xml);
        parts.push((
            DOCUMENT_RELS_PART,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/a?b=1&amp;c=2" TargetMode="External"/></Relationships>"#.to_string(),
        ));
        let out = docx_to_html(&docx(&parts)).unwrap();
        assert_eq!(
            out.html,
            r##"<p>See <a href="https://example.com/a?b=1&amp;c=2">docs</a><a href="#scope"> here</a></p>"##
        );
    }

    #[test]
    fn breaks_and_tabs() {
        let xml = para(
            None,
            r#"<w:r><w:t>a</w:t><w:br/><w:t>b</w:t><w:tab/><w:t>c</w:t><w:br w:type="page"/></w:r>"#,
        );
        let out = docx_to_html(&docx(&body(&xml))).unwrap();
        assert_eq!(out.html, "<p>a<br />b c</p>");
    }

    #[test]
    fn tables_with_header_row() {
        let cell = |t: &str| format!("<w:tc>{}</w:tc>", para(None, &run(t)));
        let xml = format!(
            r#"<w:tbl><w:tr><w:trPr><w:tblHeader/></w:trPr>{}{}</w:tr><w:tr>{}<w:tc>{}{}</w:tc></w:tr></w:tbl>"#,
            cell("Phase"),
            cell("Weeks"),
            cell("Design"),
            para(None, &run("3")),
            para(None, &run("to 4")),
        );
        let out = docx_to_html(&docx(&body(&xml))).unwrap();
        assert_eq!(
            out.html,
            "<table><tr><th>Phase</th><th>Weeks</th></tr><tr><td>Design</td><td>3 to 4</td></tr></table>"
        );
    }

    #[test]
    fn unknown_styles_and_images_produce_warnings_once() {
        let xml = [
            para(Some("Fancy"), &run("one")),
            para(Some("Fancy"), &run("two")),
            para(None, r#"<w:r><w:drawing><wp:inline xmlns:wp="urn:wp"><a:t xmlns:a="urn:a">hidden</a:t></wp:inline></w:drawing></w:r>"#),
        ]
        .concat();
        let out = docx_to_html(&docx(&body(&xml))).unwrap();
        assert_eq!(out.html, "<p>one</p><p>two</p>");
        assert_eq!(out.messages.len(), 2);
        assert_eq!(
            out.messages[0].message,
            "Unrecognised paragraph style: 'Fancy' (Style ID: Fancy)"
        );
        assert!(out.messages[1].message.contains("image"));
    }

    #[test]
    fn invalid_packages_are_docx_errors() {
        let err = docx_to_html(b"not a zip").unwrap_err();
        assert!(matches!(err, SowError::Docx(_)));

        let err = docx_to_html(&docx(&[("word/other.xml", String::new())])).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"), "got: {err}");
    }
}
