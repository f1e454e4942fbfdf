//! HTML converters: readable text, and tables rendered as Markdown.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use attache_core::{ConverterType, Error, Input, OutputConverter, OutputPart, Result};

static SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap()
});
static STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap()
});
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<li\b[^>]*>").unwrap());
static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)</?(p|div|h[1-6]|ul|ol|li|tr|table|thead|tbody|section|article|",
        r"header|footer|nav|aside|blockquote|pre|hr)\b[^>]*>",
    ))
    .unwrap()
});
static CELL_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</t[dh]\s*>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").unwrap());
static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

static TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<table\b[^>]*>(.*?)</table\s*>").unwrap()
});
static ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").unwrap()
});
static CELL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<t[dh]\b[^>]*>(.*?)</t[dh]\s*>").unwrap()
});

/// Decode named and numeric character references. Unknown names are kept.
fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "ndash" => Some('\u{2013}'),
                    "mdash" => Some('\u{2014}'),
                    "hellip" => Some('\u{2026}'),
                    "copy" => Some('\u{a9}'),
                    _ => None,
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Reduce HTML to readable text.
pub(crate) fn html_to_text(html: &str) -> String {
    let text = SCRIPT.replace_all(html, "");
    let text = STYLE.replace_all(&text, "");
    let text = COMMENT.replace_all(&text, "");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = LIST_ITEM.replace_all(&text, "\n- ");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = CELL_END.replace_all(&text, " ");
    let text = ANY_TAG.replace_all(&text, "");
    let text = decode_entities(&text);

    let lines: Vec<String> = text
        .lines()
        .map(|line| INLINE_SPACE.replace_all(line, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");
    BLANK_LINES.replace_all(&joined, "\n\n").trim().to_string()
}

fn cell_text(html: &str) -> String {
    html_to_text(html)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

/// Render one `<table>` body as a Markdown table. The first row is the header.
fn table_to_markdown(table_html: &str) -> Option<String> {
    let rows: Vec<Vec<String>> = ROW
        .captures_iter(table_html)
        .map(|row| {
            CELL.captures_iter(&row[1])
                .map(|cell| cell_text(&cell[1]))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    let columns = rows.iter().map(Vec::len).max()?;
    let render = |cells: &[String]| {
        let padded: Vec<&str> = (0..columns)
            .map(|i| cells.get(i).map(String::as_str).unwrap_or(""))
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(render(&rows[0]));
    lines.push(format!("|{}", " --- |".repeat(columns)));
    lines.extend(rows[1..].iter().map(|row| render(row)));
    Some(lines.join("\n"))
}

/// Converter that strips HTML down to its readable text.
///
/// Scripts, styles, and comments are dropped; block elements and `<br>`
/// become line breaks and list items become `- ` bullets.
pub struct RichTextConverter;

#[async_trait]
impl OutputConverter for RichTextConverter {
    fn converter_type(&self) -> ConverterType {
        ConverterType::RichText
    }

    async fn convert(&self, input: &Input) -> Result<Vec<OutputPart>> {
        let text = html_to_text(&input.data.to_text_lossy());
        if text.is_empty() {
            return Err(Error::Conversion("HTML contains no text".to_string()));
        }
        Ok(vec![OutputPart::text(text)])
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "rich_text"
    }
}

/// Converter that renders each HTML table as a Markdown table.
pub struct RichTextTableConverter;

#[async_trait]
impl OutputConverter for RichTextTableConverter {
    fn converter_type(&self) -> ConverterType {
        ConverterType::RichTextTable
    }

    async fn convert(&self, input: &Input) -> Result<Vec<OutputPart>> {
        let html = input.data.to_text_lossy();
        let tables: Vec<OutputPart> = TABLE
            .captures_iter(&html)
            .filter_map(|table| table_to_markdown(&table[1]))
            .map(OutputPart::text)
            .collect();
        if tables.is_empty() {
            return Err(Error::Conversion("No tables found in HTML".to_string()));
        }
        Ok(tables)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "rich_text_table"
    }
}
