use std::borrow::Cow;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{ChannelImage, Entry};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),
    #[error("Document has no root element")]
    Empty,
    #[error("Expected <rss> root element, found <{0}>")]
    UnexpectedRoot(String),
    #[error("Malformed feed document: {0}")]
    Shape(#[from] quick_xml::DeError),
}

#[derive(Debug, Deserialize)]
struct RawFeed {
    channel: RawChannel,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    #[serde(default)]
    image: ChannelImage,
    #[serde(rename = "item", default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Default, Deserialize)]
struct RawItem {
    #[serde(default)]
    title: String,
    #[serde(rename = "creator", alias = "dc:creator", default)]
    creator: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "pubDate", default)]
    pub_date: String,
    #[serde(default)]
    guid: String,
    #[serde(default)]
    link: String,
}

/// Everything extracted from one feed document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed {
    pub image: Arc<ChannelImage>,
    pub entries: Vec<Entry>,
    /// Items dropped because their publish date did not parse
    pub skipped: usize,
}

/// Decodes an RSS document into entries.
///
/// Fails only when the document itself is unusable. Items whose `pubDate`
/// is not an RFC 2822 date are logged and left out; the remaining items
/// still produce entries in document order.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    let root = root_element(bytes)?;
    if root != "rss" {
        return Err(ParseError::UnexpectedRoot(root));
    }

    let raw: RawFeed = quick_xml::de::from_reader(bytes)?;
    let image = Arc::new(raw.channel.image);

    let mut entries = Vec::with_capacity(raw.channel.items.len());
    let mut skipped = 0;
    for item in raw.channel.items {
        let published = match parse_pub_date(&item.pub_date) {
            Ok(published) => published,
            Err(e) => {
                warn!(
                    pub_date = %item.pub_date,
                    title = %item.title,
                    guid = %item.guid,
                    error = %e,
                    "Failed to parse publish date, skipping item"
                );
                skipped += 1;
                continue;
            }
        };

        debug!(guid = %item.guid, creator = %item.creator, "Parsed item");
        entries.push(Entry {
            published,
            image: Arc::clone(&image),
            link: item.link,
            content: unescape_html(&item.description).into_owned(),
            title: item.title,
        });
    }

    Ok(ParsedFeed {
        image,
        entries,
        skipped,
    })
}

/// Parses the date format of email and HTTP headers (`Mon, 09 Dec 2024 12:00:00 GMT`).
pub fn parse_pub_date(raw: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc2822(raw.trim())
}

/// Decodes HTML character references the way browsers do.
///
/// Numeric references and legacy named entities (`&amp`, `&copy`, ...) may
/// omit the trailing `;`. Anything that does not resolve is kept as written.
/// Runs in linear time: every byte after a `&` is looked at a bounded number
/// of times.
pub fn unescape_html(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let reference = &rest[amp + 1..];
        let consumed = match reference.strip_prefix('#') {
            Some(number) => decode_numeric(number, &mut out).map(|len| len + 1),
            None => decode_named(reference, &mut out),
        };
        match consumed {
            Some(len) => rest = &reference[len..],
            None => {
                out.push('&');
                rest = reference;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Decodes the digits after `&#`, returning how many bytes were used.
fn decode_numeric(s: &str, out: &mut String) -> Option<usize> {
    let bytes = s.as_bytes();
    let (radix, start) = match bytes.first() {
        Some(b'x' | b'X') => (16, 1),
        _ => (10, 0),
    };
    let digits = bytes[start..]
        .iter()
        .take_while(|&&b| (b as char).is_digit(radix))
        .count();
    if digits == 0 {
        return None;
    }

    let end = start + digits;
    let code = s[start..end].chars().fold(0u32, |acc, c| {
        acc.saturating_mul(radix)
            .saturating_add(c.to_digit(radix).unwrap_or(0))
    });
    out.push(numeric_char(code));

    let terminated = bytes.get(end) == Some(&b';');
    Some(end + usize::from(terminated))
}

fn numeric_char(code: u32) -> char {
    match code {
        0x80..=0x9F => WINDOWS_1252_C1[(code - 0x80) as usize],
        0 => char::REPLACEMENT_CHARACTER,
        // Surrogates and anything past U+10FFFF
        _ => char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER),
    }
}

/// Decodes an entity name after `&`, returning how many bytes were used.
fn decode_named(s: &str, out: &mut String) -> Option<usize> {
    let name_len = s.bytes().take_while(u8::is_ascii_alphanumeric).count();
    if name_len == 0 {
        return None;
    }
    let name = &s[..name_len];
    let terminated = s.as_bytes().get(name_len) == Some(&b';');

    let whole = if terminated {
        resolve_html5_entity(name).map(|text| (text, name_len + 1))
    } else {
        resolve_legacy(name).map(|text| (text, name_len))
    };

    // Legacy entities may run straight into the following text: `&copy2024`
    let longest = if terminated { name_len } else { name_len - 1 };
    let (text, used) = whole.or_else(|| {
        (2..=longest.min(LONGEST_LEGACY_ENTITY))
            .rev()
            .find_map(|len| resolve_legacy(&name[..len]).map(|text| (text, len)))
    })?;
    out.push_str(text);
    Some(used)
}

fn resolve_legacy(name: &str) -> Option<&'static str> {
    if LEGACY_ENTITIES.binary_search(&name).is_ok() {
        resolve_html5_entity(name)
    } else {
        None
    }
}

const LONGEST_LEGACY_ENTITY: usize = 6;

/// Entities that HTML accepts without a terminating `;`, in byte order.
const LEGACY_ENTITIES: &[&str] = &[
    "AElig", "AMP", "Aacute", "Acirc", "Agrave", "Aring", "Atilde", "Auml", "COPY", "Ccedil",
    "ETH", "Eacute", "Ecirc", "Egrave", "Euml", "GT", "Iacute", "Icirc", "Igrave", "Iuml", "LT",
    "Ntilde", "Oacute", "Ocirc", "Ograve", "Oslash", "Otilde", "Ouml", "QUOT", "REG", "THORN",
    "Uacute", "Ucirc", "Ugrave", "Uuml", "Yacute", "aacute", "acirc", "acute", "aelig",
    "agrave", "amp", "aring", "atilde", "auml", "brvbar", "ccedil", "cedil", "cent", "copy",
    "curren", "deg", "divide", "eacute", "ecirc", "egrave", "eth", "euml", "frac12", "frac14",
    "frac34", "gt", "iacute", "icirc", "iexcl", "igrave", "iquest", "iuml", "laquo", "lt",
    "macr", "micro", "middot", "nbsp", "not", "ntilde", "oacute", "ocirc", "ograve", "ordf",
    "ordm", "oslash", "otilde", "ouml", "para", "plusmn", "pound", "quot", "raquo", "reg",
    "sect", "shy", "sup1", "sup2", "sup3", "szlig", "thorn", "times", "uacute", "ucirc",
    "ugrave", "uml", "uuml", "yacute", "yen", "yuml",
];

/// `&#128;` through `&#159;` name Windows-1252 characters, not C1 controls.
const WINDOWS_1252_C1: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

fn root_element(bytes: &[u8]) -> Result<String, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Event::Eof => return Err(ParseError::Empty),
            _ => {}
        }
        buf.clear();
    }
}
