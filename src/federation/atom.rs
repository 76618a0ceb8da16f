//! Atom feed rendering and parsing.
//!
//! Uses `quick-xml`'s writer API for generation and an event-loop reader
//! for parsing pushed payloads. The rendered structure is what external
//! OStatus hubs re-fetch, so the element layout here is load-bearing for
//! interoperability: feed-level `link rel="self"` and `link rel="hub"`,
//! one `<entry>` per update in reverse-chronological order.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::AppError;

pub const NS_ATOM: &str = "http://www.w3.org/2005/Atom";

/// One Atom entry as carried on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Globally unique entry id, stable across re-renders
    pub entry_id: String,
    /// Author name; empty when the entry carries none
    pub author_name: String,
    /// Text content
    pub text: String,
    /// Published (or updated, when published is absent) timestamp
    pub published_at: DateTime<Utc>,
}

/// Everything needed to render a feed document.
#[derive(Debug, Clone)]
pub struct FeedDocument {
    /// Canonical feed URL (`link rel="self"` and feed id)
    pub url: String,
    /// Feed title (the author's username)
    pub title: String,
    /// Feed-level updated timestamp
    pub updated: DateTime<Utc>,
    /// Registered hub endpoints (`link rel="hub"`)
    pub hubs: Vec<String>,
    /// Entries, most recent first
    pub entries: Vec<Entry>,
}

/// Render a feed document to Atom XML.
pub fn render(doc: &FeedDocument) -> String {
    let cursor = Cursor::new(Vec::new());
    let mut writer = Writer::new(cursor);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .unwrap();

    let mut feed = BytesStart::new("feed");
    feed.push_attribute(("xmlns", NS_ATOM));
    writer.write_event(Event::Start(feed)).unwrap();

    write_text_elem(&mut writer, "id", &doc.url);
    write_text_elem(&mut writer, "title", &doc.title);
    write_text_elem(&mut writer, "updated", &doc.updated.to_rfc3339());

    write_link(&mut writer, "self", &doc.url);
    for hub in &doc.hubs {
        write_link(&mut writer, "hub", hub);
    }

    for entry in &doc.entries {
        write_entry(&mut writer, entry);
    }

    writer
        .write_event(Event::End(BytesEnd::new("feed")))
        .unwrap();

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).expect("writer output is UTF-8")
}

fn write_entry(w: &mut Writer<Cursor<Vec<u8>>>, entry: &Entry) {
    w.write_event(Event::Start(BytesStart::new("entry"))).unwrap();

    write_text_elem(w, "id", &entry.entry_id);
    write_text_elem(w, "title", &entry.text);

    w.write_event(Event::Start(BytesStart::new("author"))).unwrap();
    write_text_elem(w, "name", &entry.author_name);
    w.write_event(Event::End(BytesEnd::new("author"))).unwrap();

    let published = entry.published_at.to_rfc3339();
    write_text_elem(w, "published", &published);
    write_text_elem(w, "updated", &published);

    let mut content = BytesStart::new("content");
    content.push_attribute(("type", "text"));
    w.write_event(Event::Start(content)).unwrap();
    w.write_event(Event::Text(BytesText::new(&entry.text)))
        .unwrap();
    w.write_event(Event::End(BytesEnd::new("content"))).unwrap();

    w.write_event(Event::End(BytesEnd::new("entry"))).unwrap();
}

// Writes to the in-memory cursor cannot fail.
fn write_text_elem(w: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) {
    w.write_event(Event::Start(BytesStart::new(tag))).unwrap();
    w.write_event(Event::Text(BytesText::new(text))).unwrap();
    w.write_event(Event::End(BytesEnd::new(tag))).unwrap();
}

fn write_link(w: &mut Writer<Cursor<Vec<u8>>>, rel: &str, href: &str) {
    let mut link = BytesStart::new("link");
    link.push_attribute(("rel", rel));
    link.push_attribute(("href", href));
    w.write_event(Event::Empty(link)).unwrap();
}

/// Parse an Atom document into its entries, in document order.
///
/// # Errors
/// `MalformedDocument` when the input is not well-formed XML or an entry
/// lacks an id or a timestamp.
pub fn parse(document: &[u8]) -> Result<Vec<Entry>, AppError> {
    let mut reader = quick_xml::Reader::from_reader(document);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();

    // quick-xml does not flag unclosed tags at EOF, so track depth ourselves.
    let mut depth: usize = 0;
    let mut saw_root = false;

    let mut in_entry = false;
    let mut in_author = false;
    let mut current_field: Option<Field> = None;

    let mut entry_id: Option<String> = None;
    let mut author_name: Option<String> = None;
    let mut text = String::new();
    let mut published: Option<String> = None;
    let mut updated: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                saw_root = true;
                let name_buf = e.name();
                match local_name(name_buf.as_ref()) {
                    b"entry" => {
                        in_entry = true;
                        entry_id = None;
                        author_name = None;
                        text = String::new();
                        published = None;
                        updated = None;
                    }
                    b"author" if in_entry => in_author = true,
                    b"id" if in_entry && !in_author => current_field = Some(Field::Id),
                    b"name" if in_author => current_field = Some(Field::AuthorName),
                    b"content" if in_entry => current_field = Some(Field::Content),
                    b"published" if in_entry => current_field = Some(Field::Published),
                    b"updated" if in_entry && !in_author => current_field = Some(Field::Updated),
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(field) = current_field {
                    let value = e
                        .unescape()
                        .map_err(|e| AppError::MalformedDocument(e.to_string()))?
                        .into_owned();
                    match field {
                        Field::Id => entry_id = Some(value),
                        Field::AuthorName => author_name = Some(value),
                        Field::Content => text = value,
                        Field::Published => published = Some(value),
                        Field::Updated => updated = Some(value),
                    }
                }
            }
            Ok(Event::Empty(_)) => saw_root = true,
            Ok(Event::CData(ref e)) => {
                if let Some(Field::Content) = current_field {
                    text = String::from_utf8_lossy(e).into_owned();
                }
            }
            Ok(Event::End(ref e)) => {
                depth = depth.saturating_sub(1);
                let name_buf = e.name();
                match local_name(name_buf.as_ref()) {
                    b"entry" => {
                        entries.push(finish_entry(
                            entry_id.take(),
                            author_name.take(),
                            std::mem::take(&mut text),
                            published.take(),
                            updated.take(),
                        )?);
                        in_entry = false;
                    }
                    b"author" => in_author = false,
                    _ => current_field = None,
                }
            }
            Ok(Event::Eof) => {
                if depth != 0 {
                    return Err(AppError::MalformedDocument(
                        "unexpected end of document".to_string(),
                    ));
                }
                break;
            }
            Err(e) => return Err(AppError::MalformedDocument(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(AppError::MalformedDocument(
            "document has no root element".to_string(),
        ));
    }

    Ok(entries)
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Id,
    AuthorName,
    Content,
    Published,
    Updated,
}

fn local_name(name: &[u8]) -> &[u8] {
    // strip "prefix:" if present
    if let Some(pos) = name.iter().rposition(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

fn finish_entry(
    entry_id: Option<String>,
    author_name: Option<String>,
    text: String,
    published: Option<String>,
    updated: Option<String>,
) -> Result<Entry, AppError> {
    let entry_id = entry_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::MalformedDocument("entry is missing an id".to_string()))?;

    // Published wins; updated stands in for feeds that only carry one.
    let timestamp = published.or(updated).ok_or_else(|| {
        AppError::MalformedDocument(format!("entry {} is missing a timestamp", entry_id))
    })?;
    let published_at = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|e| {
            AppError::MalformedDocument(format!("entry {}: bad timestamp: {}", entry_id, e))
        })?
        .with_timezone(&Utc);

    Ok(Entry {
        entry_id,
        author_name: author_name.unwrap_or_default(),
        text,
        published_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, author: &str, text: &str, ts: DateTime<Utc>) -> Entry {
        Entry {
            entry_id: id.to_string(),
            author_name: author.to_string(),
            text: text.to_string(),
            published_at: ts,
        }
    }

    fn sample_doc() -> FeedDocument {
        let t1 = Utc.with_ymd_and_hms(2011, 3, 14, 15, 9, 26).unwrap();
        let t2 = Utc.with_ymd_and_hms(2011, 3, 15, 8, 0, 0).unwrap();
        FeedDocument {
            url: "https://status.example.com/feeds/1.atom".to_string(),
            title: "carol".to_string(),
            updated: t2,
            hubs: vec!["https://hub.example.com/".to_string()],
            entries: vec![
                entry("tag:example.com,2011:update-2", "carol", "second post", t2),
                entry("tag:example.com,2011:update-1", "carol", "first post", t1),
            ],
        }
    }

    #[test]
    fn round_trip_preserves_entries_in_order() {
        let doc = sample_doc();
        let rendered = render(&doc);
        let parsed = parse(rendered.as_bytes()).expect("rendered feed parses");
        assert_eq!(parsed, doc.entries);
    }

    #[test]
    fn render_includes_self_and_hub_links() {
        let rendered = render(&sample_doc());
        assert!(rendered.contains(r#"rel="self" href="https://status.example.com/feeds/1.atom""#));
        assert!(rendered.contains(r#"rel="hub" href="https://hub.example.com/""#));
    }

    #[test]
    fn render_escapes_markup_in_content() {
        let t = Utc.with_ymd_and_hms(2011, 3, 14, 15, 9, 26).unwrap();
        let doc = FeedDocument {
            url: "https://status.example.com/feeds/1.atom".to_string(),
            title: "carol".to_string(),
            updated: t,
            hubs: vec![],
            entries: vec![entry("tag:1", "carol", "tags <b>& such</b>", t)],
        };

        let rendered = render(&doc);
        assert!(!rendered.contains("tags <b>"));

        let parsed = parse(rendered.as_bytes()).expect("escaped feed parses");
        assert_eq!(parsed[0].text, "tags <b>& such</b>");
    }

    #[test]
    fn parse_rejects_truncated_document() {
        let err = parse(b"<feed><entry><id>tag:1</id>").unwrap_err();
        assert!(matches!(err, AppError::MalformedDocument(_)));
    }

    #[test]
    fn parse_rejects_entry_without_id() {
        let doc = br#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <published>2011-03-14T15:09:26+00:00</published>
    <content type="text">no id here</content>
  </entry>
</feed>"#;
        let err = parse(doc).unwrap_err();
        assert!(matches!(err, AppError::MalformedDocument(_)));
    }

    #[test]
    fn parse_rejects_entry_without_timestamp() {
        let doc = br#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>tag:example.com,2011:update-1</id>
    <content type="text">no timestamp</content>
  </entry>
</feed>"#;
        let err = parse(doc).unwrap_err();
        assert!(matches!(err, AppError::MalformedDocument(_)));
    }

    #[test]
    fn parse_accepts_updated_when_published_absent() {
        let doc = br#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>tag:example.com,2011:update-1</id>
    <updated>2011-03-14T15:09:26+00:00</updated>
    <author><name>dave</name></author>
    <content type="text">only updated</content>
  </entry>
</feed>"#;
        let entries = parse(doc).expect("updated-only entry parses");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].author_name, "dave");
        assert_eq!(
            entries[0].published_at,
            Utc.with_ymd_and_hms(2011, 3, 14, 15, 9, 26).unwrap()
        );
    }

    #[test]
    fn parse_ignores_feed_level_elements() {
        let doc = br#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>https://status.example.com/feeds/1.atom</id>
  <title>carol</title>
  <updated>2011-03-15T08:00:00+00:00</updated>
  <entry>
    <id>tag:example.com,2011:update-1</id>
    <published>2011-03-14T15:09:26+00:00</published>
    <content type="text">hello</content>
  </entry>
</feed>"#;
        let entries = parse(doc).expect("feed with header parses");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_id, "tag:example.com,2011:update-1");
    }

    #[test]
    fn parse_not_xml_is_malformed() {
        let err = parse(b"{\"not\": \"xml\"}").unwrap_err();
        assert!(matches!(err, AppError::MalformedDocument(_)));
    }
}
