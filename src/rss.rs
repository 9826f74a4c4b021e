//! Writes the RSS 2.0 feed of the most recently published records.

use crate::record::PostRecord;
use crate::sitemap::{text_element, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::Write;

pub struct Channel<'a> {
    pub title: &'a str,
    pub link: &'a str,
    pub description: &'a str,
}

/// The `limit` most recently published records, newest first. Ties keep
/// record list order.
pub fn most_recent(records: &[PostRecord], limit: usize) -> Vec<&PostRecord> {
    let mut recent: Vec<&PostRecord> = records.iter().collect();
    recent.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    recent.truncate(limit);
    recent
}

pub fn write_rss<W: Write>(channel: &Channel, items: &[&PostRecord], w: W) -> Result<()> {
    let mut writer = Writer::new_with_indent(w, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("rss").with_attributes([("version", "2.0")]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;
    text_element(&mut writer, "title", channel.title)?;
    text_element(&mut writer, "link", channel.link)?;
    text_element(&mut writer, "description", channel.description)?;
    for record in items {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        text_element(&mut writer, "title", &record.title)?;
        text_element(&mut writer, "link", &record.url)?;
        text_element(&mut writer, "guid", &record.url)?;
        text_element(&mut writer, "description", &record.description)?;
        text_element(&mut writer, "pubDate", &record.published_at.to_rfc2822())?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;
    Ok(())
}
