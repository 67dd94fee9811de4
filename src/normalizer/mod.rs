pub mod dates;

use chrono::{DateTime, FixedOffset, Utc};
use html_escape::decode_html_entities;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::app::{GatorError, Result};
use crate::domain::NewPost;

pub use dates::DateLayouts;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channel {
    pub title: String,
    pub description: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    /// `pubDate` exactly as found in the document.
    pub pub_date: String,
    pub published_at: Option<DateTime<FixedOffset>>,
}

impl FeedItem {
    pub fn to_new_post(&self, feed_id: i64) -> NewPost {
        NewPost {
            feed_id,
            title: self.title.clone(),
            url: self.link.clone(),
            description: Some(self.description.clone()),
            published_at: self.published_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// One decoded fetch: the channel header plus its items in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeedDocument {
    pub channel: Channel,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ChannelTitle,
    ChannelDescription,
    ChannelLink,
    ItemTitle,
    ItemLink,
    ItemDescription,
    ItemPubDate,
}

#[derive(Clone, Default)]
pub struct Normalizer {
    layouts: DateLayouts,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layouts(layouts: DateLayouts) -> Self {
        Self { layouts }
    }

    pub fn layouts(&self) -> &DateLayouts {
        &self.layouts
    }

    pub fn normalize(&self, body: &[u8]) -> Result<RawFeedDocument> {
        let mut doc = decode(body)?;

        doc.channel.title = decode_html_entities(&doc.channel.title).into_owned();
        doc.channel.description = decode_html_entities(&doc.channel.description).into_owned();

        for item in &mut doc.items {
            item.title = decode_html_entities(&item.title).into_owned();
            item.description = decode_html_entities(&item.description).into_owned();
            item.published_at = self.layouts.parse(&item.pub_date);
        }

        Ok(doc)
    }
}

/// Stream the XML into the channel/item shape. Namespaced elements such as
/// `atom:link` are ignored.
fn decode(body: &[u8]) -> Result<RawFeedDocument> {
    let mut reader = Reader::from_reader(body);

    let mut doc = RawFeedDocument::default();
    let mut path: Vec<String> = Vec::new();
    let mut seen_root = false;
    let mut current_item: Option<FeedItem> = None;
    let mut current_field: Option<Field> = None;
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if path.is_empty() {
                    if seen_root {
                        return Err(GatorError::Decode("multiple root elements".into()));
                    }
                    seen_root = true;
                }

                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                path.push(name);

                if current_item.is_none() && is_item_path(&path) {
                    current_item = Some(FeedItem::default());
                } else if current_field.is_none() {
                    current_field = field_for(&path, current_item.is_some());
                    text.clear();
                }
            }
            Ok(Event::Empty(_)) => {
                if path.is_empty() {
                    if seen_root {
                        return Err(GatorError::Decode("multiple root elements".into()));
                    }
                    seen_root = true;
                }
            }
            Ok(Event::End(_)) => {
                if let Some(field) = current_field {
                    if field_for(&path, current_item.is_some()) == Some(field) {
                        assign(&mut doc, current_item.as_mut(), field, text.trim());
                        current_field = None;
                        text.clear();
                    }
                }

                if current_item.is_some() && is_item_path(&path) {
                    if let Some(item) = current_item.take() {
                        doc.items.push(item);
                    }
                }

                path.pop();
            }
            Ok(Event::Text(e)) => {
                if current_field.is_some() {
                    match e.unescape() {
                        Ok(unescaped) => text.push_str(&unescaped),
                        // Leave unknown entities for the HTML pass.
                        Err(_) => text.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if current_field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(GatorError::Decode(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(GatorError::Decode("no root element".into()));
    }
    if !path.is_empty() {
        return Err(GatorError::Decode(format!(
            "unexpected end of document inside <{}>",
            path.join("><")
        )));
    }

    Ok(doc)
}

fn is_item_path(path: &[String]) -> bool {
    matches!(path, [_, channel, item] if channel == "channel" && item == "item")
}

fn field_for(path: &[String], in_item: bool) -> Option<Field> {
    match path {
        [_, channel, item, field] if in_item && channel == "channel" && item == "item" => {
            match field.as_str() {
                "title" => Some(Field::ItemTitle),
                "link" => Some(Field::ItemLink),
                "description" => Some(Field::ItemDescription),
                "pubDate" => Some(Field::ItemPubDate),
                _ => None,
            }
        }
        [_, channel, field] if !in_item && channel == "channel" => match field.as_str() {
            "title" => Some(Field::ChannelTitle),
            "description" => Some(Field::ChannelDescription),
            "link" => Some(Field::ChannelLink),
            _ => None,
        },
        _ => None,
    }
}

fn assign(doc: &mut RawFeedDocument, item: Option<&mut FeedItem>, field: Field, value: &str) {
    let value = value.to_string();
    match (field, item) {
        (Field::ChannelTitle, _) => doc.channel.title = value,
        (Field::ChannelDescription, _) => doc.channel.description = value,
        (Field::ChannelLink, _) => doc.channel.link = value,
        (Field::ItemTitle, Some(item)) => item.title = value,
        (Field::ItemLink, Some(item)) => item.link = value,
        (Field::ItemDescription, Some(item)) => item.description = value,
        (Field::ItemPubDate, Some(item)) => item.pub_date = value,
        _ => {}
    }
}
