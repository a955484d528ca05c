//! XML reading utilities for the Office Open XML parts of a workbook
use crate::error::Result;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Loops over the events of an [`XmlReader`], ignoring events no arm matches.
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(event) = $reader.next()? {
            match event {
                $($arms)*
                _ => (),
            }
        }
    };
}

pub(crate) use match_xml_events;

/// Phonetic runs (`<rPh>`) carry reading hints that are not part of the cell text
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");
const TAG_TEXT: QName = QName(b"t");

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute '{0}' value '{1}' failed")]
    ParseAttributeValueError(String, String),
}

/// Event reader over one XML part, reusing a single buffer.
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);
        XmlReader { reader, buffer: Vec::with_capacity(1024) }
    }

    /// Next event, or `None` at the end of the document.
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }

    /// Collects the text up to the closing `end_tag`.
    ///
    /// With `inside_text` set, character data is taken directly (as in `<v>`).
    /// Otherwise only `<t>` runs count (as in `<si>` and `<is>`), skipping phonetic runs.
    pub(crate) fn read_text(&mut self, end_tag: QName, inside_text: bool) -> Result<String> {
        let mut is_phonetic_text = false;
        let mut is_text = inside_text;
        let mut text = String::new();
        match_xml_events!(self => {
            Event::End(event) if event.name() == end_tag => break,
            Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
            Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
            Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
            Event::End(event) if !inside_text && event.name() == TAG_TEXT => is_text = false,
            Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
            Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
            Event::GeneralRef(event) if is_text => push_reference(&mut text, &event)?,
        });
        Ok(text)
    }
}

/// Attribute lookups on start tags.
pub(crate) trait XmlNodeHelper<'a> {
    /// Unescaped value of an attribute, matched by its full (possibly prefixed) name.
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>>;

    /// Parses an attribute value to the specified type.
    fn parse_attribute_value<T: FromStr>(&'a self, name: &str) -> Result<Option<T>>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>> {
        Ok(self
            .try_get_attribute(name)?
            .map(|attribute| attribute.unescape_value())
            .transpose()?)
    }

    fn parse_attribute_value<T: FromStr>(&'a self, name: &str) -> Result<Option<T>> {
        self.get_attribute_value(name)?
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| XmlError::ParseAttributeValueError(name.to_owned(), value.to_string()).into())
            })
            .transpose()
    }
}

/// Appends an entity or character reference such as `&amp;` or `&#x41;`.
fn push_reference(text: &mut String, reference: &BytesRef) -> Result<()> {
    let raw = reference.xml_content()?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16)?,
            None => number.parse::<u32>()?,
        };
        if let Some(character) = char::from_u32(code) {
            text.push(character);
        }
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        text.push_str(entity);
    } else {
        Err(XmlError::ParseEntityError(raw.to_string()))?;
    }
    Ok(())
}
