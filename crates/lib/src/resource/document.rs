//! Android `values` resource documents.
//!
//! A [`ResourceDocument`] keeps the full event stream of the parsed XML so that
//! writing it back only changes the `<string>` entries that were edited.
//! Comments, the declaration, and whitespace survive untouched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;
use tracing::debug;

const STRING_TAG: &str = "string";
const NAME_ATTR: &str = "name";
const ENTRY_INDENT: &str = "    ";

#[derive(Debug, Error)]
pub enum DocumentError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("malformed resource document at byte {position}: {message}")]
  Malformed { position: u64, message: String },

  #[error("resource document has no root element")]
  NoRoot,

  #[error("missing required key '{0}'")]
  MissingKey(String),

  #[error("failed to serialize resource document: {0}")]
  Serialize(String),
}

/// Location of a `<string>` entry inside the event stream.
enum Entry {
  /// `<string name="..."/>`
  Empty { index: usize, tag: BytesStart<'static> },
  /// `<string name="...">...</string>`, `end` is the index of the closing tag.
  Element { start: usize, end: usize },
}

/// An Android resource document addressed by `<string name="key">` entries.
#[derive(Debug, Clone)]
pub struct ResourceDocument {
  events: Vec<Event<'static>>,
}

impl ResourceDocument {
  /// Parse a document from its XML source.
  ///
  /// Fails on ill-formed XML, unclosed elements, multiple roots, or a missing root.
  pub fn parse(source: &str) -> Result<Self, DocumentError> {
    let mut reader = Reader::from_str(source);
    let mut events = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
      let event = reader.read_event().map_err(|e| DocumentError::Malformed {
        position: reader.error_position() as u64,
        message: e.to_string(),
      })?;

      match &event {
        Event::Start(_) | Event::Empty(_) if depth == 0 => {
          if saw_root {
            return Err(DocumentError::Malformed {
              position: reader.buffer_position() as u64,
              message: "multiple root elements".to_string(),
            });
          }
          saw_root = true;
        }
        Event::Eof => break,
        _ => {}
      }

      match &event {
        Event::Start(_) => depth += 1,
        Event::End(_) => depth = depth.saturating_sub(1),
        _ => {}
      }

      events.push(event.into_owned());
    }

    if depth != 0 {
      return Err(DocumentError::Malformed {
        position: reader.buffer_position() as u64,
        message: format!("{} unclosed element(s) at end of input", depth),
      });
    }
    if !saw_root {
      return Err(DocumentError::NoRoot);
    }

    Ok(Self { events })
  }

  /// Read and parse a document from disk.
  pub fn load(path: &Path) -> Result<Self, DocumentError> {
    let source = fs::read_to_string(path).map_err(|source| DocumentError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    debug!(path = ?path, "parsing resource document");
    Self::parse(&source)
  }

  /// Value of the `<string>` entry named `key`, if present.
  pub fn get(&self, key: &str) -> Option<String> {
    match self.find(key)? {
      Entry::Empty { .. } => Some(String::new()),
      Entry::Element { start, end } => Some(self.text_between(start, end)),
    }
  }

  /// Whether an entry named `key` exists.
  pub fn contains(&self, key: &str) -> bool {
    self.find(key).is_some()
  }

  /// All `<string>` entries in document order.
  pub fn entries(&self) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (index, event) in self.events.iter().enumerate() {
      let (tag, is_empty) = match event {
        Event::Start(tag) => (tag, false),
        Event::Empty(tag) => (tag, true),
        _ => continue,
      };
      if tag.name().as_ref() != STRING_TAG.as_bytes() {
        continue;
      }
      let Some(key) = name_of(tag) else { continue };
      let value = if is_empty {
        String::new()
      } else {
        match self.closing_index(index) {
          Some(end) => self.text_between(index, end),
          None => continue,
        }
      };
      out.push((key, value));
    }
    out
  }

  /// Replace the value of an existing entry.
  ///
  /// Returns [`DocumentError::MissingKey`] when no entry named `key` exists.
  pub fn set(&mut self, key: &str, value: &str) -> Result<(), DocumentError> {
    match self.find(key) {
      None => Err(DocumentError::MissingKey(key.to_string())),
      Some(Entry::Element { start, end }) => {
        self.events.splice(start + 1..end, [text(value)]);
        Ok(())
      }
      Some(Entry::Empty { index, tag }) => {
        self.events.splice(
          index..=index,
          [Event::Start(tag), text(value), Event::End(BytesEnd::new(STRING_TAG))],
        );
        Ok(())
      }
    }
  }

  /// Replace the value of an entry, appending a new entry to the root when absent.
  pub fn upsert(&mut self, key: &str, value: &str) -> Result<(), DocumentError> {
    if self.contains(key) {
      return self.set(key, value);
    }

    let entry = [
      text(ENTRY_INDENT),
      Event::Start(BytesStart::new(STRING_TAG).with_attributes([(NAME_ATTR, key)]).into_owned()),
      text(value),
      Event::End(BytesEnd::new(STRING_TAG)),
      text("\n"),
    ];

    // The root closes with the last End event; an empty root is expanded first.
    if let Some(root_end) = self.events.iter().rposition(|e| matches!(e, Event::End(_))) {
      self.events.splice(root_end..root_end, entry);
      return Ok(());
    }

    let root = self
      .events
      .iter()
      .position(|e| matches!(e, Event::Empty(_)))
      .ok_or(DocumentError::NoRoot)?;
    let Event::Empty(tag) = self.events[root].clone() else {
      return Err(DocumentError::NoRoot);
    };
    let end = BytesEnd::new(String::from_utf8_lossy(tag.name().as_ref()).into_owned());
    let mut replacement = vec![Event::Start(tag), text("\n")];
    replacement.extend(entry);
    replacement.push(Event::End(end));
    self.events.splice(root..=root, replacement);
    Ok(())
  }

  /// Serialize the document back to XML.
  pub fn to_xml(&self) -> Result<String, DocumentError> {
    let mut writer = Writer::new(Vec::new());
    for event in &self.events {
      writer
        .write_event(event.borrow())
        .map_err(|e| DocumentError::Serialize(e.to_string()))?;
    }
    String::from_utf8(writer.into_inner()).map_err(|e| DocumentError::Serialize(e.to_string()))
  }

  /// Serialize and write the document to `path`.
  pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
    let xml = self.to_xml()?;
    fs::write(path, xml).map_err(|source| DocumentError::Write {
      path: path.to_path_buf(),
      source,
    })
  }

  fn find(&self, key: &str) -> Option<Entry> {
    for (index, event) in self.events.iter().enumerate() {
      match event {
        Event::Start(tag) if is_entry(tag, key) => {
          let end = self.closing_index(index)?;
          return Some(Entry::Element { start: index, end });
        }
        Event::Empty(tag) if is_entry(tag, key) => {
          return Some(Entry::Empty {
            index,
            tag: tag.clone().into_owned(),
          });
        }
        _ => {}
      }
    }
    None
  }

  fn closing_index(&self, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, event) in self.events[start + 1..].iter().enumerate() {
      match event {
        Event::Start(_) => depth += 1,
        Event::End(_) if depth == 0 => return Some(start + 1 + offset),
        Event::End(_) => depth -= 1,
        _ => {}
      }
    }
    None
  }

  fn text_between(&self, start: usize, end: usize) -> String {
    let mut value = String::new();
    for event in &self.events[start + 1..end] {
      match event {
        Event::Text(t) => match t.unescape() {
          Ok(s) => value.push_str(&s),
          Err(_) => value.push_str(&String::from_utf8_lossy(t)),
        },
        Event::CData(c) => value.push_str(&String::from_utf8_lossy(&c.clone().into_inner())),
        _ => {}
      }
    }
    value
  }
}

fn is_entry(tag: &BytesStart<'_>, key: &str) -> bool {
  tag.name().as_ref() == STRING_TAG.as_bytes() && name_of(tag).as_deref() == Some(key)
}

fn name_of(tag: &BytesStart<'_>) -> Option<String> {
  let attr = tag.try_get_attribute(NAME_ATTR).ok()??;
  attr.unescape_value().ok().map(|v| v.into_owned())
}

fn text(value: &str) -> Event<'static> {
  Event::Text(BytesText::new(value).into_owned())
}
