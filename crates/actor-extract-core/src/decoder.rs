//! Entry decoding: raw member bytes to actor values.
//!
//! Member files come from heterogeneous sources, so decoding is a cascade
//! over a fixed list of text encodings and, for each decoded text, a fixed
//! list of parse strategies. The first (encoding, strategy) pair that yields
//! at least one actor wins. The orders below are part of the contract:
//! bytes that decode under several encodings always resolve the same way.
//!
//! | Order | Encoding       | Notes                                   |
//! |-------|----------------|-----------------------------------------|
//! | 1     | UTF-8          | leading BOM stripped                    |
//! | 2     | windows-1252   | `latin-1` / `iso-8859-1`; never fails   |
//! | 3     | UTF-16LE       | leading BOM stripped                    |
//! | 4     | UTF-16BE       | leading BOM stripped                    |
//!
//! Strategies, per decoded text: whole document, line-delimited,
//! concatenated stream.
//!
//! Decoding never fails. An entry that yields nothing produces an empty
//! actor list, and its [`EntryStatus`] records why.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// UTF-8 BOM: EF BB BF
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
/// UTF-16 LE BOM: FF FE
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
/// UTF-16 BE BOM: FE FF
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Key holding the actor sub-record inside an event object.
pub const ACTOR_KEY: &str = "actor";

/// Text encodings tried by the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextEncoding {
    #[serde(rename = "UTF-8")]
    Utf8,
    #[serde(rename = "windows-1252")]
    Windows1252,
    #[serde(rename = "UTF-16LE")]
    Utf16Le,
    #[serde(rename = "UTF-16BE")]
    Utf16Be,
}

/// Encodings in the order they are tried.
pub const ENCODING_ORDER: [TextEncoding; 4] = [
    TextEncoding::Utf8,
    TextEncoding::Windows1252,
    TextEncoding::Utf16Le,
    TextEncoding::Utf16Be,
];

impl TextEncoding {
    #[must_use]
    pub fn name(self) -> &'static str {
        self.encoding().name()
    }

    fn encoding(self) -> &'static Encoding {
        match self {
            Self::Utf8 => UTF_8,
            Self::Windows1252 => WINDOWS_1252,
            Self::Utf16Le => UTF_16LE,
            Self::Utf16Be => UTF_16BE,
        }
    }

    fn bom(self) -> Option<&'static [u8]> {
        match self {
            Self::Utf8 => Some(UTF8_BOM),
            Self::Windows1252 => None,
            Self::Utf16Le => Some(UTF16_LE_BOM),
            Self::Utf16Be => Some(UTF16_BE_BOM),
        }
    }

    /// Strictly decode `bytes`, returning `None` on any malformed sequence.
    ///
    /// A BOM matching this encoding is stripped first.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Option<Cow<'_, str>> {
        let data = self
            .bom()
            .and_then(|bom| bytes.strip_prefix(bom))
            .unwrap_or(bytes);
        self.encoding()
            .decode_without_bom_handling_and_without_replacement(data)
    }
}

/// Ways of splitting decoded text into events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    /// The text is one JSON value; an array is a list of events
    WholeDocument,
    /// One event per non-blank line; bad lines are skipped
    LineDelimited,
    /// JSON values back to back, read until the first malformed one
    ConcatenatedStream,
}

/// Strategies in the order they are tried for each decoded text.
pub const STRATEGY_ORDER: [ParseStrategy; 3] = [
    ParseStrategy::WholeDocument,
    ParseStrategy::LineDelimited,
    ParseStrategy::ConcatenatedStream,
];

impl ParseStrategy {
    /// Parse `text` into events, or `None` if this strategy does not apply.
    #[must_use]
    pub fn parse(self, text: &str) -> Option<Vec<Value>> {
        match self {
            Self::WholeDocument => parse_whole_document(text),
            Self::LineDelimited => parse_line_delimited(text),
            Self::ConcatenatedStream => parse_concatenated(text),
        }
    }
}

fn parse_whole_document(text: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Array(events) => Some(events),
        event => Some(vec![event]),
    }
}

fn parse_line_delimited(text: &str) -> Option<Vec<Value>> {
    let events: Vec<Value> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();
    (!events.is_empty()).then_some(events)
}

fn parse_concatenated(text: &str) -> Option<Vec<Value>> {
    let events: Vec<Value> = serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .map_while(Result::ok)
        .collect();
    (!events.is_empty()).then_some(events)
}

/// Pull the actor out of every event object that has one.
///
/// Actors are passed through untouched, `null` included.
#[must_use]
pub fn extract_actors(events: Vec<Value>) -> Vec<Value> {
    events
        .into_iter()
        .filter_map(|event| match event {
            Value::Object(mut fields) => fields.remove(ACTOR_KEY),
            _ => None,
        })
        .collect()
}

/// Why an entry produced the actors it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    /// Actors found using this encoding and strategy
    Extracted {
        encoding: TextEncoding,
        strategy: ParseStrategy,
    },
    /// Events parsed, but none carried an actor
    NoActors,
    /// Entry was empty or whitespace
    Empty,
    /// No encoding and strategy produced any event
    Unparseable,
    /// Entry was an archive whose inner member could not be used
    NestedArchiveRejected { reason: String },
    /// Decoding hit an unexpected fault
    Fault { message: String },
}

/// Decoder output for one entry
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutcome {
    pub actors: Vec<Value>,
    pub status: EntryStatus,
}

impl DecodeOutcome {
    fn without_actors(status: EntryStatus) -> Self {
        Self {
            actors: Vec::new(),
            status,
        }
    }
}

/// Decode one entry's bytes into its actors.
///
/// Nested archives are unwrapped during validation, so `bytes` is always
/// the text to decode.
pub fn decode_entry(name: &str, bytes: &[u8]) -> DecodeOutcome {
    debug!("Decoding entry {name} ({} bytes)", bytes.len());

    if bytes.iter().all(u8::is_ascii_whitespace) {
        debug!("Entry {name} is empty");
        return DecodeOutcome::without_actors(EntryStatus::Empty);
    }

    let mut saw_events = false;
    for encoding in ENCODING_ORDER {
        let Some(text) = encoding.decode(bytes) else {
            debug!("Entry {name}: not valid {}", encoding.name());
            continue;
        };

        for strategy in STRATEGY_ORDER {
            let Some(events) = strategy.parse(&text) else {
                debug!("Entry {name}: {strategy:?} found no events as {}", encoding.name());
                continue;
            };
            saw_events = true;

            let actors = extract_actors(events);
            if !actors.is_empty() {
                debug!(
                    "Entry {name}: {} actors via {} / {strategy:?}",
                    actors.len(),
                    encoding.name()
                );
                return DecodeOutcome {
                    actors,
                    status: EntryStatus::Extracted { encoding, strategy },
                };
            }
        }
    }

    if saw_events {
        debug!("Entry {name} has events but no actors");
        DecodeOutcome::without_actors(EntryStatus::NoActors)
    } else {
        warn!("Could not parse JSON entry: {name}");
        DecodeOutcome::without_actors(EntryStatus::Unparseable)
    }
}
