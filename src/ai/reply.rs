//! Decoding of the machine parseable replies the backend is asked to
//! produce. Backend output is untrusted so the default extractor
//! tolerates prose around the object instead of requiring the reply
//! to be exactly one JSON object.
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Every reply the backend is allowed to send. Only constructed by a
/// `ReplyExtractor` after validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "contents", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StructuredReply {
    Intro(String),
    FollowUp(String),
    ConstraintSummary(String),
    Finished(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyKind {
    Intro,
    FollowUp,
    ConstraintSummary,
    Finished,
}

impl ReplyKind {
    pub const ALL: [ReplyKind; 4] = [
        ReplyKind::Intro,
        ReplyKind::FollowUp,
        ReplyKind::ConstraintSummary,
        ReplyKind::Finished,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyKind::Intro => "INTRO",
            ReplyKind::FollowUp => "FOLLOW_UP",
            ReplyKind::ConstraintSummary => "CONSTRAINT_SUMMARY",
            ReplyKind::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplyKind {
    type Err = MalformedReply;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReplyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| MalformedReply::UnknownKind(s.to_string()))
    }
}

impl StructuredReply {
    pub fn new(kind: ReplyKind, contents: String) -> Self {
        match kind {
            ReplyKind::Intro => StructuredReply::Intro(contents),
            ReplyKind::FollowUp => StructuredReply::FollowUp(contents),
            ReplyKind::ConstraintSummary => StructuredReply::ConstraintSummary(contents),
            ReplyKind::Finished => StructuredReply::Finished(contents),
        }
    }

    pub fn kind(&self) -> ReplyKind {
        match self {
            StructuredReply::Intro(_) => ReplyKind::Intro,
            StructuredReply::FollowUp(_) => ReplyKind::FollowUp,
            StructuredReply::ConstraintSummary(_) => ReplyKind::ConstraintSummary,
            StructuredReply::Finished(_) => ReplyKind::Finished,
        }
    }

    pub fn contents(&self) -> &str {
        match self {
            StructuredReply::Intro(c)
            | StructuredReply::FollowUp(c)
            | StructuredReply::ConstraintSummary(c)
            | StructuredReply::Finished(c) => c,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MalformedReply {
    #[error("No reply object found in response")]
    NotFound,
    #[error("Reply object could not be decoded: {0}")]
    Invalid(String),
    #[error("Unrecognized reply kind: {0}")]
    UnknownKind(String),
    #[error("Reply object is missing the `{0}` field")]
    MissingField(&'static str),
}

/// Turns raw backend text into a `StructuredReply`. Swapping the
/// extractor changes how forgiving the session is without touching
/// the conversation logic.
pub trait ReplyExtractor: Send + Sync {
    fn parse(&self, raw: &str) -> Result<StructuredReply, MalformedReply>;
}

/// Finds the first object embedded anywhere in the text that has the
/// reply shape.
#[derive(Clone, Copy, Debug, Default)]
pub struct LenientExtractor;

/// Requires the entire reply to be the object, ignoring surrounding
/// whitespace. Useful with backends that enforce JSON output.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrictExtractor;

// An opening brace followed by a quoted key is where an object can
// start. Braces inside prose ("{like this}") never match.
static OBJECT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{\s*""#).expect("Invalid object start pattern"));

// Earlier prompt revisions asked for `type` instead of `kind`
const KIND_FIELDS: [&str; 2] = ["kind", "type"];

impl ReplyExtractor for LenientExtractor {
    fn parse(&self, raw: &str) -> Result<StructuredReply, MalformedReply> {
        let mut first_error = None;

        for start in OBJECT_START.find_iter(raw).map(|m| m.start()) {
            let Some(object) = leading_object(&raw[start..]) else {
                continue;
            };
            match reply_from_object(&object) {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        Err(first_error.unwrap_or(MalformedReply::NotFound))
    }
}

impl ReplyExtractor for StrictExtractor {
    fn parse(&self, raw: &str) -> Result<StructuredReply, MalformedReply> {
        let value: Value = serde_json::from_str(raw.trim())
            .map_err(|e| MalformedReply::Invalid(e.to_string()))?;
        match value {
            Value::Object(object) => reply_from_object(&object),
            _ => Err(MalformedReply::NotFound),
        }
    }
}

/// Parse the leniently extracted reply using the default extractor.
pub fn parse(raw: &str) -> Result<StructuredReply, MalformedReply> {
    LenientExtractor.parse(raw)
}

// Decode the JSON object at the very beginning of `text`, ignoring
// anything that follows it.
fn leading_object(text: &str) -> Option<Map<String, Value>> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    match stream.next() {
        Some(Ok(Value::Object(object))) => Some(object),
        _ => None,
    }
}

fn reply_from_object(object: &Map<String, Value>) -> Result<StructuredReply, MalformedReply> {
    let kind = KIND_FIELDS
        .iter()
        .find_map(|field| object.get(*field))
        .ok_or(MalformedReply::MissingField("kind"))?;
    let kind = match kind {
        Value::String(s) => s.parse::<ReplyKind>()?,
        other => return Err(MalformedReply::UnknownKind(other.to_string())),
    };
    let contents = object
        .get("contents")
        .filter(|contents| !contents.is_null())
        .ok_or(MalformedReply::MissingField("contents"))?;

    Ok(StructuredReply::new(kind, flatten(contents)))
}

// Downstream only ever deals with plain text so nested values are
// kept in their serialized form.
fn flatten(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
