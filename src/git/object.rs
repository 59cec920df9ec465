//! Value types describing objects, refs and blame origins in a repository.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::RefscopeError;

/// Length in bytes of a SHA-1 object name.
pub const OBJECT_ID_LEN: usize = 20;

/// Length of a full object name in hex.
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;

/// Shortest hex prefix accepted as an abbreviated object id.
pub const MIN_ABBREVIATION_LEN: usize = 4;

/// A 20-byte git object name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// Parse exactly 40 hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`RefscopeError::InvalidObjectId`] for anything else.
    pub fn from_hex(value: &str) -> Result<Self, RefscopeError> {
        if value.len() != OBJECT_ID_HEX_LEN {
            return Err(RefscopeError::InvalidObjectId {
                value: value.to_string(),
            });
        }
        let mut bytes = [0u8; OBJECT_ID_LEN];
        hex::decode_to_slice(value, &mut bytes).map_err(|_| RefscopeError::InvalidObjectId {
            value: value.to_string(),
        })?;
        Ok(Self(bytes))
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Whether `prefix` (lowercase or uppercase hex) abbreviates this id.
    #[must_use]
    pub fn starts_with_hex(&self, prefix: &str) -> bool {
        self.to_hex().starts_with(&prefix.to_ascii_lowercase())
    }
}

/// True when `value` looks like a full or abbreviated hex object id.
#[must_use]
pub fn is_hex_abbreviation(value: &str) -> bool {
    (MIN_ABBREVIATION_LEN..=OBJECT_ID_HEX_LEN).contains(&value.len())
        && value.bytes().all(|b| b.is_ascii_hexdigit())
}

impl FromStr for ObjectId {
    type Err = RefscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_hex(&value).map_err(serde::de::Error::custom)
    }
}

/// Kind of a git object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectKind {
    /// Name used by `git cat-file -t`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }
}

impl FromStr for ObjectKind {
    type Err = RefscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "commit" => Ok(Self::Commit),
            "tree" => Ok(Self::Tree),
            "blob" => Ok(Self::Blob),
            "tag" => Ok(Self::Tag),
            other => Err(RefscopeError::Other {
                message: format!("Unknown object type '{other}'"),
            }),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference and the object it points at.
///
/// `peeled_id` is set for annotated tags and holds the fully peeled target.
/// `target_kind` is the kind of [`Ref::target`] when the ref listing reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ref {
    pub name: String,
    pub id: ObjectId,
    pub peeled_id: Option<ObjectId>,
    pub target_kind: Option<ObjectKind>,
}

impl Ref {
    #[must_use]
    pub fn new(name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            name: name.into(),
            id,
            peeled_id: None,
            target_kind: None,
        }
    }

    #[must_use]
    pub const fn with_target_kind(mut self, kind: ObjectKind) -> Self {
        self.target_kind = Some(kind);
        self
    }

    /// Object this ref ends up naming after peeling tags.
    #[must_use]
    pub fn target(&self) -> ObjectId {
        self.peeled_id.unwrap_or(self.id)
    }

    /// Whether this ref names `id` directly or through tag peeling.
    #[must_use]
    pub fn points_at(&self, id: &ObjectId) -> bool {
        self.id == *id || self.peeled_id.as_ref() == Some(id)
    }
}

/// The parts of a commit the graph walks need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: ObjectId,
    pub parents: Vec<ObjectId>,
    /// Committer time, seconds since the epoch.
    pub commit_time: i64,
}

/// Identity recorded for the author of a line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
    /// Seconds since the epoch.
    pub time: i64,
    /// Offset from UTC in minutes.
    pub tz_offset_minutes: i32,
}

/// Where one line of a file came from, as far as blame could tell.
///
/// Every component may be unknown independently; a line with no attribution at all has
/// all three unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LineOrigin {
    pub commit: Option<ObjectId>,
    pub author: Option<Author>,
    pub path: Option<String>,
}

impl LineOrigin {
    #[must_use]
    pub fn new(commit: ObjectId, author: Author, path: impl Into<String>) -> Self {
        Self {
            commit: Some(commit),
            author: Some(author),
            path: Some(path.into()),
        }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }
}

/// Split a revision expression into its base and trailing relative navigation.
///
/// `"main~2^1"` becomes `("main", "~2^1")`; a `^!` suffix is not navigation and is left
/// on the base.
#[must_use]
pub fn split_relative_suffix(spec: &str) -> (&str, &str) {
    let bytes = spec.as_bytes();
    let mut cut = bytes.len();
    let mut i = bytes.len();
    while i > 0 {
        let b = bytes[i - 1];
        if b.is_ascii_digit() {
            i -= 1;
        } else if b == b'~' || b == b'^' {
            i -= 1;
            cut = i;
        } else {
            break;
        }
    }
    spec.split_at(cut)
}

/// Split a git timezone like `+0130` or `-0800` into minutes east of UTC.
#[must_use]
pub fn parse_tz_offset(value: &str) -> Option<i32> {
    let value = value.trim();
    let (sign, digits) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => (1, value),
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    Some(sign * (hours * 60 + minutes))
}
