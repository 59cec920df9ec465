//! Resolved name to object bindings.

use serde::Serialize;

use crate::git::{ObjectId, ObjectKind, is_hex_abbreviation, split_relative_suffix};

/// A revision name as the user typed it, bound to the object it resolved to.
///
/// `peeled_*` equal `id`/`kind` unless the object is an annotated tag, in which case they
/// describe the tag's fully peeled target. [`Revision::NULL`] stands for "no revision".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Revision {
    name: String,
    id: Option<ObjectId>,
    kind: Option<ObjectKind>,
    peeled_id: Option<ObjectId>,
    peeled_kind: Option<ObjectKind>,
}

impl Revision {
    /// No revision supplied.
    pub const NULL: Self = Self {
        name: String::new(),
        id: None,
        kind: None,
        peeled_id: None,
        peeled_kind: None,
    };

    /// A revision naming a non-tag object.
    #[must_use]
    pub fn new(name: impl Into<String>, id: ObjectId, kind: ObjectKind) -> Self {
        Self::peeled(name, id, kind, id, kind)
    }

    #[must_use]
    pub fn peeled(
        name: impl Into<String>,
        id: ObjectId,
        kind: ObjectKind,
        peeled_id: ObjectId,
        peeled_kind: ObjectKind,
    ) -> Self {
        Self {
            name: name.into(),
            id: Some(id),
            kind: Some(kind),
            peeled_id: Some(peeled_id),
            peeled_kind: Some(peeled_kind),
        }
    }

    /// A revision named by the hex form of its own id.
    #[must_use]
    pub fn named_by_id(id: ObjectId, kind: ObjectKind) -> Self {
        Self::new(id.to_hex(), id, kind)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.id.is_none()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn id(&self) -> Option<ObjectId> {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> Option<ObjectKind> {
        self.kind
    }

    #[must_use]
    pub const fn peeled_id(&self) -> Option<ObjectId> {
        self.peeled_id
    }

    #[must_use]
    pub const fn peeled_kind(&self) -> Option<ObjectKind> {
        self.peeled_kind
    }

    /// Whether the name is a hex abbreviation of the id rather than a ref name.
    #[must_use]
    pub fn is_named_by_id(&self) -> bool {
        self.id.is_some_and(|id| is_hex_abbreviation(&self.name) && id.starts_with_hex(&self.name))
    }

    /// Whether the name ends in relative navigation such as `~2` or `^1`.
    #[must_use]
    pub fn has_relative_suffix(&self) -> bool {
        !split_relative_suffix(&self.name).1.is_empty()
    }
}

impl Default for Revision {
    fn default() -> Self {
        Self::NULL
    }
}
