//! Parsers for machine-readable git output.

use std::collections::HashMap;

use super::object::{
    Author, LineOrigin, OBJECT_ID_HEX_LEN, ObjectId, ObjectKind, Ref, parse_tz_offset,
};
use crate::core::{RefscopeError, Result};

/// Parse the output of [`GitCommand::for_each_ref`](super::GitCommand::for_each_ref).
///
/// # Errors
///
/// Returns [`RefscopeError::GitOutputParse`] for lines that do not have five fields or
/// carry invalid object ids.
pub fn parse_for_each_ref(output: &str) -> Result<Vec<Ref>> {
    let mut refs = Vec::new();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.splitn(5, ' ').collect();
        let [id, kind, peeled, peeled_kind, name] = fields.as_slice() else {
            return Err(parse_error("for-each-ref", format!("malformed line '{line}'")));
        };
        let id = ObjectId::from_hex(id)?;
        let (peeled_id, target_kind) = if peeled.is_empty() {
            (None, kind)
        } else {
            (Some(ObjectId::from_hex(peeled)?), peeled_kind)
        };
        let target_kind = target_kind.parse::<ObjectKind>().map_err(|_| {
            parse_error("for-each-ref", format!("unknown object type in '{line}'"))
        })?;
        refs.push(Ref {
            name: (*name).to_string(),
            id,
            peeled_id,
            target_kind: Some(target_kind),
        });
    }
    Ok(refs)
}

#[derive(Default)]
struct CommitDetails {
    author_name: Option<String>,
    author_mail: Option<String>,
    author_time: Option<i64>,
    author_tz: Option<i32>,
    filename: Option<String>,
}

impl CommitDetails {
    fn author(&self) -> Option<Author> {
        Some(Author {
            name: self.author_name.clone()?,
            email: self.author_mail.clone().unwrap_or_default(),
            time: self.author_time.unwrap_or_default(),
            tz_offset_minutes: self.author_tz.unwrap_or_default(),
        })
    }
}

/// Parse `git blame --porcelain` output into one [`LineOrigin`] per line of the file.
///
/// Commit details appear only the first time a commit shows up, and the filename is
/// repeated only when it changes, so both are remembered per commit.
///
/// # Errors
///
/// Returns [`RefscopeError::GitOutputParse`] if a content line appears before any
/// header or a header carries an invalid id.
pub fn parse_blame_porcelain(output: &str) -> Result<Vec<LineOrigin>> {
    let mut details: HashMap<String, CommitDetails> = HashMap::new();
    let mut current: Option<String> = None;
    let mut origins = Vec::new();

    for line in output.lines() {
        if let Some(_content) = line.strip_prefix('\t') {
            let Some(sha) = current.as_ref() else {
                return Err(parse_error("blame", "content line before header"));
            };
            let info = details.get(sha);
            let commit = if sha.bytes().all(|b| b == b'0') { None } else { Some(ObjectId::from_hex(sha)?) };
            origins.push(LineOrigin {
                commit,
                author: info.and_then(CommitDetails::author),
                path: info.and_then(|i| i.filename.clone()),
            });
            continue;
        }

        let (key, value) = line.split_once(' ').unwrap_or((line, ""));
        if key.len() == OBJECT_ID_HEX_LEN && key.bytes().all(|b| b.is_ascii_hexdigit()) {
            current = Some(key.to_string());
            details.entry(key.to_string()).or_default();
            continue;
        }

        let Some(sha) = current.as_ref() else {
            continue;
        };
        let Some(info) = details.get_mut(sha) else {
            continue;
        };
        match key {
            "author" => info.author_name = Some(value.to_string()),
            "author-mail" => {
                info.author_mail =
                    Some(value.trim_start_matches('<').trim_end_matches('>').to_string());
            }
            "author-time" => info.author_time = value.trim().parse().ok(),
            "author-tz" => info.author_tz = parse_tz_offset(value),
            "filename" => info.filename = Some(value.to_string()),
            _ => {}
        }
    }

    Ok(origins)
}

fn parse_error(operation: &str, reason: impl Into<String>) -> RefscopeError {
    RefscopeError::GitOutputParse {
        operation: operation.to_string(),
        reason: reason.into(),
    }
}
