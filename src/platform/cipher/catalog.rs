//! Helper-object catalog extraction and classification
//!
//! The player script declares a small object whose entries are one-argument
//! functions; the transformation function composes the deciphering procedure
//! out of calls into it. Each entry is classified by the shape of its body.

use super::scan::{balanced_block, ident_len, skip_ws, split_top_level};
use crate::error::PlayersigError;
use std::collections::HashMap;
use tracing::debug;

/// The four primitive transformations the player script composes.
///
/// This set is closed by the construction of the source procedure; matches
/// over it stay exhaustive so a fifth primitive showing up forces a decision
/// here instead of silently misclassifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Reverse the character sequence
    Reverse,
    /// Keep the suffix starting at the call argument
    Slice,
    /// Remove a prefix of the call argument's length in place
    SpliceDrop,
    /// Exchange the first character with the one at the call argument
    SwapFirstWith,
}

/// The helper object's name together with its classified entries.
/// Entry order is irrelevant; this is a mapping, not a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Catalog {
    pub object_name: String,
    pub entries: HashMap<String, OperationKind>,
}

/// Locates the helper-object declaration in the script and classifies its
/// entries. A `var`/`let`/`const` declaration qualifies only if every
/// top-level entry of its object literal has the `name:function(...){...}`
/// shape.
pub(crate) fn parse_catalog(script: &str) -> crate::Result<Catalog> {
    let bytes = script.as_bytes();
    for keyword in ["var ", "let ", "const "] {
        let mut from = 0usize;
        while let Some(found) = script[from..].find(keyword) {
            let name_start = from + found + keyword.len();
            from = name_start;

            let name_end = name_start + ident_len(&bytes[name_start..]);
            if name_end == name_start {
                continue;
            }
            let mut i = skip_ws(bytes, name_end);
            if bytes.get(i) != Some(&b'=') {
                continue;
            }
            i = skip_ws(bytes, i + 1);
            if bytes.get(i) != Some(&b'{') {
                continue;
            }
            let Some(block) = balanced_block(script, i) else {
                continue;
            };
            if let Some(entries) = classify_entries(block) {
                let object_name = script[name_start..name_end].to_string();
                debug!(object = %object_name, entries = entries.len(), "located helper catalog");
                return Ok(Catalog {
                    object_name,
                    entries,
                });
            }
        }
    }
    Err(PlayersigError::ProcedureUnavailable(
        "helper object declaration not found in player script".to_string(),
    ))
}

fn classify_entries(block: &str) -> Option<HashMap<String, OperationKind>> {
    let mut entries = HashMap::new();
    for entry in split_top_level(block, b',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (name, body) = entry.split_once(':')?;
        let name = name.trim();
        if name.is_empty() || !body.trim_start().starts_with("function(") {
            return None;
        }
        entries.insert(name.to_string(), classify(body));
    }
    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

/// Classification priority is load-bearing: reverse, then slice, then
/// splice, and only a body matching none of those is taken for a swap.
fn classify(body: &str) -> OperationKind {
    if body.contains(".reverse(") {
        OperationKind::Reverse
    } else if body.contains(".slice(") {
        OperationKind::Slice
    } else if body.contains(".splice(") {
        OperationKind::SpliceDrop
    } else {
        OperationKind::SwapFirstWith
    }
}
