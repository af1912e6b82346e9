//! Resolution of caller-supplied item names to registered keys
//!
//! Callers may send a bare item name (`"Steel"`), a kind plus a name
//! (`kind=material, name=steel`) or an already qualified name
//! (`"material_steel"`). Both the query and every registered key are
//! normalized (trimmed, lowercased) before comparison. Candidates are the
//! bare name plus `{kind}_{name}` for the given kind, or for every known kind
//! when none is given.
//!
//! When several registered keys normalize to the same candidate, whichever
//! the registry yields first wins. Registry order is unspecified.

use crate::codec::CanonicalKey;
use crate::data::ItemKind;
use crate::error::{ForecastError, Result};
use crate::registry::ModelRegistry;
use tracing::debug;

/// Trim surrounding whitespace and lowercase
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Normalized names a query may match, bare name first
pub fn candidates(kind: Option<&str>, name: &str) -> Vec<String> {
    let name = normalize(name);
    let qualified: Vec<String> = match kind.map(normalize).filter(|k| !k.is_empty()) {
        Some(kind) => vec![format!("{}_{}", kind, name)],
        None => ItemKind::ALL
            .iter()
            .map(|kind| format!("{}_{}", kind, name))
            .collect(),
    };

    let mut out = Vec::with_capacity(qualified.len() + 1);
    out.push(name);
    out.extend(qualified);
    out
}

/// Resolve a query against a set of registered keys.
///
/// Fails with [`ForecastError::NotFound`] when `name` is missing or blank, or
/// when no key matches any candidate.
pub fn resolve_in<'a, I>(kind: Option<&str>, name: Option<&str>, keys: I) -> Result<CanonicalKey>
where
    I: IntoIterator<Item = &'a CanonicalKey>,
{
    let name = name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ForecastError::NotFound("no item name given".to_string()))?;

    let wanted = candidates(kind, name);
    debug!(?wanted, "resolving item");

    keys.into_iter()
        .find(|key| {
            let normalized = normalize(key.as_str());
            wanted.iter().any(|c| *c == normalized)
        })
        .cloned()
        .ok_or_else(|| match kind {
            Some(kind) => ForecastError::NotFound(format!("{} '{}' not found", kind.trim(), name.trim())),
            None => ForecastError::NotFound(format!("item '{}' not found", name.trim())),
        })
}

/// Resolves queries against the snapshot a registry currently publishes
#[derive(Debug, Clone, Copy)]
pub struct KeyResolver<'a> {
    registry: &'a ModelRegistry,
}

impl<'a> KeyResolver<'a> {
    pub fn new(registry: &'a ModelRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a query to a registered key
    pub fn resolve(&self, kind: Option<&str>, name: Option<&str>) -> Result<CanonicalKey> {
        let snapshot = self.registry.snapshot();
        resolve_in(kind, name, snapshot.keys())
    }
}
