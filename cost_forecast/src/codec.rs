//! Item keys and the reversible naming of persisted model artifacts
//!
//! Every trained model is identified by a canonical key `{kind}_{identifier}`.
//! On disk the key travels base64-encoded inside the artifact name
//! `arima_{token}.{extension}`, which keeps arbitrary identifiers (spaces,
//! mixed case, unicode, path separators) out of the file system namespace.
//!
//! Naming version 1:
//! - prefix `arima_`
//! - token: base64 of the key's UTF-8 bytes, URL-safe alphabet, padded
//! - extension chosen by the store (`json` by default)
//!
//! Tokens written with the standard alphabet are still accepted on decode.

use crate::data::ItemKind;
use crate::error::{ForecastError, Result};
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Prefix shared by every artifact name
pub const ARTIFACT_PREFIX: &str = "arima_";

/// Version of the artifact naming scheme
pub const NAMING_VERSION: u32 = 1;

/// Unique identity of one trained model, `{kind}_{identifier}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    /// Build the key for an item of the given kind
    pub fn new(kind: ItemKind, identifier: &str) -> Self {
        Self(format!("{}_{}", kind, identifier))
    }

    /// Wrap a key string as found in storage, without checking its shape
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Kind prefix, if the key carries a known one
    pub fn kind(&self) -> Option<ItemKind> {
        let (prefix, _) = self.0.split_once('_')?;
        match prefix {
            "material" => Some(ItemKind::Material),
            "labor" => Some(ItemKind::Labor),
            _ => None,
        }
    }

    /// Item identifier with the kind prefix removed
    pub fn identifier(&self) -> &str {
        match (self.kind(), self.0.split_once('_')) {
            (Some(_), Some((_, rest))) => rest,
            _ => &self.0,
        }
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CanonicalKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Storage-safe encoding of a [`CanonicalKey`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodedToken(String);

impl EncodedToken {
    /// Wrap a token as found in storage
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncodedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode a key into a token
pub fn encode(key: &CanonicalKey) -> EncodedToken {
    EncodedToken(URL_SAFE.encode(key.as_str().as_bytes()))
}

/// Decode a token back into the key it was made from.
///
/// Fails with [`ForecastError::Decode`] for bad alphabet or padding, bytes
/// that are not UTF-8, and tokens that decode to an empty key.
pub fn decode(token: &EncodedToken) -> Result<CanonicalKey> {
    let bytes = URL_SAFE
        .decode(token.as_str())
        .or_else(|err| STANDARD.decode(token.as_str()).map_err(|_| err))
        .map_err(|e| ForecastError::Decode(format!("'{}': {}", token, e)))?;

    let text = String::from_utf8(bytes)
        .map_err(|e| ForecastError::Decode(format!("'{}': {}", token, e)))?;

    if text.is_empty() {
        return Err(ForecastError::Decode(format!("'{}': empty key", token)));
    }

    Ok(CanonicalKey(text))
}

/// File name of one persisted artifact: prefix, token and extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    token: EncodedToken,
    extension: String,
}

impl ArtifactName {
    pub fn new(token: EncodedToken, extension: &str) -> Self {
        Self {
            token,
            extension: extension.to_string(),
        }
    }

    pub fn for_key(key: &CanonicalKey, extension: &str) -> Self {
        Self::new(encode(key), extension)
    }

    /// Recognise an artifact file name; anything else yields `None`.
    ///
    /// The token is everything between the prefix and the extension, so it
    /// may itself contain `_`.
    pub fn parse(file_name: &str, extension: &str) -> Option<Self> {
        let rest = file_name.strip_prefix(ARTIFACT_PREFIX)?;
        let token = rest.strip_suffix(extension)?.strip_suffix('.')?;
        if token.is_empty() {
            return None;
        }

        Some(Self::new(EncodedToken(token.to_string()), extension))
    }

    pub fn token(&self) -> &EncodedToken {
        &self.token
    }

    pub fn into_token(self) -> EncodedToken {
        self.token
    }

    pub fn file_name(&self) -> String {
        format!("{}{}.{}", ARTIFACT_PREFIX, self.token, self.extension)
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}
