/*!
 * Deterministic cache keys.
 *
 * A key is `<namespace>:<sha256 hex>` over a canonical JSON object whose
 * fields are sorted lexicographically. The namespace itself is one of the
 * hashed fields, and each namespace names its text field differently, so the
 * payloads of the two namespaces can never coincide.
 */

use anyhow::{Result, anyhow};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Key namespaces; the two are disjoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyNamespace {
    /// Full input text of a request
    Translation,
    /// One chunk of an input text
    Chunk,
}

impl KeyNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Translation => "translation",
            Self::Chunk => "chunk",
        }
    }

    /// Name of the field holding the text for this namespace
    fn text_field(&self) -> &'static str {
        match self {
            Self::Translation => "text",
            Self::Chunk => "chunk",
        }
    }
}

impl FromStr for KeyNamespace {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "translation" => Ok(Self::Translation),
            "chunk" => Ok(Self::Chunk),
            _ => Err(anyhow!("Unknown cache key namespace: {}", s)),
        }
    }
}

/// Cache key for one translation payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: KeyNamespace,
    digest: String,
}

impl CacheKey {
    /// Build a key from an arbitrary field map.
    ///
    /// Field order in the input does not matter. The `ns` field is reserved
    /// and always set to the namespace tag.
    pub fn from_fields<I, K, V>(namespace: KeyNamespace, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut canonical: BTreeMap<String, String> = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        canonical.insert("ns".to_string(), namespace.as_str().to_string());

        // A BTreeMap of strings always serializes
        let payload = serde_json::to_string(&canonical).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());

        Self {
            namespace,
            digest: format!("{:x}", hasher.finalize()),
        }
    }

    /// Key for a whole request text
    pub fn translation(text: &str, source_lang: &str, target_lang: &str, level: &str) -> Self {
        Self::for_text(KeyNamespace::Translation, text, source_lang, target_lang, level)
    }

    /// Key for a single chunk
    pub fn chunk(chunk: &str, source_lang: &str, target_lang: &str, level: &str) -> Self {
        Self::for_text(KeyNamespace::Chunk, chunk, source_lang, target_lang, level)
    }

    fn for_text(namespace: KeyNamespace, text: &str, src: &str, tgt: &str, lvl: &str) -> Self {
        Self::from_fields(
            namespace,
            [
                (namespace.text_field(), text),
                ("src", src),
                ("tgt", tgt),
                ("lvl", lvl),
            ],
        )
    }

    pub fn namespace(&self) -> KeyNamespace {
        self.namespace
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace.as_str(), self.digest)
    }
}

impl FromStr for CacheKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (ns, digest) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("Malformed cache key: {}", s))?;
        let namespace = ns.parse()?;

        if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!("Malformed cache key digest: {}", s));
        }

        Ok(Self {
            namespace,
            digest: digest.to_ascii_lowercase(),
        })
    }
}
