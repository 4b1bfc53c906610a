//! Name representation
//!
//! Hierarchical names like `Eq.refl` or `congrArg`, stored as a shared slice
//! of components. The hash is computed once when the name is built so that
//! environment lookups do not re-walk the components.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

/// One component of a hierarchical name
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamePart {
    /// String component
    Str(Arc<str>),
    /// Numeric component (for generated names)
    Num(u64),
}

/// Hierarchical name with cached hash.
#[derive(Clone, Debug)]
pub struct Name {
    parts: Arc<[NamePart]>,
    cached_hash: u64,
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.parts.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let parts = Vec::<NamePart>::deserialize(deserializer)?;
        Ok(Self::from_parts(parts))
    }
}

impl Name {
    fn from_parts(parts: Vec<NamePart>) -> Self {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        parts.hash(&mut hasher);
        Name {
            parts: parts.into(),
            cached_hash: hasher.finish(),
        }
    }

    /// Create the anonymous name
    pub fn anon() -> Self {
        Self::from_parts(Vec::new())
    }

    /// Append a string component
    #[must_use]
    pub fn str(&self, s: impl AsRef<str>) -> Self {
        let mut parts = self.parts.to_vec();
        parts.push(NamePart::Str(Arc::from(s.as_ref())));
        Self::from_parts(parts)
    }

    /// Append a numeric component
    #[must_use]
    pub fn num(&self, n: u64) -> Self {
        let mut parts = self.parts.to_vec();
        parts.push(NamePart::Num(n));
        Self::from_parts(parts)
    }

    /// Check if this is the anonymous name
    pub fn is_anon(&self) -> bool {
        self.parts.is_empty()
    }

    /// Components of this name, outermost first
    pub fn parts(&self) -> &[NamePart] {
        &self.parts
    }

    /// The last component as a string, if it is a string component
    pub fn last_str(&self) -> Option<&str> {
        match self.parts.last() {
            Some(NamePart::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Create from a dotted string like "Eq.refl"
    #[inline]
    pub fn from_string(s: &str) -> Self {
        s.parse().unwrap_or_else(|never: std::convert::Infallible| match never {})
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.cached_hash == other.cached_hash && self.parts == other.parts
    }
}

impl Eq for Name {}

impl Hash for Name {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cached_hash.hash(state);
    }
}

impl FromStr for Name {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Name::anon());
        }
        let parts = s
            .split('.')
            .map(|part| match part.parse::<u64>() {
                Ok(n) => NamePart::Num(n),
                Err(_) => NamePart::Str(Arc::from(part)),
            })
            .collect();
        Ok(Self::from_parts(parts))
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_anon() {
            return write!(f, "[anonymous]");
        }
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            match part {
                NamePart::Str(s) => write!(f, "{s}")?,
                NamePart::Num(n) => write!(f, "{n}")?,
            }
        }
        Ok(())
    }
}
