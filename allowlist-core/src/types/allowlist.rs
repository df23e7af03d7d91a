//! The verified-domain allowlist.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered set of verified domain names.
///
/// Domains keep the order the upstream returned them in. Duplicates are
/// dropped on construction, keeping the first occurrence. Strings are stored
/// as given; no format validation happens here.
///
/// Cloning is cheap: the list is shared behind an `Arc`, so every reader of
/// the cache gets the same allocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allowlist {
    domains: Arc<[String]>,
}

impl Allowlist {
    /// Builds an allowlist from fetched domains.
    pub fn from_domains(domains: Vec<String>) -> Self {
        let mut seen = HashSet::with_capacity(domains.len());
        let unique: Vec<String> = domains
            .into_iter()
            .filter(|d| seen.insert(d.clone()))
            .collect();

        Self {
            domains: unique.into(),
        }
    }

    /// Returns the domains in fetch order.
    pub fn as_slice(&self) -> &[String] {
        &self.domains
    }

    /// Iterates over the domains in fetch order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }

    /// Returns true if `domain` is on the list.
    ///
    /// The lookup ignores ASCII case and surrounding whitespace.
    pub fn contains(&self, domain: &str) -> bool {
        let needle = domain.trim();
        self.domains.iter().any(|d| d.eq_ignore_ascii_case(needle))
    }

    /// Returns the number of domains.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Returns true if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Copies the domains into an owned vector.
    pub fn to_vec(&self) -> Vec<String> {
        self.domains.to_vec()
    }
}

impl Default for Allowlist {
    fn default() -> Self {
        Self::from_domains(Vec::new())
    }
}

impl From<Vec<String>> for Allowlist {
    fn from(domains: Vec<String>) -> Self {
        Self::from_domains(domains)
    }
}

impl<'a> IntoIterator for &'a Allowlist {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.domains.iter()
    }
}

impl Serialize for Allowlist {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.domains.iter())
    }
}

impl<'de> Deserialize<'de> for Allowlist {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<String>::deserialize(deserializer).map(Self::from_domains)
    }
}
