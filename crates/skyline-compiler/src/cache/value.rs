//! Namespaced value cache
//!
//! Values are stored per domain, the empty string being the root domain. Within
//! a domain entries keep their first insertion position; posting an existing
//! name replaces the value in place.

use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct Domain {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl Domain {
    fn insert(&mut self, name: &str, value: Value) {
        match self.index.get(name) {
            Some(&idx) => self.entries[idx].1 = value,
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push((name.to_string(), value));
            }
        }
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&idx| &self.entries[idx].1)
    }
}

/// Cross-unit value store keyed by `(domain, name)`
#[derive(Debug, Clone, Default)]
pub struct ValueCache {
    domains: Vec<(String, Domain)>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous value under the same key
    pub fn post_value(&mut self, value: impl Into<Value>, name: &str, domain: &str) {
        self.domain_mut(domain).insert(name, value.into());
    }

    /// Fetch a value from a domain
    pub fn fetch_value(&self, name: &str, domain: &str) -> Option<&Value> {
        self.domain(domain).and_then(|d| d.get(name))
    }

    /// All entries of a domain in insertion order
    pub fn fetch_values(&self, domain: &str) -> Vec<(&str, &Value)> {
        self.domain(domain)
            .map(|d| d.entries.iter().map(|(k, v)| (k.as_str(), v)).collect())
            .unwrap_or_default()
    }

    /// Every entry labelled `domain.name` (root domain entries render as `.name`)
    pub fn fetch_all(&self) -> Vec<(String, &Value)> {
        self.domains
            .iter()
            .flat_map(|(domain, d)| {
                d.entries
                    .iter()
                    .map(move |(name, value)| (format!("{}.{}", domain, name), value))
            })
            .collect()
    }

    /// Number of distinct keys across all domains
    pub fn count(&self) -> usize {
        self.domains.iter().map(|(_, d)| d.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    fn domain(&self, domain: &str) -> Option<&Domain> {
        self.domains
            .iter()
            .find(|(name, _)| name == domain)
            .map(|(_, d)| d)
    }

    fn domain_mut(&mut self, domain: &str) -> &mut Domain {
        let idx = match self.domains.iter().position(|(name, _)| name == domain) {
            Some(idx) => idx,
            None => {
                self.domains.push((domain.to_string(), Domain::default()));
                self.domains.len() - 1
            }
        };
        &mut self.domains[idx].1
    }
}
