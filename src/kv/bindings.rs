//! Expression attribute placeholders
//!
//! Every attribute referenced in an expression gets a `#name` placeholder
//! and every literal a `:value` placeholder. Placeholders are sanitized to
//! `[A-Za-z0-9_]` and de-duplicated with numeric suffixes, so the same
//! input always yields the same placeholders.

use std::collections::BTreeMap;

use serde_json::Value;

/// Attribute-name and attribute-value maps under construction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    names: BTreeMap<String, String>,
    values: BTreeMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from caller-supplied maps
    pub fn seeded(names: BTreeMap<String, String>, values: BTreeMap<String, Value>) -> Self {
        Self { names, values }
    }

    /// Placeholder for an attribute name. The same attribute always maps to
    /// the same placeholder.
    pub fn name(&mut self, attribute: &str) -> String {
        let base = format!("#{}", sanitize(attribute));
        let mut candidate = base.clone();
        let mut suffix = 1;

        loop {
            match self.names.get(&candidate) {
                Some(existing) if existing == attribute => return candidate,
                Some(_) => {
                    candidate = format!("{}_{}", base, suffix);
                    suffix += 1;
                }
                None => {
                    self.names.insert(candidate.clone(), attribute.to_string());
                    return candidate;
                }
            }
        }
    }

    /// Dotted placeholder path for a nested attribute (`#a.#b`)
    pub fn path(&mut self, segments: &[String]) -> String {
        segments
            .iter()
            .map(|segment| self.name(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Placeholder for a literal, named after `hint`
    pub fn value(&mut self, hint: &str, value: Value) -> String {
        let base = format!(":{}", sanitize(hint));
        let mut candidate = base.clone();
        let mut suffix = 1;

        loop {
            match self.values.get(&candidate) {
                Some(existing) if *existing == value => return candidate,
                Some(_) => {
                    candidate = format!("{}_{}", base, suffix);
                    suffix += 1;
                }
                None => {
                    self.values.insert(candidate.clone(), value);
                    return candidate;
                }
            }
        }
    }

    pub fn names(&self) -> &BTreeMap<String, String> {
        &self.names
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn into_parts(self) -> (BTreeMap<String, String>, BTreeMap<String, Value>) {
        (self.names, self.values)
    }
}

fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}
