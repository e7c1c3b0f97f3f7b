// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kind/type predicate gating notifications before they are queued.

use chatwire_core::ConnectorRecord;

/// Exact-match predicate over a record's kind and type.
///
/// Applied identically on the add, update, and delete paths. On updates the
/// controller evaluates both the old and the new state: a record entering
/// the matched set is an add, one leaving it is a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorFilter {
    pub kind: String,
    pub type_: String,
}

impl ConnectorFilter {
    pub fn new(kind: impl Into<String>, type_: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            type_: type_.into(),
        }
    }

    /// True when the candidate record's kind and type both match.
    pub fn matches(&self, record: &ConnectorRecord) -> bool {
        record.kind == self.kind && record.type_ == self.type_
    }
}

impl From<&chatwire_config::FilterConfig> for ConnectorFilter {
    fn from(config: &chatwire_config::FilterConfig) -> Self {
        Self::new(config.kind.clone(), config.type_.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str, type_: &str) -> ConnectorRecord {
        ConnectorRecord {
            namespace: "default".into(),
            name: "c".into(),
            connector_id: "c".into(),
            kind: kind.into(),
            type_: type_.into(),
            config: String::new(),
            resource_version: "1".into(),
        }
    }

    #[test]
    fn matches_on_both_fields() {
        let filter = ConnectorFilter::new("source", "chatai");
        assert!(filter.matches(&record("source", "chatai")));
    }

    #[test]
    fn rejects_mismatched_kind() {
        let filter = ConnectorFilter::new("source", "chatai");
        assert!(!filter.matches(&record("sink", "chatai")));
    }

    #[test]
    fn builds_from_loaded_filter_section() {
        let config = chatwire_config::load_config_from_str(
            "[filter]\nkind = \"sink\"\ntype = \"webhook\"",
        )
        .unwrap();
        let filter = ConnectorFilter::from(&config.filter);
        assert!(filter.matches(&record("sink", "webhook")));
        assert!(!filter.matches(&record("source", "chatai")));
    }

    #[test]
    fn rejects_mismatched_type() {
        // The type comparison runs against the candidate record, not the
        // filter's own field.
        let filter = ConnectorFilter::new("source", "chatai");
        assert!(!filter.matches(&record("source", "other")));
    }
}
