//! Record domain model.
//!
//! # Responsibility
//! - Define the persisted record shape shared by import, capture and observer paths.
//! - Provide small read-only projections used by list views.
//!
//! # Invariants
//! - `id` is stable for the record lifetime and is the store key.
//! - `derived_state` / `derived_step` are only written by the observer path.
//! - `last_edited` is owned by the record store; callers never need to set it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Captured document fields, keyed by field name.
pub type FieldMap = BTreeMap<String, String>;

/// Field keys that may carry the record identifier in captured fields.
pub const IDENTIFIER_FIELD_KEYS: [&str; 2] = ["cluid", "Cluid"];

const PRODUCT_FIELD_KEYS: [&str; 6] = [
    "product",
    "Product",
    "productName",
    "ProductName",
    "productId",
    "productID",
];
const CHANNEL_PRODUCT_FIELD_KEYS: [&str; 2] = ["channelProduct", "ChannelProduct"];
const MISSING_LABEL: &str = "—";

/// Persisted record keyed by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub note: String,
    /// Serialized as `derivedState`; observer-reported application state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_state: Option<String>,
    /// Serialized as `derivedStep`; observer-reported step code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_step: Option<String>,
    #[serde(default)]
    pub last_edited: DateTime<Utc>,
}

impl Record {
    /// Creates an empty record for `id`.
    ///
    /// `last_edited` starts at the epoch and is stamped on first upsert.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: FieldMap::new(),
            note: String::new(),
            derived_state: None,
            derived_step: None,
            last_edited: DateTime::<Utc>::default(),
        }
    }

    /// Seeds the identifier field with the record id when no identifier key is present.
    pub fn seed_identifier_field(&mut self) {
        let present = IDENTIFIER_FIELD_KEYS
            .iter()
            .any(|key| self.fields.contains_key(*key));
        if !present {
            self.fields
                .insert(IDENTIFIER_FIELD_KEYS[0].to_string(), self.id.clone());
        }
    }
}

/// Extracts the record identifier reported by captured document fields.
pub fn identifier_from_fields(fields: &FieldMap) -> Option<String> {
    IDENTIFIER_FIELD_KEYS
        .iter()
        .filter_map(|key| fields.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Resolves a short product label for list views.
///
/// Combines the first non-blank product field with the channel product as
/// `product / channel` when both exist and differ.
pub fn product_label(record: &Record) -> String {
    let product = first_non_blank(&record.fields, &PRODUCT_FIELD_KEYS);
    let channel = first_non_blank(&record.fields, &CHANNEL_PRODUCT_FIELD_KEYS);

    match (product, channel) {
        (Some(product), Some(channel)) if product != channel => format!("{product} / {channel}"),
        (Some(product), _) => product.to_string(),
        (None, Some(channel)) => channel.to_string(),
        (None, None) => MISSING_LABEL.to_string(),
    }
}

fn first_non_blank<'a>(fields: &'a FieldMap, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .map(String::as_str)
        .find(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{identifier_from_fields, product_label, FieldMap, Record};

    fn record_with(fields: &[(&str, &str)]) -> Record {
        let mut record = Record::new("8016-01-02-03.04.05.6");
        record.fields = fields
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        record
    }

    #[test]
    fn json_shape_uses_camel_case_and_omits_missing_tags() {
        let mut record = Record::new("8016-01-02-03.04.05.6");
        record.derived_step = Some("SIGN".to_string());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["id"], "8016-01-02-03.04.05.6");
        assert_eq!(value["derivedStep"], "SIGN");
        assert!(value.get("derivedState").is_none());
        assert!(value.get("lastEdited").is_some());
    }

    #[test]
    fn deserializes_sparse_json_with_defaults() {
        let record: Record = serde_json::from_value(serde_json::json!({ "id": "x" })).unwrap();
        assert_eq!(record.id, "x");
        assert!(record.fields.is_empty());
        assert_eq!(record.note, "");
        assert_eq!(record.derived_state, None);
    }

    #[test]
    fn seed_identifier_field_keeps_existing_value() {
        let mut seeded = Record::new("a");
        seeded.seed_identifier_field();
        assert_eq!(seeded.fields.get("cluid").map(String::as_str), Some("a"));

        let mut existing = record_with(&[("Cluid", "other")]);
        existing.seed_identifier_field();
        assert!(!existing.fields.contains_key("cluid"));
    }

    #[test]
    fn identifier_from_fields_skips_blank_values() {
        let mut fields = FieldMap::new();
        fields.insert("cluid".to_string(), "  ".to_string());
        fields.insert("Cluid".to_string(), " 1 ".to_string());
        assert_eq!(identifier_from_fields(&fields).as_deref(), Some("1"));
        assert_eq!(identifier_from_fields(&FieldMap::new()), None);
    }

    #[test]
    fn product_label_combines_product_and_channel() {
        let both = record_with(&[("productName", "Loan"), ("channelProduct", "WEB")]);
        assert_eq!(product_label(&both), "Loan / WEB");

        let same = record_with(&[("product", "Loan"), ("ChannelProduct", "Loan")]);
        assert_eq!(product_label(&same), "Loan");

        let channel_only = record_with(&[("product", " "), ("channelProduct", "APP")]);
        assert_eq!(product_label(&channel_only), "APP");

        assert_eq!(product_label(&record_with(&[])), "—");
    }
}
