//! Raw-record normalization: map one loosely-typed scraper record onto the
//! fixed `cards` row shape.
//!
//! The scraper emits objects whose keys mix Japanese labels (サイド, 色, ...)
//! with romanized fallbacks (side, color, ...), and whose values may be
//! strings, arrays, or missing entirely. Normalization is total: a malformed
//! or absent field degrades to None (or an empty list), never an error.

use serde_json::{Map, Value};

/// One unnormalized card entry exactly as the scraper produced it.
/// Key order is preserved (serde_json `preserve_order`).
pub type RawRecord = Map<String, Value>;

/// Alias table: canonical field -> candidate keys, first non-empty wins.
/// Japanese label first, romanized fallback second, matching the scrape
/// output's precedence.
const CARD_NO_KEYS: &[&str] = &["card_no", "cardNo", "CARDNO"];
const SIDE_KEYS: &[&str] = &["サイド", "side"];
const COLOR_KEYS: &[&str] = &["色", "color"];
const TYPE_KEYS: &[&str] = &["種類", "type"];
const LEVEL_KEYS: &[&str] = &["レベル", "level"];
const POWER_KEYS: &[&str] = &["パワー", "power"];
const COST_KEYS: &[&str] = &["コスト", "cost"];
const RARITY_KEYS: &[&str] = &["レアリティ", "rarity"];
const TRIGGER_KEYS: &[&str] = &["トリガー", "trigger"];
const FLAVOR_KEYS: &[&str] = &["flavor_text", "フレーバー", "flavor"];
const ABILITIES_KEYS: &[&str] = &["abilities"];
const TRAITS_KEYS: &[&str] = &["特徴"];

/// The fixed-schema, store-resident representation of a card.
///
/// `work_id` is always derived from `card_no`, never read from the record.
/// `updated_at` is deliberately absent: the sink stamps it at write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRow {
    pub card_no: Option<String>,
    pub name: Option<String>,
    pub work_id: Option<String>,
    pub detail_page_url: Option<String>,
    pub image_url: Option<String>,
    pub side: Option<String>,
    pub color: Option<String>,
    pub card_type: Option<String>,
    pub level: Option<i64>,
    pub power: Option<i64>,
    pub cost: Option<i64>,
    pub rarity: Option<String>,
    pub trigger_kind: Option<String>,
    pub flavor_text: Option<String>,
    pub abilities: Vec<String>,
    pub traits: Vec<String>,
    /// The entire original record, serialized verbatim. Escape hatch for
    /// fields the relational schema does not model.
    pub raw_json: String,
}

/// Map a raw record onto a canonical row. Never fails.
pub fn normalize(record: &RawRecord) -> CardRow {
    let card_no = resolve_string(record, CARD_NO_KEYS);
    let work_id = card_no.as_deref().map(infer_work_id);

    CardRow {
        work_id,
        name: resolve_string(record, &["name"]),
        detail_page_url: resolve_string(record, &["detail_page_url"]),
        image_url: resolve_string(record, &["image_url"]),
        side: resolve_string(record, SIDE_KEYS),
        color: resolve_string(record, COLOR_KEYS),
        card_type: resolve_string(record, TYPE_KEYS),
        level: coerce_int(resolve_numeric(record, LEVEL_KEYS)),
        power: coerce_int(resolve_numeric(record, POWER_KEYS)),
        cost: coerce_int(resolve_numeric(record, COST_KEYS)),
        rarity: resolve_string(record, RARITY_KEYS),
        trigger_kind: resolve_string(record, TRIGGER_KEYS),
        flavor_text: resolve_string(record, FLAVOR_KEYS),
        abilities: resolve_string_list(record, ABILITIES_KEYS),
        traits: resolve_string_list(record, TRAITS_KEYS),
        raw_json: Value::Object(record.clone()).to_string(),
        card_no,
    }
}

/// Leading run of characters up to (not including) the first `-`.
/// A key without a separator is its own work id (e.g. promo sheets).
pub fn infer_work_id(card_no: &str) -> String {
    match card_no.find('-') {
        Some(idx) => card_no[..idx].to_string(),
        None => card_no.to_string(),
    }
}

/// Lossy integer coercion for level/power/cost.
///
/// The source renders "no value" as `-` or an empty cell, and decorates
/// numbers with unit suffixes (e.g. `12枚`). Strip everything that is not a
/// digit or minus sign and parse what remains; anything unparseable is None.
pub fn coerce_int(value: Option<&Value>) -> Option<i64> {
    let value = value?;
    let text = match value {
        Value::Null => return None,
        Value::Number(n) => return n.as_i64(),
        Value::String(s) => s.trim(),
        _ => return None,
    };
    if text.is_empty() || text == "-" {
        return None;
    }
    let filtered: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    filtered.parse().ok()
}

/// First candidate key present in the record, regardless of value shape.
fn resolve_value<'a>(record: &'a RawRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| record.get(*k))
}

/// First candidate key holding a usable numeric source. Nulls and empty or
/// whitespace-only strings fall through to the next alias, same as the
/// string resolver; `-` does not (it is an explicit "no value").
fn resolve_numeric<'a>(record: &'a RawRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| match record.get(*k) {
        Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        found => found,
    })
}

/// First candidate key holding a non-empty string.
fn resolve_string(record: &RawRecord, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match record.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    })
}

/// Sequence field: array of strings (non-strings skipped), a bare string
/// becomes a single-element list, anything else is empty.
fn resolve_string_list(record: &RawRecord, keys: &[&str]) -> Vec<String> {
    match resolve_value(record, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        value.as_object().expect("object literal").clone()
    }

    #[test]
    fn coerce_int_table() {
        let s = |v: &str| Value::String(v.to_string());
        assert_eq!(coerce_int(Some(&s("12"))), Some(12));
        assert_eq!(coerce_int(Some(&s("12枚"))), Some(12));
        assert_eq!(coerce_int(Some(&s("-"))), None);
        assert_eq!(coerce_int(Some(&s(""))), None);
        assert_eq!(coerce_int(Some(&s("  "))), None);
        assert_eq!(coerce_int(Some(&s("ソウル+2"))), Some(2));
        assert_eq!(coerce_int(Some(&Value::Null)), None);
        assert_eq!(coerce_int(Some(&json!(3))), Some(3));
        assert_eq!(coerce_int(Some(&json!(1.5))), None);
        assert_eq!(coerce_int(None), None);
    }

    #[test]
    fn work_id_is_prefix_before_first_hyphen() {
        assert_eq!(infer_work_id("DC/W01-016"), "DC/W01");
        assert_eq!(infer_work_id("NOHYPHEN"), "NOHYPHEN");
        assert_eq!(infer_work_id("A-B-C"), "A");
    }

    #[test]
    fn localized_key_takes_priority_over_romanized() {
        let rec = record(json!({
            "card_no": "DC/W01-001",
            "サイド": "ヴァイス",
            "side": "stale-english-value",
            "color": "青"
        }));
        let row = normalize(&rec);
        assert_eq!(row.side.as_deref(), Some("ヴァイス"));
        // Romanized fallback used when the localized key is absent.
        assert_eq!(row.color.as_deref(), Some("青"));
    }

    #[test]
    fn empty_localized_value_falls_through_to_alias() {
        let rec = record(json!({ "サイド": "", "side": "ヴァイス" }));
        assert_eq!(normalize(&rec).side.as_deref(), Some("ヴァイス"));
    }

    #[test]
    fn numeric_alias_falls_through_empty_localized_value() {
        let rec = record(json!({ "レベル": "", "level": "3" }));
        assert_eq!(normalize(&rec).level, Some(3));

        let rec = record(json!({ "パワー": "  ", "power": "5000" }));
        assert_eq!(normalize(&rec).power, Some(5000));

        let rec = record(json!({ "コスト": null, "cost": 2 }));
        assert_eq!(normalize(&rec).cost, Some(2));

        // An explicit "-" is a real value, not a hole to fall through.
        let rec = record(json!({ "レベル": "-", "level": "3" }));
        assert_eq!(normalize(&rec).level, None);
    }

    #[test]
    fn normalize_is_total_on_malformed_input() {
        let rec = record(json!({
            "card_no": ["not", "a", "string"],
            "name": 42,
            "レベル": { "nested": true },
            "abilities": "single ability",
            "特徴": [ "魔法", 7, "音楽" ]
        }));
        let row = normalize(&rec);
        assert_eq!(row.card_no, None);
        assert_eq!(row.work_id, None);
        assert_eq!(row.name, None);
        assert_eq!(row.level, None);
        assert_eq!(row.abilities, vec!["single ability".to_string()]);
        assert_eq!(row.traits, vec!["魔法".to_string(), "音楽".to_string()]);
    }

    #[test]
    fn sequences_default_to_empty_not_null() {
        let row = normalize(&record(json!({ "card_no": "X-1" })));
        assert!(row.abilities.is_empty());
        assert!(row.traits.is_empty());
    }

    #[test]
    fn raw_json_keeps_the_full_record() {
        let rec = record(json!({
            "card_no": "DC/W01-001",
            "未知のフィールド": "kept verbatim"
        }));
        let row = normalize(&rec);
        let parsed: Value = serde_json::from_str(&row.raw_json).unwrap();
        assert_eq!(parsed["未知のフィールド"], "kept verbatim");
        assert_eq!(parsed["card_no"], "DC/W01-001");
    }

    #[test]
    fn work_id_never_read_from_record() {
        let rec = record(json!({ "card_no": "DC/W01-001", "work_id": "SPOOFED" }));
        assert_eq!(normalize(&rec).work_id.as_deref(), Some("DC/W01"));
    }
}
