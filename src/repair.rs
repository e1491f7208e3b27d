//! Heuristic field repair for scraped card records.
//!
//! Some cardlist pages render サイド and 色 as icon images with no text, so
//! those fields arrive empty. The side letter is recoverable from the card
//! number itself (`DC/W01-001` -> W -> ヴァイス), and the icon URLs live under
//! a predictable `_partimages/` directory next to the card images. Repair
//! fills the textual fields where it can and records candidate icon URLs for
//! the rest; it never performs network verification.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::normalize::RawRecord;

/// Side letter (as embedded in the card number) to Japanese side name.
pub const SIDE_MAP: &[(char, &str)] = &[('W', "ヴァイス"), ('S', "シュヴァルツ")];

/// Icon file stem to Japanese color name, in the order the site lists them.
pub const COLOR_MAP: &[(&str, &str)] = &[
    ("red", "赤"),
    ("blue", "青"),
    ("yellow", "黄"),
    ("green", "緑"),
    ("purple", "紫"),
    ("white", "白"),
    ("black", "黒"),
];

/// Counts of what a repair pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub sides_filled: usize,
    pub color_candidates_added: usize,
}

/// Capital letter immediately after the first `/` in the card number, mapped
/// to its side name. `DC/W01-001` -> `('W', "ヴァイス")`.
pub fn infer_side(card_no: &str) -> Option<(char, &'static str)> {
    let mut chars = card_no.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '/' {
            continue;
        }
        let letter = *chars.peek()?;
        if !letter.is_ascii_uppercase() {
            return None;
        }
        return SIDE_MAP
            .iter()
            .find(|(l, _)| *l == letter)
            .map(|(l, name)| (*l, *name));
    }
    None
}

/// Derive the `_partimages/` icon base from a card image URL.
///
/// `https://host/wordpress/wp-content/images/cardlist/d/dc_w01/dc_w01_001.png`
/// becomes `https://host/wordpress/wp-content/images/cardlist/_partimages/`.
/// When the URL parses but lacks the cardlist path, fall back to the expected
/// location at the site root.
pub fn part_image_base(image_url: &str) -> Option<String> {
    static CARDLIST_PREFIX: OnceLock<Regex> = OnceLock::new();
    let re = CARDLIST_PREFIX
        .get_or_init(|| Regex::new(r"^(.*/wordpress/wp-content/images/cardlist/)").unwrap());

    let parsed = Url::parse(image_url).ok()?;
    let host = parsed.host_str()?;
    let scheme = parsed.scheme();
    match re.captures(parsed.path()) {
        Some(caps) => Some(format!("{scheme}://{host}{}_partimages/", &caps[1])),
        None => Some(format!(
            "{scheme}://{host}/wordpress/wp-content/images/cardlist/_partimages/"
        )),
    }
}

/// Fill missing サイド / propose 色 candidates across a record set, in place.
pub fn repair_records(records: &mut [RawRecord]) -> RepairSummary {
    let mut summary = RepairSummary::default();
    for record in records.iter_mut() {
        repair_record(record, &mut summary);
    }
    summary
}

fn repair_record(record: &mut RawRecord, summary: &mut RepairSummary) {
    let card_no = string_field(record, "card_no").unwrap_or_default();
    let image_url = string_field(record, "image_url")
        .or_else(|| string_field(record, "detail_page_url"))
        .unwrap_or_default();
    let part_base = part_image_base(&image_url);

    if string_field(record, "サイド").is_none() {
        if let Some((letter, name)) = infer_side(&card_no) {
            record.insert("サイド".to_string(), Value::String(name.to_string()));
            if let Some(base) = &part_base {
                let guess = format!("{base}{}.gif", letter.to_ascii_lowercase());
                push_candidate(record, "サイド_img_candidates", guess);
            }
            summary.sides_filled += 1;
        }
    }

    if string_field(record, "色").is_none() {
        if let Some(base) = &part_base {
            if !record.contains_key("色_img_candidates") {
                let candidates: Vec<Value> = COLOR_MAP
                    .iter()
                    .map(|(stem, _)| Value::String(format!("{base}{stem}.gif")))
                    .collect();
                record.insert("色_img_candidates".to_string(), Value::Array(candidates));
                summary.color_candidates_added += 1;
            }
        }
        // No image URL at all: nothing to guess from, leave the field blank.
    }
}

fn string_field(record: &RawRecord, key: &str) -> Option<String> {
    match record.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn push_candidate(record: &mut RawRecord, key: &str, candidate: String) {
    let entry = record
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(items) = entry {
        items.push(Value::String(candidate));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const IMAGE: &str =
        "https://ws-tcg.com/wordpress/wp-content/images/cardlist/d/dc_w01/dc_w01_001.png";

    fn record(value: serde_json::Value) -> RawRecord {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn side_letter_comes_from_card_number() {
        assert_eq!(infer_side("DC/W01-001"), Some(('W', "ヴァイス")));
        assert_eq!(infer_side("DC/S20-050"), Some(('S', "シュヴァルツ")));
        assert_eq!(infer_side("NOHYPHEN"), None);
        assert_eq!(infer_side("AB/X01-001"), None);
        assert_eq!(infer_side("trailing/"), None);
    }

    #[test]
    fn part_image_base_from_card_image() {
        assert_eq!(
            part_image_base(IMAGE).as_deref(),
            Some("https://ws-tcg.com/wordpress/wp-content/images/cardlist/_partimages/")
        );
        // Parseable URL without the cardlist path falls back to the site root.
        assert_eq!(
            part_image_base("https://ws-tcg.com/somewhere/else.png").as_deref(),
            Some("https://ws-tcg.com/wordpress/wp-content/images/cardlist/_partimages/")
        );
        assert_eq!(part_image_base("not a url"), None);
        assert_eq!(part_image_base(""), None);
    }

    #[test]
    fn fills_missing_side_and_records_icon_candidate() {
        let mut records = vec![record(json!({
            "card_no": "DC/W01-001",
            "image_url": IMAGE,
            "サイド": ""
        }))];
        let summary = repair_records(&mut records);
        assert_eq!(summary.sides_filled, 1);
        assert_eq!(records[0]["サイド"], "ヴァイス");
        assert_eq!(
            records[0]["サイド_img_candidates"][0],
            "https://ws-tcg.com/wordpress/wp-content/images/cardlist/_partimages/w.gif"
        );
    }

    #[test]
    fn existing_side_is_untouched() {
        let mut records = vec![record(json!({
            "card_no": "DC/S01-001",
            "サイド": "ヴァイス"
        }))];
        let summary = repair_records(&mut records);
        assert_eq!(summary.sides_filled, 0);
        assert_eq!(records[0]["サイド"], "ヴァイス");
    }

    #[test]
    fn color_candidates_cover_every_icon() {
        let mut records = vec![record(json!({
            "card_no": "DC/W01-001",
            "image_url": IMAGE
        }))];
        let summary = repair_records(&mut records);
        assert_eq!(summary.color_candidates_added, 1);
        let candidates = records[0]["色_img_candidates"].as_array().unwrap();
        assert_eq!(candidates.len(), COLOR_MAP.len());
        assert_eq!(
            candidates[0],
            "https://ws-tcg.com/wordpress/wp-content/images/cardlist/_partimages/red.gif"
        );
    }

    #[test]
    fn no_image_url_means_no_color_candidates() {
        let mut records = vec![record(json!({ "card_no": "DC/W01-001" }))];
        let summary = repair_records(&mut records);
        assert_eq!(summary.sides_filled, 1, "side still inferred from card_no");
        assert_eq!(summary.color_candidates_added, 0);
        assert!(!records[0].contains_key("色_img_candidates"));
    }
}
