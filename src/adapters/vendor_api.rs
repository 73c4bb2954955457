/*
 * CanaryScope
 * Copyright (c) 2024 CanaryScope Contributors
 *
 * This work is licensed under the Creative Commons Attribution-NonCommercial 4.0 International License.
 * To view a copy of this license, visit http://creativecommons.org/licenses/by-nc/4.0/
 *
 * You are free to share and adapt this work for non-commercial purposes with attribution.
 * Commercial use is prohibited without explicit written permission.
 *
 * For commercial licensing inquiries, please contact the project maintainers.
 */

//! Vendor-API adapter (spec §4.1): commissions whose e-filing or meeting
//! system exposes a JSON endpoint directly (e.g. a CMS's public REST API),
//! rather than scraping HTML or a feed. `config_json`'s `items_path` dotted
//! path (e.g. `"data.items"`) locates the array to walk, since every vendor
//! wraps its payload differently.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use super::{config_str, DocketCatalogAdapter, DocketRecord};
use crate::db::models::Source;

pub struct VendorApiAdapter;

#[async_trait]
impl DocketCatalogAdapter for VendorApiAdapter {
    async fn list_dockets(&self, source: &Source) -> anyhow::Result<Vec<DocketRecord>> {
        let body: Value = reqwest::get(&source.url).await?.json().await?;
        let items_path = config_str(source, "items_path");
        let date_format = config_str(source, "date_format").unwrap_or_else(|| "%Y-%m-%d".to_string());

        let items = items_path
            .as_deref()
            .and_then(|path| walk_path(&body, path))
            .or_else(|| body.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(items.iter().filter_map(|item| item_to_docket_record(item, &date_format)).collect())
    }
}

fn walk_path<'a>(value: &'a Value, path: &str) -> Option<&'a Vec<Value>> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    current.as_array()
}

/// Maps one vendor payload item onto a `DocketRecord`. `None` if the item
/// carries no docket/case number at all - there's nothing to catalogue.
fn item_to_docket_record(item: &Value, date_format: &str) -> Option<DocketRecord> {
    let get_str = |keys: &[&str]| -> Option<String> {
        keys.iter().find_map(|k| item.get(k)).and_then(|v| v.as_str()).map(String::from)
    };

    let docket_number = get_str(&["docket_number", "case_number", "docket", "id"])?;

    let filing_date = get_str(&["filing_date", "date", "filed_date"])
        .and_then(|s| NaiveDate::parse_from_str(&s, date_format).ok());

    Some(DocketRecord {
        docket_number,
        utility_sector: get_str(&["utility_sector", "sector"]),
        title: get_str(&["title", "name", "case_title"]),
        utility_name: get_str(&["utility", "utility_name", "company"]),
        filing_date,
        status: get_str(&["status", "case_status"]),
        case_type: get_str(&["type", "case_type"]),
        source_url: get_str(&["url", "source_url", "link"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_nested_items_path() {
        let body = serde_json::json!({"data": {"items": [{"id": "1"}]}});
        let items = walk_path(&body, "data.items").unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn maps_item_fields_with_fallback_keys() {
        let item = serde_json::json!({
            "docket": "20240035-GU",
            "case_title": "Rate adjustment application",
            "date": "2024-03-15",
        });
        let record = item_to_docket_record(&item, "%Y-%m-%d").unwrap();
        assert_eq!(record.docket_number, "20240035-GU");
        assert_eq!(record.title.as_deref(), Some("Rate adjustment application"));
        assert_eq!(record.filing_date, NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn skips_items_with_no_docket_number() {
        let item = serde_json::json!({"title": "No docket here"});
        assert!(item_to_docket_record(&item, "%Y-%m-%d").is_none());
    }
}
