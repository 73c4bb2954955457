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

//! RSS/Atom adapter (spec §4.1): commissions that publish an agenda or
//! filing feed. Parsed with `roxmltree` rather than a full feed-parsing
//! crate, matching spec §9's preference for small dependencies over a
//! general-purpose library pulled in for one call site.

use async_trait::async_trait;
use chrono::NaiveDate;
use md5::{Digest, Md5};
use roxmltree::Document;

use super::{HearingCandidate, SourceAdapter};
use crate::db::models::Source;

pub struct RssAdapter;

#[async_trait]
impl SourceAdapter for RssAdapter {
    async fn list(&self, source: &Source) -> anyhow::Result<Vec<HearingCandidate>> {
        let body = reqwest::get(&source.url).await?.text().await?;
        let doc = Document::parse(&body)?;
        Ok(parse_feed(&doc))
    }
}

fn parse_feed(doc: &Document) -> Vec<HearingCandidate> {
    let mut candidates = Vec::new();

    // RSS 2.0: <item><title>/<link>/<pubDate>/<guid>
    for item in doc.descendants().filter(|n| n.has_tag_name("item")) {
        candidates.push(item_to_candidate(
            child_text(item, "title"),
            child_text(item, "link"),
            child_text(item, "pubDate").and_then(|s| parse_rfc2822_date(&s)),
            child_text(item, "guid"),
            child_text(item, "description"),
        ));
    }

    // Atom: <entry><title>/<link href=.../>/<updated>/<id>
    for entry in doc.descendants().filter(|n| n.has_tag_name("entry")) {
        let link = entry
            .children()
            .find(|c| c.has_tag_name("link"))
            .and_then(|l| l.attribute("href"))
            .map(String::from);
        candidates.push(item_to_candidate(
            child_text(entry, "title"),
            link,
            child_text(entry, "updated").and_then(|s| s.get(0..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())),
            child_text(entry, "id"),
            child_text(entry, "summary"),
        ));
    }

    candidates
}

fn item_to_candidate(
    title: Option<String>,
    link: Option<String>,
    hearing_date: Option<NaiveDate>,
    guid: Option<String>,
    description: Option<String>,
) -> HearingCandidate {
    let external_id = guid.or_else(|| link.as_ref().map(|l| format!("rss_{:x}", Md5::digest(l.as_bytes()))));
    HearingCandidate {
        external_id,
        title: title.unwrap_or_else(|| "Untitled filing".to_string()),
        description,
        hearing_date,
        hearing_type: None,
        utility_name: None,
        docket_numbers: Vec::new(),
        source_url: link.clone(),
        video_url: None,
    }
}

fn child_text(node: roxmltree::Node, tag: &str) -> Option<String> {
    node.children()
        .find(|c| c.has_tag_name(tag))
        .and_then(|c| c.text())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parses RFC 2822 dates (RSS `pubDate`'s format) without a dedicated
/// crate - `chrono::DateTime::parse_from_rfc2822` already covers it.
fn parse_rfc2822_date(s: &str) -> Option<NaiveDate> {
    chrono::DateTime::parse_from_rfc2822(s).ok().map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rss_items() {
        let xml = r#"<?xml version="1.0"?>
<rss><channel>
<item>
  <title>Docket 20240035-GU Hearing Notice</title>
  <link>https://psc.example.gov/notices/1</link>
  <guid>notice-1</guid>
  <pubDate>Fri, 15 Mar 2024 10:00:00 GMT</pubDate>
</item>
</channel></rss>"#;
        let doc = Document::parse(xml).unwrap();
        let candidates = parse_feed(&doc);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].external_id.as_deref(), Some("notice-1"));
        assert_eq!(candidates[0].hearing_date, NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn parses_atom_entries() {
        let xml = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
<entry>
  <title>Rate Case Filing</title>
  <link href="https://psc.example.gov/notices/2"/>
  <id>notice-2</id>
  <updated>2024-04-01T00:00:00Z</updated>
</entry>
</feed>"#;
        let doc = Document::parse(xml).unwrap();
        let candidates = parse_feed(&doc);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source_url.as_deref(), Some("https://psc.example.gov/notices/2"));
    }
}
