// src/ingest/mod.rs
pub mod connectors;
pub mod supervisor;
pub mod types;

use std::collections::HashSet;

use metrics::{counter, describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "connector_events_total",
            "Canonical events emitted by connectors."
        );
        describe_counter!(
            "connector_errors_total",
            "Transient connector fetch/parse errors."
        );
        describe_counter!(
            "connector_rate_limited_total",
            "Rate-limit cool-downs taken by connectors."
        );
        describe_counter!(
            "connector_restarts_total",
            "Connector loop restarts by the supervisor."
        );
        describe_counter!(
            "dedup_cleared_total",
            "Wholesale clears of per-connector dedup sets."
        );
        describe_counter!(
            "pipeline_dropped_total",
            "Malformed records dropped at the ingestion boundary."
        );
        describe_counter!(
            "index_errors_total",
            "Events skipped by the retrieval index (embedding failures)."
        );
        describe_gauge!("index_entries", "Entries currently held by the retrieval index.");
        describe_counter!("query_requests_total", "Grounded query requests served.");
        describe_counter!("report_requests_total", "Situation report requests served.");
    });
}

/// Reduce markup-bearing text to plain text.
///
/// Tags are replaced by a space, never by nothing, so adjacent words from
/// neighboring elements stay separated ("end.<p>Start" -> "end. Start").
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags, space-separated
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize typographic quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 4000 chars keeps prompts bounded
    if out.chars().count() > 4000 {
        out = out.chars().take(4000).collect();
    }

    out
}

/// Combine a title and an optional body into one text field,
/// "title: body" style, each half normalized independently.
pub fn combine_title_body(title: &str, body: &str) -> String {
    let t = normalize_text(title);
    let b = normalize_text(body);
    if b.is_empty() {
        t
    } else if t.is_empty() {
        b
    } else {
        format!("{t}: {b}")
    }
}

/// Per-connector memory of previously emitted identifiers.
///
/// Presence check only. Crossing the size ceiling clears the whole set:
/// a short burst of possible re-emission is traded for bounded memory.
#[derive(Debug)]
pub struct DedupSet {
    seen: HashSet<String>,
    cap: usize,
}

impl DedupSet {
    pub const DEFAULT_CAP: usize = 5_000;

    pub fn new(cap: usize) -> Self {
        Self {
            seen: HashSet::new(),
            cap: cap.max(1),
        }
    }

    /// Record an identifier. Returns `true` when it was not seen before
    /// (i.e. the caller should emit the item).
    pub fn insert(&mut self, id: &str) -> bool {
        if self.seen.len() >= self.cap {
            self.seen.clear();
            counter!("dedup_cleared_total").increment(1);
        }
        self.seen.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for DedupSet {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_tags_without_merging_words() {
        let s = "Missile strike reported.<p>Officials respond</p>";
        assert_eq!(
            normalize_text(s),
            "Missile strike reported. Officials respond"
        );
    }

    #[test]
    fn normalize_decodes_entities_and_collapses_ws() {
        let s = "  Talks&nbsp;&nbsp;stall <br/> again ";
        assert_eq!(normalize_text(s), "Talks stall again");
    }

    #[test]
    fn combine_skips_empty_halves() {
        assert_eq!(combine_title_body("Title", ""), "Title");
        assert_eq!(combine_title_body("", "Body"), "Body");
        assert_eq!(combine_title_body("Title", "Body"), "Title: Body");
    }

    #[test]
    fn dedup_reports_new_ids_once() {
        let mut d = DedupSet::new(10);
        assert!(d.insert("a"));
        assert!(!d.insert("a"));
        assert!(d.insert("b"));
    }

    #[test]
    fn dedup_clears_wholesale_at_ceiling() {
        let mut d = DedupSet::new(3);
        assert!(d.insert("a"));
        assert!(d.insert("b"));
        assert!(d.insert("c"));
        // Ceiling crossed: set cleared, "a" is re-emittable.
        assert!(d.insert("a"));
        assert_eq!(d.len(), 1);
    }
}
