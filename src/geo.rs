//! Best-effort text-to-coordinate tagging.
//!
//! Case-insensitive substring matching against a static ordered table of
//! place names. The first match in table-iteration order wins; this is a
//! heuristic for map display, not geocoding. A no-match never blocks or
//! fails the pipeline.

use crate::ingest::types::CanonicalEvent;

/// Place-name reference table. Iteration order is fixed and part of the
/// contract: the first matching entry is returned.
const GEO_TABLE: &[(&str, f64, f64)] = &[
    ("Kyiv", 50.4501, 30.5234),
    ("Ukraine", 48.3794, 31.1656),
    ("Moscow", 55.7558, 37.6173),
    ("Russia", 61.5240, 105.3188),
    ("Washington", 38.9072, -77.0369),
    ("USA", 37.0902, -95.7129),
    ("Beijing", 39.9042, 116.4074),
    ("China", 35.8617, 104.1954),
    ("Gaza", 31.5, 34.466),
    ("Israel", 31.0461, 34.8516),
    ("Taiwan", 23.6978, 120.9605),
    ("London", 51.5074, -0.1278),
    ("Tehran", 35.6892, 51.3890),
    ("Iran", 32.4279, 53.6880),
    ("Delhi", 28.6139, 77.2090),
    ("India", 20.5937, 78.9629),
];

/// First place-name hit in the text, in table order.
pub fn locate(text: &str) -> Option<(f64, f64)> {
    if text.is_empty() {
        return None;
    }
    let lower = text.to_lowercase();
    GEO_TABLE
        .iter()
        .find(|(place, _, _)| lower.contains(&place.to_lowercase()))
        .map(|&(_, lat, lon)| (lat, lon))
}

/// Fill `lat`/`lon` on the event when a known place name is recognized.
pub fn enrich(event: &mut CanonicalEvent) {
    if let Some((lat, lon)) = locate(&event.text) {
        event.lat = Some(lat);
        event.lon = Some(lon);
    }
}
