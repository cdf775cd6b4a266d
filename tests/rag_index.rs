// tests/rag_index.rs
use std::sync::Arc;

use flashpoint_engine::rag::embed::MockEmbedder;
use flashpoint_engine::rag::index::RetrievalIndex;
use flashpoint_engine::CanonicalEvent;

fn ev(text: &str, url: &str) -> CanonicalEvent {
    CanonicalEvent {
        source: "Test".into(),
        text: text.into(),
        url: url.into(),
        timestamp: 0.0,
        bias: "Test".into(),
        lat: None,
        lon: None,
    }
}

fn index() -> RetrievalIndex {
    RetrievalIndex::new(Arc::new(MockEmbedder::new(256)), None)
}

#[tokio::test]
async fn querying_with_an_indexed_text_returns_it_at_rank_one() {
    let idx = index();
    let target = "grain corridor reopens under naval escort";
    idx.index(&ev(target, "https://a/1")).await.unwrap();
    idx.index(&ev("football transfer window closes", "https://a/2"))
        .await
        .unwrap();
    idx.index(&ev("volcanic ash grounds regional flights", "https://a/3"))
        .await
        .unwrap();

    let hits = idx.query(target, 3).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].text, target);
    assert!((hits[0].score - 1.0).abs() < 1e-4, "self-similarity is maximal");
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn ranking_is_descending_and_k_bounded() {
    let idx = index();
    for n in 0..10 {
        idx.index(&ev(&format!("event number {n}"), &format!("https://a/{n}")))
            .await
            .unwrap();
    }
    let hits = idx.query("event number 3", 4).await.unwrap();
    assert_eq!(hits.len(), 4);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn indexing_and_querying_run_concurrently() {
    let idx = Arc::new(index());

    let writers: Vec<_> = (0..2)
        .map(|w| {
            let idx = idx.clone();
            tokio::spawn(async move {
                for n in 0..50 {
                    idx.index(&ev(
                        &format!("writer {w} item {n}"),
                        &format!("https://w{w}/{n}"),
                    ))
                    .await
                    .unwrap();
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..2)
        .map(|_| {
            let idx = idx.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    // A query reflects a recent snapshot; it must never fail.
                    let _ = idx.query("writer item", 5).await.unwrap();
                }
            })
        })
        .collect();

    for h in writers.into_iter().chain(readers) {
        h.await.unwrap();
    }
    assert_eq!(idx.len(), 100);
}

#[tokio::test]
async fn hits_carry_event_metadata() {
    let idx = index();
    let mut e = ev("clashes reported downtown", "https://m/1");
    e.source = "Wire".into();
    e.bias = "Independent".into();
    idx.index(&e).await.unwrap();

    let hits = idx.query("clashes reported downtown", 1).await.unwrap();
    assert_eq!(hits[0].meta.source, "Wire");
    assert_eq!(hits[0].meta.bias, "Independent");
    assert_eq!(hits[0].meta.url, "https://m/1");
}
