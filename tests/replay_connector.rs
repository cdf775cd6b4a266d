// tests/replay_connector.rs
use std::io::Write as _;
use std::time::Duration;

use flashpoint_engine::ingest::connectors::replay::ReplayConnector;
use flashpoint_engine::{Connector, Emitter};

#[tokio::test]
async fn replay_emits_lines_with_refreshed_timestamps() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{"source": "Sim", "text": "drill begins", "url": "https://sim/1", "timestamp": 1.0, "bias": "Test"}}"#
    )
    .unwrap();
    writeln!(file, "this line is not json").unwrap();
    writeln!(
        file,
        r#"{{"source": "Sim", "text": "drill ends", "url": "https://sim/2", "timestamp": 2.0, "bias": "Test"}}"#
    )
    .unwrap();
    file.flush().unwrap();

    let connector = ReplayConnector::new(file.path().to_path_buf(), Duration::from_millis(1));
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let handle = tokio::spawn(async move {
        let _ = connector.run(&Emitter::new(tx)).await;
    });

    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("first event in time")
        .expect("channel open");
    let second = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("second event in time")
        .expect("channel open");
    handle.abort();

    assert_eq!(first.text, "drill begins");
    // The malformed middle line was skipped.
    assert_eq!(second.text, "drill ends");
    // Timestamps are rewritten to ingestion time, not the stored 1.0/2.0.
    assert!(first.timestamp > 1_600_000_000.0);
    assert!(second.timestamp >= first.timestamp);
}
