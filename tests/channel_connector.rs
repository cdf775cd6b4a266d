// tests/channel_connector.rs
//
// Subscription lifecycle of the push-streaming connector against a mock
// transport: session artifact check, backfill-before-live ordering, bias
// tagging, and dedup across the backfill/live boundary.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use flashpoint_engine::ingest::connectors::channel::{
    ChannelConnector, ChannelMessage, ChannelTransport,
};
use flashpoint_engine::{Connector, ConnectorError, Emitter};

fn msg(channel: &str, id: u64, text: &str) -> ChannelMessage {
    ChannelMessage {
        channel: channel.into(),
        id,
        text: text.into(),
        timestamp: id as f64,
        url: format!("https://t.example/{channel}/{id}"),
    }
}

struct MockTransport {
    history: Vec<ChannelMessage>,
    live: Mutex<VecDeque<ChannelMessage>>,
}

#[async_trait::async_trait]
impl ChannelTransport for MockTransport {
    async fn connect(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn backfill(&self, channel: &str, limit: usize) -> anyhow::Result<Vec<ChannelMessage>> {
        Ok(self
            .history
            .iter()
            .filter(|m| m.channel == channel)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn next_message(&self) -> anyhow::Result<ChannelMessage> {
        self.live
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("subscription dropped"))
    }
}

#[tokio::test]
async fn backfill_precedes_live_and_duplicates_are_suppressed() {
    let transport = Arc::new(MockTransport {
        history: vec![msg("alpha", 1, "old message one"), msg("alpha", 2, "old message two")],
        live: Mutex::new(VecDeque::from(vec![
            // id 2 was already backfilled; must not be emitted twice.
            msg("alpha", 2, "old message two"),
            msg("alpha", 3, "breaking now"),
            msg("beta", 7, "from an unlisted channel"),
        ])),
    });

    let session = tempfile::NamedTempFile::new().unwrap();
    let connector = ChannelConnector::new(
        transport,
        session.path().to_path_buf(),
        vec![("alpha".to_string(), "Independent".to_string())],
        20,
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    // The mock's live queue drains to an error, so run returns Other.
    let res = connector.run(&Emitter::new(tx)).await;
    assert!(matches!(res, Err(ConnectorError::Other(_))));

    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }

    let texts: Vec<&str> = events.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "old message one",
            "old message two",
            "breaking now",
            "from an unlisted channel"
        ]
    );
    assert_eq!(events[0].bias, "Independent");
    // Unlisted channels fall back to an unknown provenance tag.
    assert_eq!(events[3].bias, "Unknown");
    assert_eq!(events[2].url, "https://t.example/alpha/3");
    assert_eq!(events[2].source, "Channel");
}

#[tokio::test]
async fn missing_session_artifact_is_fatal_for_this_connector_only() {
    let transport = Arc::new(MockTransport {
        history: vec![],
        live: Mutex::new(VecDeque::new()),
    });
    let connector = ChannelConnector::new(
        transport,
        std::path::PathBuf::from("/nonexistent/session.artifact"),
        vec![("alpha".to_string(), "Independent".to_string())],
        20,
    );

    let (tx, _rx) = tokio::sync::mpsc::channel(4);
    let res = connector.run(&Emitter::new(tx)).await;
    assert!(matches!(res, Err(ConnectorError::FatalConfig(_))));
}
