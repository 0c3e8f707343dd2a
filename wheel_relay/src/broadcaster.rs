//! Connection set + retained snapshot.
//!
//! The broadcaster is owned by the hub task and only ever touched from
//! there, one event at a time, so it needs no locking.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::value::RawValue;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use attention_wheel::WheelSnapshot;

use crate::config::RelayMode;
use crate::error::RelayError;
use crate::protocol;

pub type ClientId = u64;

/// Per-connection queue drained by that connection's writer task.
pub type Outbox = mpsc::UnboundedSender<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub clients: usize,
    pub retained: bool,
}

pub struct StateBroadcaster {
    mode: RelayMode,
    clients: HashMap<ClientId, Outbox>,
    // Encoded envelope of the most recent message; replaced wholesale.
    retained: Option<String>,
}

impl StateBroadcaster {
    pub fn new(mode: RelayMode) -> Self {
        Self {
            mode,
            clients: HashMap::new(),
            retained: None,
        }
    }

    pub fn mode(&self) -> RelayMode {
        self.mode
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            clients: self.clients.len(),
            retained: self.retained.is_some(),
        }
    }

    #[cfg(test)]
    pub fn retained(&self) -> Option<&str> {
        self.retained.as_deref()
    }

    /// Registers a client. In replay mode the retained message, if any, is
    /// sent to the new client only.
    pub fn connect(&mut self, id: ClientId, outbox: Outbox) {
        if self.mode.retains() {
            if let Some(line) = &self.retained {
                // The client may already be gone; nothing to do then.
                let _ = outbox.send(line.clone());
            }
        }
        self.clients.insert(id, outbox);
    }

    pub fn disconnect(&mut self, id: ClientId) -> bool {
        self.clients.remove(&id).is_some()
    }

    /// Handles one inbound line from `from`.
    ///
    /// Malformed JSON is returned as an error and has no effect. Otherwise
    /// the sender gets an ack and, in broadcast modes, every other client
    /// gets the envelope. Returns the number of clients the message was
    /// forwarded to.
    pub fn receive(
        &mut self,
        from: ClientId,
        line: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, RelayError> {
        let payload: Box<RawValue> = serde_json::from_str(line)?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(snap) = serde_json::from_str::<WheelSnapshot>(payload.get()) {
                let r = &snap.attention_wheel;
                debug!(
                    "client {} snapshot: task={:?} score={:.1} progress={:.1}%",
                    from, r.current_task, r.attention_score, r.stream_progress
                );
            }
        }

        let echoed = (!self.mode.forwards()).then_some(payload.as_ref());
        let ack = protocol::encode_ack(now, echoed)?;
        match self.clients.get(&from) {
            Some(outbox) => {
                let _ = outbox.send(ack);
            }
            None => warn!("message from unregistered client {}", from),
        }

        if !self.mode.forwards() {
            return Ok(0);
        }

        let envelope = protocol::encode_envelope(now, &payload)?;
        let mut forwarded = 0;
        for (id, outbox) in &self.clients {
            if *id == from {
                continue;
            }
            // A closed receiver means the connection is going away; its
            // disconnect event will prune it.
            if outbox.send(envelope.clone()).is_ok() {
                forwarded += 1;
            }
        }

        if self.mode.retains() {
            self.retained = Some(envelope);
        }

        Ok(forwarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;
    use tokio::sync::mpsc::UnboundedReceiver;

    const SNAPSHOT: &str = r#"{"attention_wheel":{"total_duration":1200.0,"attention_score":87.5,"is_fatigued":false,"current_task":"Story 1","rotation_angle":42.0,"pointer_length":131.25,"stream_progress":12.5,"tasks":[{"name":"Story 1","percentage":100.0}]}}"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn client(b: &mut StateBroadcaster, id: ClientId) -> UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        b.connect(id, tx);
        rx
    }

    fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(line) = rx.try_recv() {
            out.push(serde_json::from_str(&line).unwrap());
        }
        out
    }

    #[test]
    fn broadcast_skips_sender_and_acks_it() {
        let mut b = StateBroadcaster::new(RelayMode::BroadcastExcludeSender);
        let mut a = client(&mut b, 1);
        let mut bb = client(&mut b, 2);
        let mut c = client(&mut b, 3);

        assert_eq!(b.receive(1, SNAPSHOT, now()).unwrap(), 2);

        let to_a = drain(&mut a);
        assert_eq!(to_a.len(), 1);
        assert_eq!(to_a[0]["response"], "Data received");
        assert_eq!(to_a[0]["timestamp"], "2024-05-01T12:00:00.000Z");
        assert!(to_a[0].get("originalData").is_none());

        for rx in [&mut bb, &mut c] {
            let got = drain(rx);
            assert_eq!(got.len(), 1);
            assert_eq!(got[0]["data"]["attention_wheel"]["current_task"], "Story 1");
            assert_eq!(got[0]["timestamp"], "2024-05-01T12:00:00.000Z");
        }

        // Exclude-sender mode keeps nothing for late joiners.
        let mut d = client(&mut b, 4);
        assert!(drain(&mut d).is_empty());
        assert_eq!(b.retained(), None);
    }

    #[test]
    fn late_joiner_gets_retained_snapshot() {
        let mut b = StateBroadcaster::new(RelayMode::BroadcastWithRetainedReplay);
        let mut early = client(&mut b, 1);
        assert!(drain(&mut early).is_empty());

        let _a = client(&mut b, 2);
        b.receive(2, r#"{"n":1}"#, now()).unwrap();
        b.receive(2, r#"{"n":2}"#, now()).unwrap();

        let mut d = client(&mut b, 3);
        let replayed = drain(&mut d);
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0]["data"]["n"], 2);

        let seen: Vec<i64> = drain(&mut early)
            .iter()
            .map(|v| v["data"]["n"].as_i64().unwrap())
            .collect();
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn malformed_json_is_dropped() {
        let mut b = StateBroadcaster::new(RelayMode::BroadcastWithRetainedReplay);
        let mut a = client(&mut b, 1);
        let mut other = client(&mut b, 2);

        let err = b.receive(1, "{not json", now()).unwrap_err();
        assert!(matches!(err, RelayError::MalformedJson(_)));
        assert!(drain(&mut a).is_empty());
        assert!(drain(&mut other).is_empty());
        assert_eq!(b.retained(), None);
        assert_eq!(b.stats().clients, 2);
    }

    #[test]
    fn echo_only_returns_original_data() {
        let mut b = StateBroadcaster::new(RelayMode::EchoOnly);
        let mut a = client(&mut b, 1);
        let mut other = client(&mut b, 2);

        assert_eq!(b.receive(1, SNAPSHOT, now()).unwrap(), 0);

        let to_a = drain(&mut a);
        assert_eq!(to_a.len(), 1);
        assert_eq!(
            to_a[0]["originalData"]["attention_wheel"]["attention_score"],
            87.5
        );
        assert!(drain(&mut other).is_empty());
        assert_eq!(b.retained(), None);
    }

    #[test]
    fn closed_clients_are_skipped_until_pruned() {
        let mut b = StateBroadcaster::new(RelayMode::BroadcastExcludeSender);
        let _a = client(&mut b, 1);
        let gone = client(&mut b, 2);
        let mut live = client(&mut b, 3);
        drop(gone);

        assert_eq!(b.receive(1, "[1,2,3]", now()).unwrap(), 1);
        assert_eq!(drain(&mut live).len(), 1);

        assert!(b.disconnect(2));
        assert!(!b.disconnect(2));
        assert_eq!(b.stats().clients, 2);
    }
}
