use std::net::SocketAddr;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::broadcaster::{ClientId, Outbox, RelayStats, StateBroadcaster};

/// Everything that can happen to the relay, in arrival order.
#[derive(Debug)]
pub enum RelayEvent {
    Connected {
        id: ClientId,
        addr: SocketAddr,
        outbox: Outbox,
    },
    Message {
        id: ClientId,
        line: String,
    },
    Disconnected {
        id: ClientId,
    },
    Stats {
        reply: oneshot::Sender<RelayStats>,
    },
}

pub type EventSender = mpsc::UnboundedSender<RelayEvent>;

/// Drains relay events until every sender is gone. Each event is handled to
/// completion before the next one is looked at.
pub async fn run(mut broadcaster: StateBroadcaster, mut events: mpsc::UnboundedReceiver<RelayEvent>) {
    info!("Relay hub running in {} mode", broadcaster.mode());

    while let Some(event) = events.recv().await {
        match event {
            RelayEvent::Connected { id, addr, outbox } => {
                broadcaster.connect(id, outbox);
                info!(
                    "Client {} connected from {} ({} connected)",
                    id,
                    addr,
                    broadcaster.stats().clients
                );
            }
            RelayEvent::Message { id, line } => {
                if let Err(e) = broadcaster.receive(id, &line, Utc::now()) {
                    warn!("Dropping message from client {}: {}", id, e);
                }
            }
            RelayEvent::Disconnected { id } => {
                if broadcaster.disconnect(id) {
                    info!(
                        "Client {} disconnected ({} connected)",
                        id,
                        broadcaster.stats().clients
                    );
                }
            }
            RelayEvent::Stats { reply } => {
                let _ = reply.send(broadcaster.stats());
            }
        }
    }

    info!("Relay hub stopped");
}

/// Asks the hub for its current stats.
pub async fn query_stats(events: &EventSender) -> Option<RelayStats> {
    let (reply, rx) = oneshot::channel();
    events.send(RelayEvent::Stats { reply }).ok()?;
    rx.await.ok()
}
