use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::broadcaster::ClientId;
use crate::error::RelayError;
use crate::hub::{EventSender, RelayEvent};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Accepts connections forever, one handler task per client.
pub async fn serve(listener: TcpListener, events: EventSender) -> Result<(), RelayError> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
        let events = events.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, id, events).await {
                error!("Client {} ({}) handler error: {}", id, addr, e);
            }
        });
    }
}

async fn handle_client(stream: TcpStream, id: ClientId, events: EventSender) -> Result<(), RelayError> {
    let addr = stream.peer_addr()?;
    let (reader, mut writer) = stream.into_split();
    let (outbox, mut queue) = mpsc::unbounded_channel::<String>();

    events
        .send(RelayEvent::Connected { id, addr, outbox })
        .map_err(|_| RelayError::HubClosed)?;

    // Ends when the hub drops our outbox or the peer stops accepting writes.
    tokio::spawn(async move {
        while let Some(line) = queue.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err()
                || writer.write_all(b"\n").await.is_err()
            {
                break;
            }
        }
    });

    let mut lines = BufReader::new(reader).lines();
    let result = loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                if events.send(RelayEvent::Message { id, line }).is_err() {
                    break Err(RelayError::HubClosed);
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(RelayError::Io(e)),
        }
    };

    let _ = events.send(RelayEvent::Disconnected { id });
    if result.is_ok() {
        info!("Client {} closed the connection", id);
    }
    result
}
