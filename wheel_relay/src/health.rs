//! Plain-text liveness endpoint for load balancers and process supervisors.
//!
//! Speaks just enough HTTP/1.1 to answer `GET /health`.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::broadcaster::RelayStats;
use crate::error::RelayError;
use crate::hub::{self, EventSender};

pub async fn serve(addr: &str, events: EventSender) -> Result<(), RelayError> {
    let listener = TcpListener::bind(addr).await?;
    info!("Health check listening on http://{}/health", addr);

    loop {
        let (stream, peer) = listener.accept().await?;
        let events = events.clone();
        tokio::spawn(async move {
            if let Err(e) = respond(stream, &events).await {
                debug!("Health probe from {} failed: {}", peer, e);
            }
        });
    }
}

async fn respond(stream: TcpStream, events: &EventSender) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut request_line = String::new();
    BufReader::new(reader).read_line(&mut request_line).await?;

    let stats = if is_health_request(&request_line) {
        hub::query_stats(events).await
    } else {
        None
    };
    let response = render(&request_line, stats);
    writer.write_all(response.as_bytes()).await?;
    writer.shutdown().await
}

fn is_health_request(request_line: &str) -> bool {
    let mut parts = request_line.split_whitespace();
    matches!(
        (parts.next(), parts.next()),
        (Some("GET"), Some("/health")) | (Some("GET"), Some("/"))
    )
}

fn render(request_line: &str, stats: Option<RelayStats>) -> String {
    let (status, body) = if !is_health_request(request_line) {
        ("404 Not Found", "not found\n".to_string())
    } else {
        match stats {
            Some(s) => (
                "200 OK",
                format!(
                    "OK\nclients: {}\nretained: {}\n",
                    s.clients,
                    if s.retained { "yes" } else { "no" }
                ),
            ),
            None => ("503 Service Unavailable", "relay hub is not running\n".to_string()),
        }
    };

    format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}
