//! CLI client for the `wheel_relay` daemon.
//!
//! Examples:
//!   wheel-cli push snapshot.json
//!   cat snapshot.json | wheel-cli push -
//!   wheel-cli listen
//!   wheel-cli latest
//!
//! By default it talks to 127.0.0.1:9876; override with `--addr host:port`.
//! `latest` relies on the relay running in replay mode: without a retained
//! message the first line it sees may just be a live broadcast.

use attention_wheel::WheelSnapshot;
use serde::Deserialize;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::process;
use std::time::Duration;

/// Direct reply to the sender of a message.
#[derive(Debug, Clone, Deserialize)]
struct Ack {
    response: String,
    timestamp: String,
}

/// What other clients receive when someone publishes.
#[derive(Debug, Clone, Deserialize)]
struct Envelope {
    timestamp: String,
    data: serde_json::Value,
}

fn usage() -> ! {
    eprintln!("wheel-cli (talks to wheel_relay @ 127.0.0.1:9876 by default)");
    eprintln!("Usage: wheel-cli [--addr host:port] <command> [args]\n");
    eprintln!("Commands:");
    eprintln!("  push <file|->               Publish a snapshot and print the ack");
    eprintln!("  listen                      Print broadcasts as they arrive");
    eprintln!("  latest                      Print the relay's retained snapshot, if any");
    eprintln!("                              (replay mode only; in other modes the first");
    eprintln!("                              line may be a live broadcast)");
    eprintln!("  paths                       Show the relay config file location");
    process::exit(1);
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let mut addr = "127.0.0.1:9876".to_string();
    if args.len() >= 2 && args[0] == "--addr" {
        addr = args[1].clone();
        args.drain(0..2);
    }

    if args.is_empty() {
        usage();
    }

    (addr, args)
}

fn read_payload(source: &str) -> Result<String, String> {
    let mut raw = String::new();
    if source == "-" {
        std::io::stdin()
            .read_to_string(&mut raw)
            .map_err(|e| format!("read stdin: {e}"))?;
    } else {
        raw = std::fs::read_to_string(source).map_err(|e| format!("read {source}: {e}"))?;
    }

    // Re-encode on one line; the relay frames messages by newline.
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| format!("payload is not JSON: {e}"))?;
    serde_json::to_string(&value).map_err(|e| format!("serialize: {e}"))
}

fn push(addr: &str, line: &str) -> Result<Ack, String> {
    let mut stream = TcpStream::connect(addr).map_err(|e| format!("connect: {e}"))?;
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .map_err(|e| format!("set_read_timeout: {e}"))?;
    let mut reader = BufReader::new(stream.try_clone().map_err(|e| format!("clone: {e}"))?);

    stream
        .write_all(line.as_bytes())
        .and_then(|_| stream.write_all(b"\n"))
        .map_err(|e| format!("send: {e}"))?;

    // A retained snapshot may be replayed before our ack; skip past it.
    loop {
        let mut resp_line = String::new();
        let n = reader
            .read_line(&mut resp_line)
            .map_err(|e| format!("recv: {e}"))?;
        if n == 0 {
            return Err("relay closed the connection".to_string());
        }
        if let Ok(ack) = serde_json::from_str::<Ack>(&resp_line) {
            return Ok(ack);
        }
    }
}

fn print_envelope(env: &Envelope) {
    match serde_json::from_value::<WheelSnapshot>(env.data.clone()) {
        Ok(snap) => {
            let r = snap.attention_wheel;
            println!(
                "[{}] task={} score={:.1}{} len={:.1} angle={:.1}° progress={:.1}%",
                env.timestamp,
                if r.current_task.is_empty() { "-" } else { r.current_task.as_str() },
                r.attention_score,
                if r.is_fatigued { " (fatigued)" } else { "" },
                r.pointer_length,
                r.rotation_angle,
                r.stream_progress,
            );
        }
        Err(_) => println!("[{}] {}", env.timestamp, env.data),
    }
}

fn listen(addr: &str) -> Result<(), String> {
    let stream = TcpStream::connect(addr).map_err(|e| format!("connect: {e}"))?;
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = line.map_err(|e| format!("recv: {e}"))?;
        match serde_json::from_str::<Envelope>(&line) {
            Ok(env) => print_envelope(&env),
            Err(_) => println!("{line}"),
        }
    }
    Ok(())
}

fn latest(addr: &str) -> Result<Option<Envelope>, String> {
    let stream = TcpStream::connect(addr).map_err(|e| format!("connect: {e}"))?;
    stream
        .set_read_timeout(Some(Duration::from_millis(500)))
        .map_err(|e| format!("set_read_timeout: {e}"))?;
    let mut reader = BufReader::new(stream);

    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => Ok(None),
        Ok(_) => serde_json::from_str(&line)
            .map(Some)
            .map_err(|e| format!("parse: {e}")),
        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
        Err(e) => Err(format!("recv: {e}")),
    }
}

fn main() {
    let (addr, args) = parse_args();
    let cmd = &args[0];

    let result = match cmd.as_str() {
        "push" => {
            if args.len() < 2 {
                usage();
            }
            read_payload(&args[1]).and_then(|line| push(&addr, &line)).map(|ack| {
                println!("{} at {}", ack.response, ack.timestamp);
            })
        }
        "listen" => listen(&addr),
        "latest" => latest(&addr).map(|env| match env {
            Some(env) => print_envelope(&env),
            None => println!("no snapshot retained"),
        }),
        "paths" => {
            match dirs_hint() {
                Some(p) => println!("Relay config: {p}"),
                None => println!("Relay config: <no config directory on this platform>"),
            }
            process::exit(0);
        }
        _ => usage(),
    };

    if let Err(e) = result {
        eprintln!("Failed: {e}");
        process::exit(1);
    }
}

fn dirs_hint() -> Option<String> {
    #[cfg(unix)]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return Some(format!("{xdg}/attention_wheel/relay.json"));
        }
        if let Ok(home) = std::env::var("HOME") {
            return Some(format!("{home}/.config/attention_wheel/relay.json"));
        }
    }
    #[cfg(windows)]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return Some(format!("{appdata}\\attention_wheel\\relay.json"));
        }
    }
    None
}
