use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::process;
use std::thread;
use std::time::{Duration, Instant};

use attention_wheel::{WheelConfig, WheelState};

const DEFAULT_ADDR: &str = "127.0.0.1:9876";

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && (args[1] == "--help" || args[1] == "-h" || args[1] == "help") {
        print_help();
        return;
    }
    if args.len() >= 2 && args[1] == "drive" {
        if let Err(e) = run_drive(&args[2..]) {
            eprintln!("drive failed: {e}");
            process::exit(1);
        }
        return;
    }
    if args.len() >= 2 && args[1] != "demo" {
        eprintln!("Unknown command: {}", args[1]);
        print_help();
        process::exit(2);
    }

    run_demo();
}

fn print_help() {
    println!("attention_wheel (livestream attention wheel simulation)");
    println!("usage:");
    println!("  cargo run                      headless demo, prints status");
    println!("  cargo run -- demo              same as above");
    println!("  cargo run -- drive [--addr host:port] [--fps N] [--ticks N]");
    println!("                                 run the tick loop and push snapshots to wheel_relay");
    println!("  cargo run -- --help");
}

/// Headless run over a simulated clock: one tick per 60 Hz frame for
/// one full pointer revolution.
fn run_demo() {
    let cfg = WheelConfig::default();
    let frame = Duration::from_micros(16_667);
    let t0 = Instant::now();
    let mut wheel = match WheelState::new(cfg, t0) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("invalid wheel config: {e}");
            process::exit(1);
        }
    };

    let revolution = (std::f64::consts::TAU / wheel.pointer().config().rotation_speed).ceil() as u32;
    let mut now = t0;
    for t in 0..revolution {
        now += frame;
        let entered = wheel.tick(now);
        if entered || t % 600 == 0 {
            let snap = wheel.build_snapshot(now);
            let r = &snap.attention_wheel;
            println!(
                "t={t:5} task={:<17} angle={:7.2}° len={:6.1} score={:5.1}{} progress={:5.1}%",
                r.current_task,
                r.rotation_angle,
                r.pointer_length,
                r.attention_score,
                if r.is_fatigued { " (fatigued)" } else { "" },
                r.stream_progress,
            );
        }
    }
}

struct DriveArgs {
    addr: String,
    fps: u32,
    ticks: Option<u64>,
}

fn parse_drive_args(args: &[String]) -> Result<DriveArgs, String> {
    let mut out = DriveArgs {
        addr: DEFAULT_ADDR.to_string(),
        fps: 60,
        ticks: None,
    };
    let mut it = args.iter();
    while let Some(flag) = it.next() {
        let value = it.next().ok_or_else(|| format!("{flag} needs a value"))?;
        match flag.as_str() {
            "--addr" => out.addr = value.clone(),
            "--fps" => {
                out.fps = value
                    .parse::<u32>()
                    .map_err(|_| "fps must be a number (1-1000)".to_string())?
                    .clamp(1, 1000)
            }
            "--ticks" => {
                out.ticks = Some(
                    value
                        .parse()
                        .map_err(|_| "ticks must be a positive number".to_string())?,
                )
            }
            other => return Err(format!("unknown flag {other}")),
        }
    }
    Ok(out)
}

fn run_drive(args: &[String]) -> Result<(), String> {
    let args = parse_drive_args(args)?;
    let mut stream = TcpStream::connect(&args.addr).map_err(|e| format!("connect {}: {e}", args.addr))?;
    let reader = BufReader::new(stream.try_clone().map_err(|e| format!("clone: {e}"))?);

    // Acks and broadcasts from other clients arrive on the same socket.
    thread::spawn(move || {
        let mut acks = 0u64;
        for line in reader.lines() {
            let Ok(line) = line else { break };
            if line.contains("\"response\"") {
                acks += 1;
                if acks % 600 == 0 {
                    println!("relay acked {acks} snapshots");
                }
            } else {
                println!("relay: {line}");
            }
        }
    });

    let mut wheel = WheelState::new(WheelConfig::default(), Instant::now())
        .map_err(|e| format!("invalid wheel config: {e}"))?;
    let frame = Duration::from_millis((1000 / args.fps).max(1) as u64);

    let mut sent = 0u64;
    loop {
        if args.ticks.is_some_and(|n| sent >= n) {
            break;
        }
        thread::sleep(frame);

        let now = Instant::now();
        wheel.tick(now);
        let line = wheel
            .build_snapshot(now)
            .to_json()
            .map_err(|e| format!("serialize: {e}"))?;
        stream
            .write_all(line.as_bytes())
            .and_then(|_| stream.write_all(b"\n"))
            .map_err(|e| format!("send: {e}"))?;
        sent += 1;
    }

    println!("sent {sent} snapshots to {}", args.addr);
    Ok(())
}
