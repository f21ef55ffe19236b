// src/bin/tracker.rs
// DOCUMENTATION: Transporter-side tracking agent
// PURPOSE: Feed device fixes (`lat,lng` per line on stdin) into continuous
// tracking for one booking
//
// Usage: vango-tracker --booking <id> --transporter <id> [--interval <secs>]

use std::env;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use vango::config::{self, Config};
use vango::models::Coordinates;
use vango::services::{LocationService, WatchPositionSource};

struct Args {
    booking_id: String,
    transporter_id: String,
    interval: Option<u64>,
}

fn parse_args() -> Result<Args, String> {
    let mut booking_id = None;
    let mut transporter_id = None;
    let mut interval = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--booking" => booking_id = args.next(),
            "--transporter" => transporter_id = args.next(),
            "--interval" => {
                let value = args.next().ok_or("--interval needs a value")?;
                interval = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("invalid interval: {}", value))?,
                );
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }

    Ok(Args {
        booking_id: booking_id
            .filter(|b| !b.is_empty())
            .ok_or("--booking is required")?,
        transporter_id: transporter_id
            .filter(|t| !t.is_empty())
            .ok_or("--transporter is required")?,
        interval,
    })
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", &config.log_level);
    }
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Usage: vango-tracker --booking <id> --transporter <id> [--interval <secs>]");
            process::exit(2);
        }
    };

    if let Err(e) = config.validate() {
        log::error!("Configuration error: {}", e);
        process::exit(1);
    }

    let backend = match config::init_backend(&config, reqwest::Client::new()).await {
        Ok(backend) => backend,
        Err(e) => {
            log::error!("Failed to connect to backend: {}", e);
            process::exit(1);
        }
    };

    let service = LocationService::new(&backend);
    service
        .start_tracking(&args.booking_id, &args.transporter_id)
        .await;

    let (feed, source) = WatchPositionSource::channel();
    let period = Duration::from_secs(args.interval.unwrap_or(config.tracking_interval_secs).max(1));
    let handle = service.start_continuous_tracking(
        &args.booking_id,
        &args.transporter_id,
        Arc::new(source),
        period,
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => match Coordinates::parse(&line) {
                    Some(fix) => feed.publish(fix),
                    None if line.trim().is_empty() => {}
                    None => log::warn!("Ignoring malformed fix: {:?}", line),
                },
                Ok(None) => {
                    log::info!("Position input closed");
                    break;
                }
                Err(e) => {
                    log::error!("Failed reading position input: {}", e);
                    break;
                }
            }
        }
    }

    LocationService::stop_continuous_tracking(handle).await;
    drop(feed);
    log::info!("Tracking for booking {} finished", args.booking_id);
}
