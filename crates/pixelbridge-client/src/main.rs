use std::io::Read;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use pixelbridge_client::{EventData, PixelSnippet, ServerTracker, TrackerConfig};

/// Accepts either a single event or an array of events on input.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventOrBatch {
    Single(Box<EventData>),
    Batch(Vec<EventData>),
}

fn usage() -> ! {
    eprintln!(
        "usage:\n  pixelbridge send [FILE]   submit event JSON (object or array) from FILE or stdin\n  \
         pixelbridge snippet       print the browser pixel markup\n\n\
         configuration is read from PIXELBRIDGE_* environment variables"
    );
    std::process::exit(2)
}

fn read_input(path: Option<&str>) -> Result<String> {
    let mut raw = String::new();
    match path {
        Some(path) => {
            raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        }
        None => {
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("reading stdin")?;
        }
    }
    Ok(raw)
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Send { path: Option<&'a str> },
    Snippet,
}

fn parse_command(args: &[String]) -> Option<Command<'_>> {
    match args.get(1).map(String::as_str) {
        Some("send") => Some(Command::Send {
            path: args.get(2).map(String::as_str),
        }),
        Some("snippet") => Some(Command::Snippet),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let Some(command) = parse_command(&args) else {
        usage()
    };

    pixelbridge_client::logging::init()?;

    match command {
        Command::Send { path } => {
            let config = TrackerConfig::from_env()?;
            let raw = read_input(path)?;
            let events = match serde_json::from_str::<EventOrBatch>(&raw)
                .context("input is not an event object or array")?
            {
                EventOrBatch::Single(event) => vec![*event],
                EventOrBatch::Batch(events) => events,
            };

            let tracker = ServerTracker::new(config)?;
            let response = tracker.send_batch(&events).await?;
            info!(
                events_received = response.events_received,
                "submission complete"
            );
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Snippet => {
            let config = TrackerConfig::from_env()?;
            let snippet = PixelSnippet::new(config.pixel_id)?;
            println!("{}", snippet.script_tag());
            println!("{}", snippet.noscript_tag());
        }
    }

    Ok(())
}
