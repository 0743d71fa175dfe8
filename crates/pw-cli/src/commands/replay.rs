//! Replay a scripted event stream through the simulated watch.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;

use crate::Config;
use crate::scenario;
use crate::simulator::Simulator;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Event script (JSON lines). Reads stdin when omitted.
    pub script: Option<PathBuf>,

    /// Wall-clock time of the first event (RFC 3339). Defaults to now.
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,

    /// Print the session summary as JSON instead of the final screen.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &ReplayArgs, config: &Config) -> Result<()> {
    let reader: Box<dyn BufRead> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    replay(reader, writer, args, config)
}

fn replay<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    args: &ReplayArgs,
    config: &Config,
) -> Result<()> {
    let script = scenario::parse(reader).context("failed to parse event script")?;
    tracing::debug!(events = script.len(), "loaded event script");

    let epoch = args.start.unwrap_or_else(Utc::now);
    let mut transcript = Vec::new();
    let mut sim = Simulator::new(config, epoch, &mut transcript)?;
    for line in script {
        sim.advance_to(line.at)?;
        sim.dispatch(line.event)?;
    }
    let controller = sim.finish();

    if args.json {
        writeln!(
            writer,
            "{}",
            serde_json::to_string_pretty(&controller.summary())?
        )?;
    } else {
        writer.write_all(&transcript)?;
        writeln!(writer, "---")?;
        writeln!(writer, "{}", controller.view())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    const WALK: &str = r#"
{"at": 0, "event": "start_monitoring"}
{"at": 5, "event": "steps", "total": 12}
{"at": 6, "event": "confirm"}
{"at": 7, "event": "location", "lat": 48.0, "lon": 11.0}
{"at": 8, "event": "location", "lat": 48.000026979648176, "lon": 11.0}
{"at": 9, "event": "location", "lat": 48.00007194572847, "lon": 11.0}
{"at": 10, "event": "collect_litter"}
{"at": 12, "event": "pause"}
{"at": 30, "event": "resume"}
{"at": 32, "event": "end"}
"#;

    fn args(json: bool) -> ReplayArgs {
        ReplayArgs {
            script: None,
            start: Some("2025-01-01T00:00:00Z".parse().unwrap()),
            json,
        }
    }

    fn run_walk(json: bool) -> String {
        let mut output = Vec::new();
        replay(WALK.as_bytes(), &mut output, &args(json), &Config::default()).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_replay_prints_transitions_and_summary() {
        assert_snapshot!(run_walk(false), @r"
        [    0s] monitoring
        [    5s] notification: Activity detected: Looks like you're walking. Start a litter pick?
        [    5s] monitoring + prompt
        [    6s] active
        [   12s] paused
        [   30s] active
        [   32s] summary
        ---
        [Summary]
        Time: 00:08
        Distance: 8 m
        Steps: 0
        Litter: 1
        Map: 3 path points, 1 litter points
        Bounds: 48.00000,11.00000 .. 48.00007,11.00000
        ");
    }

    #[test]
    fn test_replay_json_exports_summary() {
        let output = run_walk(true);
        let summary: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(summary["duration_secs"], 8);
        assert_eq!(summary["litter_count"], 1);
        assert_eq!(summary["path"].as_array().unwrap().len(), 3);
        assert_eq!(summary["started_at"], "2025-01-01T00:00:06Z");
        let distance = summary["distance_m"].as_f64().unwrap();
        assert!((distance - 8.0).abs() < 1e-3, "distance={distance}");
    }

    #[test]
    fn test_replay_json_without_session_is_null() {
        let mut output = Vec::new();
        let script = "{\"at\": 0, \"event\": \"start_monitoring\"}\n";
        replay(script.as_bytes(), &mut output, &args(true), &Config::default()).unwrap();
        assert_eq!(String::from_utf8(output).unwrap().trim(), "null");
    }

    #[test]
    fn test_replay_rejects_malformed_script() {
        let mut output = Vec::new();
        let err = replay(
            "not json\n".as_bytes(),
            &mut output,
            &args(false),
            &Config::default(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("line 1"));
    }
}
