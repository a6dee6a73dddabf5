use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;

use pose_coach::{
    CoachSession, EngineConfig, ScoringMode,
    compare::pose_label,
    normalize::normalize,
    replay::{self, ReferenceFile, SessionFile},
    types::PoseLabel,
};

#[derive(Parser, Debug)]
#[command(
    name = "pose-coach",
    about = "Replay recorded landmark streams through the coaching engine"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a recorded session against a reference and print the report
    Replay {
        #[arg(long, value_name = "PATH")]
        reference: PathBuf,
        #[arg(long, value_name = "PATH")]
        session: PathBuf,
        /// TOML engine configuration
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
        /// Overrides the mode from the config file (dance|gym)
        #[arg(long)]
        mode: Option<ScoringMode>,
    },
    /// Print the pose label of every reference frame
    Inspect {
        #[arg(long, value_name = "PATH")]
        reference: PathBuf,
    },
}

#[derive(Serialize)]
struct FrameLabel {
    index: usize,
    time: f32,
    label: PoseLabel,
    name: &'static str,
}

fn main() -> Result<()> {
    env_logger::init();

    match Args::parse().command {
        Command::Replay {
            reference,
            session,
            config,
            mode,
        } => run_replay(reference, session, config, mode),
        Command::Inspect { reference } => run_inspect(reference),
    }
}

fn run_replay(
    reference: PathBuf,
    session: PathBuf,
    config: Option<PathBuf>,
    mode: Option<ScoringMode>,
) -> Result<()> {
    let mut config = match config {
        Some(path) => EngineConfig::load(&path)?,
        None => EngineConfig::default(),
    };
    if let Some(mode) = mode {
        config.mode = mode;
    }

    let (timeline, reference_aspect) = ReferenceFile::load(&reference)?.into_timeline()?;
    let recording = SessionFile::load(&session)?;
    let mut coach = CoachSession::new(config, Arc::new(timeline))
        .context("failed to start coaching session")?;

    let pb = create_progress_bar(recording.events.len() as u64)?;
    let report = replay::replay(&mut coach, &recording, reference_aspect, |_| pb.inc(1));
    pb.finish_with_message("replay complete");

    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    println!("{json}");
    Ok(())
}

fn run_inspect(reference: PathBuf) -> Result<()> {
    let file = ReferenceFile::load(&reference)?;
    let aspect = file.aspect_ratio;

    let labels: Vec<FrameLabel> = file
        .frames
        .par_iter()
        .enumerate()
        .map(|(index, frame)| {
            let label = pose_label(&normalize(&frame.pose, aspect));
            FrameLabel {
                index,
                time: frame.time,
                label,
                name: label.label(),
            }
        })
        .collect();

    let json = serde_json::to_string_pretty(&labels).context("failed to serialize labels")?;
    println!("{json}");
    Ok(())
}

fn create_progress_bar(total: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ticks ({eta}) {msg}",
    )
    .context("invalid progress template")?
    .progress_chars("=>-");
    pb.set_style(style);
    Ok(pb)
}
