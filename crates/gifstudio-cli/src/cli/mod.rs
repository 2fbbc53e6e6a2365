//! CLI for the gifstudio video-to-GIF converter.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gifstudio_core::config;
use gifstudio_core::settings::QualityPreset;
use std::path::PathBuf;

use commands::{run_convert, run_presets, run_probe, ConvertOptions};

/// Top-level CLI for gifstudio.
#[derive(Debug, Parser)]
#[command(name = "gifstudio")]
#[command(about = "gifstudio: turn short video clips into GIFs via a remote conversion service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Convert a local video (at most 10 MiB) to a GIF and save it.
    Convert {
        /// Path to the video file.
        video: PathBuf,

        /// Quality preset applied before any explicit override.
        #[arg(long, value_name = "PRESET")]
        preset: Option<QualityPreset>,

        /// Frames per second (overrides the preset).
        #[arg(long, value_name = "N")]
        fps: Option<String>,

        /// Output width in pixels (overrides the preset).
        #[arg(long, value_name = "N")]
        scale: Option<String>,

        /// Trim start in seconds.
        #[arg(long, value_name = "SECS")]
        start: Option<String>,

        /// Trim length in seconds; 0 keeps the rest of the clip.
        #[arg(long, value_name = "SECS")]
        duration: Option<String>,

        /// Clear the loop flag (recorded only; the service always loops).
        #[arg(long)]
        no_loop: bool,

        /// File name for the saved GIF (default: gif-<unix millis>.gif).
        #[arg(long, short = 'o', value_name = "NAME")]
        output: Option<String>,

        /// Directory for the saved GIF (default: config download_dir, else cwd).
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Conversion endpoint URL, overriding the config file.
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Print job status updates and the result as JSON lines.
        #[arg(long)]
        json: bool,
    },

    /// List the quality presets.
    Presets,

    /// Show what the studio would stage for a video: size, type, duration and trim window.
    Probe {
        /// Path to the video file.
        video: PathBuf,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Convert {
                video,
                preset,
                fps,
                scale,
                start,
                duration,
                no_loop,
                output,
                out_dir,
                endpoint,
                json,
            } => {
                let opts = ConvertOptions {
                    video,
                    preset,
                    fps,
                    scale,
                    start,
                    duration,
                    no_loop,
                    output,
                    out_dir,
                    endpoint,
                    json,
                };
                run_convert(&cfg, opts).await?;
            }
            CliCommand::Presets => run_presets(),
            CliCommand::Probe { video } => run_probe(&video)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
