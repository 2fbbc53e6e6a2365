//! `gifstudio convert` – stage a video, submit it, render progress and save the GIF.

use anyhow::{bail, Context, Result};
use gifstudio_core::checksum;
use gifstudio_core::config::StudioConfig;
use gifstudio_core::controller::JobState;
use gifstudio_core::intake::{probe_duration, CandidateFile};
use gifstudio_core::settings::{QualityPreset, SettingField};
use gifstudio_core::Studio;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct ConvertOptions {
    pub video: PathBuf,
    pub preset: Option<QualityPreset>,
    pub fps: Option<String>,
    pub scale: Option<String>,
    pub start: Option<String>,
    pub duration: Option<String>,
    pub no_loop: bool,
    pub output: Option<String>,
    pub out_dir: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub json: bool,
}

pub async fn run_convert(cfg: &StudioConfig, opts: ConvertOptions) -> Result<()> {
    let mut cfg = cfg.clone();
    if let Some(endpoint) = opts.endpoint.clone() {
        cfg.endpoint = endpoint;
    }
    let mut studio = Studio::from_config(&cfg)?;

    let file = CandidateFile::from_path(&opts.video)?;
    let duration = probe_duration(&file.data);
    studio
        .stage(file)
        .with_context(|| format!("cannot stage {}", opts.video.display()))?;
    if let Some(d) = duration {
        studio.on_metadata_available(d);
    }

    apply_settings(&mut studio, &opts)?;
    let s = studio.settings();
    tracing::info!(
        preset = s.quality.as_str(),
        fps = s.fps,
        scale = s.scale,
        start = s.start_time_sec,
        duration = s.duration_sec,
        custom = studio.settings_manager().is_custom(),
        "convert settings"
    );
    if !opts.json {
        println!(
            "Converting {} ({}, {} fps, {} px wide, start {} s, duration {} s)",
            opts.video.display(),
            s.quality.label(),
            s.fps,
            s.scale,
            s.start_time_sec,
            s.duration_sec
        );
    }

    let mut rx = studio.subscribe();
    let handle = studio.submit().context("submission was not accepted")?;

    let json = opts.json;
    let render = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().status();
            if json {
                if let Ok(line) = serde_json::to_string(&status) {
                    println!("{}", line);
                }
            } else {
                eprint!("\r  [{}] {:>5.1}%  ", status.state.as_str(), status.progress);
                let _ = std::io::stderr().flush();
            }
            if status.state != JobState::Submitting {
                break;
            }
        }
        if !json {
            eprintln!();
        }
    });

    let settled = handle.await.context("conversion task failed")?;
    let status = studio.status();
    let _ = render.await;

    match settled {
        JobState::Succeeded => {}
        JobState::Failed => bail!(
            "conversion failed: {}",
            status.error_detail.as_deref().unwrap_or("unknown error")
        ),
        other => bail!("conversion ended in unexpected state {}", other.as_str()),
    }

    let path = studio.download(opts.out_dir.as_deref(), opts.output.as_deref())?;
    let digest = checksum::sha256_path(&path)?;
    if opts.json {
        let summary = serde_json::json!({
            "state": settled,
            "path": path.display().to_string(),
            "bytes": status.artifact_bytes,
            "sha256": digest,
        });
        println!("{}", summary);
    } else {
        println!("Saved {}", path.display());
        println!("{}  {}", digest, path.display());
    }
    Ok(())
}

/// Preset first, then explicit field overrides on top of it.
fn apply_settings(studio: &mut Studio, opts: &ConvertOptions) -> Result<()> {
    if let Some(preset) = opts.preset {
        studio.apply_preset(preset);
    }
    let overrides = [
        (SettingField::Fps, &opts.fps),
        (SettingField::Scale, &opts.scale),
        (SettingField::StartTime, &opts.start),
        (SettingField::Duration, &opts.duration),
    ];
    for (field, raw) in overrides {
        if let Some(raw) = raw {
            studio.set_field(field, raw)?;
        }
    }
    if opts.no_loop {
        studio.set_loop(false);
    }
    Ok(())
}
