//! `gifstudio probe` – inspect a video without converting it.

use anyhow::Result;
use gifstudio_core::intake::{probe_duration, CandidateFile, MAX_UPLOAD_BYTES};
use gifstudio_core::settings::SettingsManager;
use std::path::Path;

pub fn run_probe(path: &Path) -> Result<()> {
    let file = CandidateFile::from_path(path)?;
    let size_mib = file.size() as f64 / 1_048_576.0;

    println!("file:      {}", file.name);
    println!("type:      {}", file.mime);
    println!(
        "size:      {:.1} MiB{}",
        size_mib,
        if file.size() > MAX_UPLOAD_BYTES { " (over the 10 MiB limit)" } else { "" }
    );
    if !file.is_video() {
        println!("note:      not recognized as a video; a drop would be ignored");
    }

    match probe_duration(&file.data) {
        Some(duration) => {
            let mut settings = SettingsManager::new();
            settings.apply_default_trim(duration);
            let s = settings.settings();
            println!("duration:  {:.2} s", duration);
            println!(
                "trim:      start {} s, duration {} s",
                s.start_time_sec, s.duration_sec
            );
        }
        None => {
            println!("duration:  unknown");
            println!("trim:      start 0 s, duration 0 s (whole clip)");
        }
    }
    Ok(())
}
