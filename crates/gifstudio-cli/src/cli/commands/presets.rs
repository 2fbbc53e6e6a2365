//! `gifstudio presets` – print the preset table.

use gifstudio_core::settings::QualityPreset;

pub fn run_presets() {
    println!("{:<8} {:<5} {:<6} {}", "PRESET", "FPS", "SCALE", "LABEL");
    for preset in QualityPreset::ALL {
        let v = preset.values();
        let marker = if preset == QualityPreset::default() { " (default)" } else { "" };
        println!(
            "{:<8} {:<5} {:<6} {}{}",
            preset.as_str(),
            v.fps,
            v.scale,
            preset.label(),
            marker
        );
    }
}
