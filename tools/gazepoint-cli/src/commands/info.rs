//! Show calibration information.

use std::path::PathBuf;

use gazepoint_model::calibration::CalibrationSet;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let calibration = CalibrationSet::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load calibration: {e}"))?;

    println!("Calibration: {}", path.display());
    println!("  Version: {}", calibration.version);
    println!("  Created: {}", calibration.created_at);
    println!(
        "  Screen: {}x{}",
        calibration.screen.width, calibration.screen.height
    );
    println!("  Total samples: {}", calibration.total_samples());
    println!();

    println!("Records:");
    for (i, record) in calibration.records.iter().enumerate() {
        let (lx, ly) = record.features.left_offset();
        let (rx, ry) = record.features.right_offset();
        println!(
            "  {:>2}. ({:>6.0}, {:>6.0})  samples {:>3}  iris L ({:+.2}, {:+.2}) R ({:+.2}, {:+.2})  aperture {:.2}/{:.2}",
            i + 1,
            record.target_x,
            record.target_y,
            record.sample_count,
            lx,
            ly,
            rx,
            ry,
            record.features.left_aperture(),
            record.features.right_aperture(),
        );
    }

    Ok(())
}
