//! Audio duration measurement with `ffprobe`.

use std::path::Path;
use std::process::Command;

/// Length of the media file at `path` in seconds.
///
/// Returns `None` when the probe is unavailable, fails, or reports
/// something that is not a positive finite duration.
pub fn probe_duration_secs(path: &Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .ok()?;

    if !output.status.success() {
        tracing::debug!(
            path = %path.display(),
            status = %output.status,
            "ffprobe could not read audio"
        );
        return None;
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_duration(stdout: &str) -> Option<f64> {
    let secs = stdout.lines().next()?.trim().parse::<f64>().ok()?;
    (secs.is_finite() && secs > 0.0).then_some(secs)
}
