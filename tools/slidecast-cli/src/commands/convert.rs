//! Convert a deck into a narrated video.

use std::io::Write;
use std::path::PathBuf;

use slidecast_common::config::AppConfig;
use slidecast_pipeline::Pipeline;
use slidecast_render_engine::ExportProgress;

pub async fn run(
    input: PathBuf,
    output: PathBuf,
    config: &AppConfig,
    dump_timeline: Option<PathBuf>,
    subtitles: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("Converting deck: {}", input.display());
    println!("  Output: {}", output.display());
    println!("  Voice: {}", config.narration.voice);
    println!(
        "  Slides without notes: {}s",
        config.narration.fallback_duration_secs
    );
    println!(
        "  Video: {}x{} @ {}fps ({}/{})",
        config.encode.width,
        config.encode.height,
        config.encode.fps,
        config.encode.video_codec,
        config.encode.audio_codec
    );

    let mut pipeline =
        Pipeline::from_config(config).map_err(|e| anyhow::anyhow!("Invalid settings: {e}"))?;
    pipeline.options_mut().dump_timeline = dump_timeline;
    pipeline.options_mut().subtitles = subtitles;

    let progress_cb: Box<dyn Fn(ExportProgress) + Send> = Box::new(|p: ExportProgress| {
        print!(
            "\r  Encoding: {:.1}% ({:.1}s of {:.1}s)  ",
            p.fraction() * 100.0,
            p.encoded_secs,
            p.total_secs,
        );
        std::io::stdout().flush().ok();
    });

    match pipeline.run(&input, &output, Some(progress_cb)).await {
        Ok(summary) => {
            println!("\nConversion complete: {}", summary.output.display());
            println!("  Slides: {} ({} narrated)", summary.slides, summary.narrated);
            println!("  Duration: {:.1}s", summary.total_duration_secs);
            if let Some(subs) = &summary.subtitles {
                println!("  Subtitles: {}", subs.display());
            }
            println!("  Took: {:.1}s", summary.elapsed_secs);
            if let Some(cleanup) = &summary.cleanup_error {
                println!("  Warning: working directory was not fully removed: {cleanup}");
            }
            Ok(())
        }
        Err(e) => {
            println!();
            Err(anyhow::anyhow!("Conversion failed during {} stage: {e}", e.stage()))
        }
    }
}
