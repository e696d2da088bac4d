//! Slidecast CLI: turn a slide deck into a narrated video.
//!
//! Usage:
//!   slidecast <INPUT_DECK> <OUTPUT_VIDEO> [OPTIONS]   Convert a deck
//!   slidecast --check                                 Check external tools
//!   slidecast --save-config [OPTIONS]                 Store options as defaults

use std::path::PathBuf;

use clap::Parser;
use slidecast_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "slidecast",
    about = "Convert a slide deck with speaker notes into a narrated video",
    version,
    author
)]
struct Cli {
    /// Presentation to convert (.pptx, .pptm, .ppsx)
    #[arg(required_unless_present_any = ["check", "save_config"])]
    input_deck: Option<PathBuf>,

    /// Video file to write (e.g. talk.mp4)
    #[arg(required_unless_present_any = ["check", "save_config"])]
    output_video: Option<PathBuf>,

    /// Synthesizer voice [default: en-US-JennyNeural]
    #[arg(long)]
    voice: Option<String>,

    /// Seconds to show slides that have no notes [default: 5]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    slide_duration: Option<u32>,

    /// Working directory for intermediate files; must be absent or empty [default: temp]
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Number of slides narrated in parallel [default: 4]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    jobs: Option<u32>,

    /// Write the assembled timeline as JSON
    #[arg(long)]
    dump_timeline: Option<PathBuf>,

    /// Write subtitles (.srt, or .vtt for WebVTT)
    #[arg(long)]
    subtitles: Option<PathBuf>,

    /// Save the effective settings as the default configuration
    #[arg(long)]
    save_config: bool,

    /// Check that the external tools are installed, then exit
    #[arg(long)]
    check: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Config file values with command-line overrides applied, validated.
    fn effective_config(&self) -> anyhow::Result<AppConfig> {
        self.apply_overrides(AppConfig::load())
    }

    fn apply_overrides(&self, mut config: AppConfig) -> anyhow::Result<AppConfig> {
        if let Some(voice) = &self.voice {
            config.narration.voice = voice.clone();
        }
        if let Some(secs) = self.slide_duration {
            config.narration.fallback_duration_secs = secs;
        }
        if let Some(jobs) = self.jobs {
            config.narration.jobs = jobs as usize;
        }
        if let Some(work_dir) = &self.work_dir {
            config.work_dir = work_dir.clone();
        }
        config.validate().map_err(|e| {
            anyhow::anyhow!("Invalid settings (from {}): {e}", AppConfig::config_path().display())
        })?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.effective_config()?;

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    slidecast_common::logging::init_logging(&logging);
    tracing::debug!(config = ?config, "Effective configuration");

    if cli.save_config {
        config.save()?;
        println!("Saved configuration to {}", AppConfig::config_path().display());
    }

    if cli.check {
        return commands::check::run(&config);
    }

    match (cli.input_deck, cli.output_video) {
        (Some(input), Some(output)) => {
            commands::convert::run(input, output, &config, cli.dump_timeline, cli.subtitles).await
        }
        (None, None) if cli.save_config => Ok(()),
        _ => Err(anyhow::anyhow!("an input deck and an output video are required")),
    }
}
