//! ffmpeg render backend.
//!
//! Every timeline entry becomes one segment: a looped still image plus
//! either its narration track or generated silence. Segments are
//! normalized to the output size and frame rate, their audio is padded or
//! trimmed to the entry duration, and the concat filter joins them in
//! timeline order.

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};

use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::process::command_exists;

use crate::export::{ExportJob, ExportProgress, ExportStage, ProgressCallback, RenderBackend};

/// Sample rate every segment's audio is resampled to before concatenation.
const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Renders through the `ffmpeg` command-line tool.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    binary: String,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run_ffmpeg(&self, job: &ExportJob, progress: Option<ProgressCallback>) -> SlidecastResult<()> {
        let args = build_args(job);
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SlidecastError::encode(format!("cannot start {}: {e}", self.binary)))?;
        tracing::info!(pid = child.id(), segments = job.timeline.len(), "ffmpeg started");

        let (Some(stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
            child.kill().ok();
            return Err(SlidecastError::encode("ffmpeg output pipes were not captured"));
        };

        // ffmpeg stalls once the stderr pipe is full.
        let stderr_reader = std::thread::spawn(move || {
            let mut text = String::new();
            stderr.read_to_string(&mut text).map(|_| text)
        });

        let total_secs = job.timeline.total_duration_secs();
        follow_progress(BufReader::new(stdout), total_secs, progress.as_ref());

        let status = child
            .wait()
            .map_err(|e| SlidecastError::encode(format!("failed to wait on ffmpeg: {e}")))?;
        let stderr_text = stderr_reader
            .join()
            .ok()
            .and_then(Result::ok)
            .unwrap_or_default();

        if !status.success() {
            return Err(SlidecastError::encode(format!(
                "ffmpeg exited with {status}: {}",
                last_lines(&stderr_text, 20)
            )));
        }

        if let Some(cb) = &progress {
            cb(ExportProgress {
                stage: ExportStage::Complete,
                encoded_secs: total_secs,
                total_secs,
            });
        }
        Ok(())
    }
}

impl RenderBackend for FfmpegBackend {
    fn render(&mut self, job: &ExportJob, progress: Option<ProgressCallback>) -> SlidecastResult<()> {
        self.run_ffmpeg(job, progress)
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Full ffmpeg argument list for `job`.
pub fn build_args(job: &ExportJob) -> Vec<String> {
    let settings = &job.settings;
    let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-y", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    // Inputs alternate image, audio, image, audio... so segment i reads
    // video from input 2i and audio from input 2i+1.
    for entry in job.timeline.iter() {
        let duration = format_secs(entry.duration_secs);
        args.extend([
            "-loop".to_string(),
            "1".to_string(),
            "-framerate".to_string(),
            settings.fps.to_string(),
            "-t".to_string(),
            duration.clone(),
            "-i".to_string(),
            entry.image_path.to_string_lossy().into_owned(),
        ]);
        match &entry.audio_path {
            Some(audio) => args.extend(["-i".to_string(), audio.to_string_lossy().into_owned()]),
            None => args.extend([
                "-f".to_string(),
                "lavfi".to_string(),
                "-t".to_string(),
                duration,
                "-i".to_string(),
                format!("anullsrc=channel_layout=stereo:sample_rate={AUDIO_SAMPLE_RATE}"),
            ]),
        }
    }

    args.extend([
        "-filter_complex".to_string(),
        build_filter_graph(job),
        "-map".to_string(),
        "[vout]".to_string(),
        "-map".to_string(),
        "[aout]".to_string(),
    ]);
    args.extend(codec_args(job));
    args.extend([
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-nostats".to_string(),
        job.output_path.to_string_lossy().into_owned(),
    ]);
    args
}

fn build_filter_graph(job: &ExportJob) -> String {
    let settings = &job.settings;
    let (w, h) = (settings.width, settings.height);
    let mut chains = Vec::with_capacity(job.timeline.len() * 2 + 1);
    let mut concat_inputs = String::new();

    for (i, entry) in job.timeline.iter().enumerate() {
        let duration = format_secs(entry.duration_secs);
        let video_input = 2 * i;
        let audio_input = 2 * i + 1;

        chains.push(format!(
            "[{video_input}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps={fps},\
             format=yuv420p,trim=duration={duration},setpts=PTS-STARTPTS[v{i}]",
            fps = settings.fps,
        ));
        chains.push(format!(
            "[{audio_input}:a]aresample={AUDIO_SAMPLE_RATE},\
             aformat=sample_fmts=fltp:channel_layouts=stereo,apad,\
             atrim=duration={duration},asetpts=PTS-STARTPTS[a{i}]"
        ));
        concat_inputs.push_str(&format!("[v{i}][a{i}]"));
    }

    chains.push(format!(
        "{concat_inputs}concat=n={}:v=1:a=1[vout][aout]",
        job.timeline.len()
    ));
    chains.join(";")
}

fn codec_args(job: &ExportJob) -> Vec<String> {
    let settings = &job.settings;
    let mut args = vec![
        "-c:v".to_string(),
        settings.video_codec.clone(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-r".to_string(),
        settings.fps.to_string(),
        "-c:a".to_string(),
        settings.audio_codec.clone(),
        "-ar".to_string(),
        AUDIO_SAMPLE_RATE.to_string(),
    ];

    let ext = job
        .output_path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if matches!(ext.as_str(), "mp4" | "m4v" | "mov") {
        args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    }
    args
}

fn format_secs(secs: f64) -> String {
    format!("{secs:.6}")
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}

/// Read ffmpeg's `-progress` key/value stream until it closes, reporting
/// each completed block.
fn follow_progress(reader: impl BufRead, total_secs: f64, progress: Option<&ProgressCallback>) {
    let mut encoded_secs = 0.0;
    for line in reader.lines().map_while(Result::ok) {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            // Both keys carry microseconds.
            "out_time_us" | "out_time_ms" => {
                if let Some(secs) = parse_out_time(value) {
                    encoded_secs = secs;
                }
            }
            "progress" => {
                if let Some(cb) = progress {
                    cb(ExportProgress {
                        stage: ExportStage::Encoding,
                        encoded_secs,
                        total_secs,
                    });
                }
            }
            _ => {}
        }
    }
}

fn parse_out_time(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|us| us.is_finite() && *us >= 0.0)
        .map(|us| us / 1_000_000.0)
}
