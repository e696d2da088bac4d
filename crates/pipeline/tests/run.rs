//! End-to-end runs against fake backends.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::WorkingScope;
use slidecast_deck_model::Timeline;
use slidecast_deck_reader::{ContentExtractor, DeckRenderer, NotesReader, RenderSession};
use slidecast_narration::{NarrationGenerator, SpeechSynthesizer};
use slidecast_pipeline::{Pipeline, PipelineOptions};
use slidecast_render_engine::{
    EncodeSettings, ExportJob, ProgressCallback, RenderBackend, VideoAssemblyDriver,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailAt {
    Nothing,
    Open,
    SlideRender(usize),
    Synthesis,
    Encode,
}

struct FakeNotes(Vec<String>);

impl NotesReader for FakeNotes {
    fn read_notes(&self, _deck_path: &Path) -> SlidecastResult<Vec<String>> {
        Ok(self.0.clone())
    }
}

struct FakeRenderer {
    slides: usize,
    fail: FailAt,
    available: bool,
}

struct FakeSession {
    slides: usize,
    fail: FailAt,
}

impl DeckRenderer for FakeRenderer {
    fn open(&self, _deck: &Path, scope: &WorkingScope) -> SlidecastResult<Box<dyn RenderSession>> {
        // Leave something behind so cleanup has work to do.
        std::fs::write(scope.artifact_path("deck.pdf"), b"pdf")?;
        if self.fail == FailAt::Open {
            return Err(SlidecastError::extraction("renderer crashed"));
        }
        Ok(Box::new(FakeSession {
            slides: self.slides,
            fail: self.fail,
        }))
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn name(&self) -> &str {
        "fake-renderer"
    }
}

impl RenderSession for FakeSession {
    fn slide_count(&self) -> usize {
        self.slides
    }

    fn export_slide(&mut self, index: usize, output: &Path) -> SlidecastResult<()> {
        if self.fail == FailAt::SlideRender(index) {
            return Err(SlidecastError::slide_render(index, "export failed"));
        }
        std::fs::write(output, b"png")?;
        Ok(())
    }

    fn close(self: Box<Self>) -> SlidecastResult<()> {
        Ok(())
    }
}

/// Speaks at 0.4 seconds per word.
struct FakeSynth {
    fail: bool,
}

impl SpeechSynthesizer for FakeSynth {
    fn synthesize(&self, text: &str, _voice: &str, output: &Path) -> SlidecastResult<Option<f64>> {
        if self.fail {
            return Err(SlidecastError::synthesis("service unreachable"));
        }
        std::fs::write(output, b"ID3")?;
        Ok(Some(0.4 * text.split_whitespace().count() as f64))
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "fake-tts"
    }
}

/// Records the job, checks every input exists, writes the output.
struct FakeEncoder {
    fail: bool,
    jobs: Arc<Mutex<Vec<ExportJob>>>,
}

impl RenderBackend for FakeEncoder {
    fn render(&mut self, job: &ExportJob, _progress: Option<ProgressCallback>) -> SlidecastResult<()> {
        for entry in job.timeline.iter() {
            assert!(entry.image_path.is_file());
            if let Some(audio) = &entry.audio_path {
                assert!(audio.is_file());
            }
        }
        self.jobs.lock().unwrap().push(job.clone());
        std::fs::write(&job.output_path, b"mp4")?;
        if self.fail {
            return Err(SlidecastError::encode("encoder exited with 1"));
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "fake-encoder"
    }
}

struct Harness {
    root: tempfile::TempDir,
    deck: PathBuf,
    work_dir: PathBuf,
    output: PathBuf,
    pipeline: Pipeline,
    jobs: Arc<Mutex<Vec<ExportJob>>>,
}

fn harness(notes: &[&str], fallback_secs: f64, fail: FailAt) -> Harness {
    let root = tempfile::tempdir().unwrap();
    let deck = root.path().join("talk.pptx");
    std::fs::write(&deck, b"deck").unwrap();
    let work_dir = root.path().join("temp");
    let output = root.path().join("out").join("talk.mp4");
    let jobs = Arc::new(Mutex::new(Vec::new()));

    let extractor = ContentExtractor::new(
        Box::new(FakeRenderer {
            slides: notes.len(),
            fail,
            available: true,
        }),
        Box::new(FakeNotes(notes.iter().map(|s| s.to_string()).collect())),
    );
    let narrator = NarrationGenerator::new(
        Arc::new(FakeSynth {
            fail: fail == FailAt::Synthesis,
        }),
        "en-US-JennyNeural",
        fallback_secs,
    )
    .unwrap()
    .with_jobs(2);
    let driver = VideoAssemblyDriver::new(Box::new(FakeEncoder {
        fail: fail == FailAt::Encode,
        jobs: Arc::clone(&jobs),
    }));
    let options = PipelineOptions {
        work_dir: work_dir.clone(),
        encode: EncodeSettings::default(),
        dump_timeline: None,
        subtitles: None,
    };

    Harness {
        root,
        deck,
        work_dir,
        output,
        pipeline: Pipeline::new(extractor, narrator, driver, options),
        jobs,
    }
}

#[tokio::test]
async fn test_run_produces_video_and_removes_work_dir() {
    let mut h = harness(&["Hello there friend", "", "Thanks everyone"], 5.0, FailAt::Nothing);

    let summary = h.pipeline.run(&h.deck, &h.output, None).await.unwrap();
    assert_eq!(summary.slides, 3);
    assert_eq!(summary.narrated, 2);
    assert!((summary.total_duration_secs - 7.0).abs() < 1e-9);
    assert_eq!(summary.output, h.output);
    assert!(summary.cleanup_error.is_none());
    assert!(h.output.is_file());
    assert!(!h.work_dir.exists());

    // No partial file left beside the output.
    let siblings: Vec<_> = std::fs::read_dir(h.output.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(siblings, vec![std::ffi::OsString::from("talk.mp4")]);
}

#[tokio::test]
async fn test_silent_slide_keeps_its_place_before_narrated_one() {
    let mut h = harness(&["", "Now we talk"], 5.0, FailAt::Nothing);
    h.pipeline.run(&h.deck, &h.output, None).await.unwrap();

    let jobs = h.jobs.lock().unwrap();
    let entries = jobs[0].timeline.entries();
    assert_eq!(entries[0].slide_index, 0);
    assert!(entries[0].audio_path.is_none());
    assert_eq!(entries[0].duration_secs, 5.0);
    assert_eq!(entries[1].slide_index, 1);
    assert!(entries[1].audio_path.is_some());
    assert!(entries[0].image_path.ends_with("slide_0.png"));
    assert!(entries[1].image_path.ends_with("slide_1.png"));
}

async fn assert_failed_run_is_clean(fail: FailAt, expected_stage: &str) {
    let mut h = harness(&["one", "two words", "three more words"], 5.0, fail);

    let err = h.pipeline.run(&h.deck, &h.output, None).await.unwrap_err();
    assert_eq!(err.stage(), expected_stage, "{fail:?}: {err}");
    assert!(!h.work_dir.exists(), "{fail:?} left the working directory behind");
    assert!(!h.output.exists(), "{fail:?} produced output");
    if let Some(parent) = h.output.parent().filter(|p| p.exists()) {
        assert_eq!(std::fs::read_dir(parent).unwrap().count(), 0, "{fail:?} left a partial file");
    }
}

#[tokio::test]
async fn test_failure_at_every_stage_cleans_up() {
    assert_failed_run_is_clean(FailAt::Open, "extract").await;
    assert_failed_run_is_clean(FailAt::SlideRender(1), "extract").await;
    assert_failed_run_is_clean(FailAt::Synthesis, "narrate").await;
    assert_failed_run_is_clean(FailAt::Encode, "render").await;
}

#[tokio::test]
async fn test_zero_fallback_assembles_but_render_rejects() {
    let mut h = harness(&["", ""], 0.0, FailAt::Nothing);
    let dump = h.root.path().join("timeline.json");
    h.pipeline.options_mut().dump_timeline = Some(dump.clone());

    let err = h.pipeline.run(&h.deck, &h.output, None).await.unwrap_err();
    assert!(matches!(err, SlidecastError::Encode { .. }));
    assert!(!h.work_dir.exists());
    assert!(!h.output.exists());

    // Assembly itself succeeded with two zero-length entries.
    let timeline: Timeline = serde_json::from_str(&std::fs::read_to_string(&dump).unwrap()).unwrap();
    assert_eq!(timeline.len(), 2);
    assert!(timeline.iter().all(|e| e.duration_secs == 0.0));
}

#[tokio::test]
async fn test_subtitles_and_timeline_dump() {
    let mut h = harness(&["First slide. Still first.", "", "Last words"], 5.0, FailAt::Nothing);
    let dump = h.root.path().join("timeline.json");
    let subs = h.root.path().join("subs").join("talk.srt");
    h.pipeline.options_mut().dump_timeline = Some(dump.clone());
    h.pipeline.options_mut().subtitles = Some(subs.clone());

    let summary = h.pipeline.run(&h.deck, &h.output, None).await.unwrap();
    assert_eq!(summary.subtitles.as_deref(), Some(subs.as_path()));

    let srt = std::fs::read_to_string(&subs).unwrap();
    assert!(srt.starts_with("1\n00:00:00,000 --> "));
    assert!(srt.contains("First slide."));
    assert!(srt.contains("Last words"));

    let timeline: Timeline = serde_json::from_str(&std::fs::read_to_string(&dump).unwrap()).unwrap();
    assert_eq!(timeline.len(), 3);
    assert_eq!(timeline.narrated_count(), 2);
}

#[tokio::test]
async fn test_non_empty_work_dir_is_refused_and_kept() {
    let mut h = harness(&["hello"], 5.0, FailAt::Nothing);
    std::fs::create_dir_all(&h.work_dir).unwrap();
    let keep = h.work_dir.join("notes.txt");
    std::fs::write(&keep, b"mine").unwrap();

    let err = h.pipeline.run(&h.deck, &h.output, None).await.unwrap_err();
    assert!(matches!(err, SlidecastError::Scope { .. }));
    assert!(keep.is_file());
    assert!(!h.output.exists());
}

#[tokio::test]
async fn test_output_inside_work_dir_is_rejected() {
    let mut h = harness(&["hello"], 5.0, FailAt::Nothing);
    let output = h.work_dir.join("talk.mp4");

    let err = h.pipeline.run(&h.deck, &output, None).await.unwrap_err();
    assert!(matches!(err, SlidecastError::Config { .. }));
    assert!(!h.work_dir.exists());
}

#[tokio::test]
async fn test_output_reaching_work_dir_through_parent_dir_is_rejected() {
    let mut h = harness(&["hello"], 5.0, FailAt::Nothing);
    let output = h.root.path().join("out").join("..").join("temp").join("talk.mp4");

    let err = h.pipeline.run(&h.deck, &output, None).await.unwrap_err();
    assert!(matches!(err, SlidecastError::Config { .. }));
    assert!(!h.work_dir.exists());
    assert!(h.jobs.lock().unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_output_reaching_work_dir_through_symlink_is_rejected() {
    let mut h = harness(&["hello"], 5.0, FailAt::Nothing);
    // Dangling until the run creates the working directory.
    let link = h.root.path().join("videos");
    std::os::unix::fs::symlink(&h.work_dir, &link).unwrap();

    let err = h
        .pipeline
        .run(&h.deck, &link.join("talk.mp4"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Config { .. }));
    assert!(!h.work_dir.exists());
    assert!(h.jobs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_backend_fails_before_any_artifact() {
    let root = tempfile::tempdir().unwrap();
    let work_dir = root.path().join("temp");
    let extractor = ContentExtractor::new(
        Box::new(FakeRenderer {
            slides: 1,
            fail: FailAt::Nothing,
            available: false,
        }),
        Box::new(FakeNotes(vec!["hi".to_string()])),
    );
    let narrator =
        NarrationGenerator::new(Arc::new(FakeSynth { fail: false }), "en-US-JennyNeural", 5.0).unwrap();
    let driver = VideoAssemblyDriver::new(Box::new(FakeEncoder {
        fail: false,
        jobs: Arc::new(Mutex::new(Vec::new())),
    }));
    let mut pipeline = Pipeline::new(
        extractor,
        narrator,
        driver,
        PipelineOptions {
            work_dir: work_dir.clone(),
            ..PipelineOptions::default()
        },
    );

    let err = pipeline
        .run(&root.path().join("talk.pptx"), &root.path().join("talk.mp4"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Unsupported { .. }));
    assert!(err.to_string().contains("fake-renderer"));
    assert!(!work_dir.exists());
}
