//! Slide image rendering through an external presentation renderer.
//!
//! The renderer is opaque: it may launch a desktop application, a headless
//! office suite, or anything else. The only contract is a session that is
//! opened once per deck, asked for one image per slide, and always closed,
//! including after a failed export.

use std::path::{Path, PathBuf};
use std::process::Command;

use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::process::{command_exists, stderr_summary};
use slidecast_common::WorkingScope;

/// Trait for deck render backends.
pub trait DeckRenderer: Send + Sync {
    /// Open `deck_path` for rendering. Any intermediate files go into `scope`.
    fn open(&self, deck_path: &Path, scope: &WorkingScope) -> SlidecastResult<Box<dyn RenderSession>>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// An open deck inside a renderer.
pub trait RenderSession {
    /// Number of slides the renderer sees.
    fn slide_count(&self) -> usize;

    /// Write slide `index` (zero-based) as a PNG at `output`.
    fn export_slide(&mut self, index: usize, output: &Path) -> SlidecastResult<()>;

    /// Release the renderer. Called exactly once, on every path.
    fn close(self: Box<Self>) -> SlidecastResult<()>;
}

/// Headless LibreOffice converts the deck to PDF once; poppler rasterizes
/// each page on demand.
#[derive(Debug, Clone)]
pub struct LibreOfficeRenderer {
    soffice: String,
    dpi: u32,
}

/// Export filter that keeps hidden slides, so page count matches the deck.
const PDF_EXPORT_FILTER: &str =
    r#"pdf:impress_pdf_Export:{"ExportHiddenSlides":{"type":"boolean","value":"true"}}"#;

impl Default for LibreOfficeRenderer {
    fn default() -> Self {
        Self {
            soffice: "soffice".to_string(),
            dpi: 150,
        }
    }
}

impl LibreOfficeRenderer {
    pub fn new(soffice: impl Into<String>, dpi: u32) -> Self {
        Self {
            soffice: soffice.into(),
            dpi,
        }
    }
}

impl DeckRenderer for LibreOfficeRenderer {
    fn open(&self, deck_path: &Path, scope: &WorkingScope) -> SlidecastResult<Box<dyn RenderSession>> {
        let render_dir = scope.artifact_path("render");
        let profile_dir = scope.artifact_path("office-profile");
        std::fs::create_dir_all(&render_dir)?;

        // A private profile keeps the conversion independent of any office
        // instance the user already has open.
        let profile_url = format!("file://{}", profile_dir.display());

        tracing::debug!(
            deck = %deck_path.display(),
            outdir = %render_dir.display(),
            "Converting deck to PDF"
        );
        let mut session = LibreOfficeSession {
            pdf_path: PathBuf::new(),
            page_count: 0,
            dpi: self.dpi,
            render_dir,
            profile_dir,
        };

        let output = match Command::new(&self.soffice)
            .arg(format!("-env:UserInstallation={profile_url}"))
            .args(["--headless", "--norestore", "--convert-to", PDF_EXPORT_FILTER])
            .arg("--outdir")
            .arg(&session.render_dir)
            .arg(deck_path)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                session.cleanup();
                return Err(SlidecastError::extraction(format!(
                    "failed to start {}: {e}",
                    self.soffice
                )));
            }
        };

        if !output.status.success() {
            let message = format!("deck conversion failed: {}", stderr_summary(&output));
            session.cleanup();
            return Err(SlidecastError::extraction(message));
        }

        let stem = deck_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "deck".to_string());
        session.pdf_path = session.render_dir.join(format!("{stem}.pdf"));
        if !session.pdf_path.exists() {
            session.cleanup();
            return Err(SlidecastError::extraction(format!(
                "renderer produced no PDF for {}",
                deck_path.display()
            )));
        }

        match pdf_page_count(&session.pdf_path) {
            Ok(pages) => session.page_count = pages,
            Err(e) => {
                session.cleanup();
                return Err(e);
            }
        }

        tracing::info!(
            backend = self.name(),
            pages = session.page_count,
            "Deck opened for rendering"
        );
        Ok(Box::new(session))
    }

    fn is_available(&self) -> bool {
        command_exists(&self.soffice) && command_exists("pdfinfo") && command_exists("pdftoppm")
    }

    fn name(&self) -> &str {
        "libreoffice"
    }
}

struct LibreOfficeSession {
    pdf_path: PathBuf,
    page_count: usize,
    dpi: u32,
    render_dir: PathBuf,
    profile_dir: PathBuf,
}

impl LibreOfficeSession {
    fn cleanup(&mut self) -> bool {
        let mut clean = true;
        for dir in [&self.render_dir, &self.profile_dir] {
            match std::fs::remove_dir_all(dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "Failed to remove renderer files");
                    clean = false;
                }
            }
        }
        clean
    }
}

impl RenderSession for LibreOfficeSession {
    fn slide_count(&self) -> usize {
        self.page_count
    }

    fn export_slide(&mut self, index: usize, output: &Path) -> SlidecastResult<()> {
        let page = (index + 1).to_string();
        // pdftoppm appends the extension itself.
        let output_root = output.with_extension("");

        let result = Command::new("pdftoppm")
            .args(["-png", "-singlefile", "-r"])
            .arg(self.dpi.to_string())
            .args(["-f", &page, "-l", &page])
            .arg(&self.pdf_path)
            .arg(&output_root)
            .output()
            .map_err(|e| SlidecastError::slide_render(index, format!("failed to start pdftoppm: {e}")))?;

        if !result.status.success() {
            return Err(SlidecastError::slide_render(index, stderr_summary(&result)));
        }
        Ok(())
    }

    fn close(mut self: Box<Self>) -> SlidecastResult<()> {
        if self.cleanup() {
            Ok(())
        } else {
            Err(SlidecastError::extraction(
                "renderer session left files behind in the working scope",
            ))
        }
    }
}

fn pdf_page_count(pdf: &Path) -> SlidecastResult<usize> {
    let output = Command::new("pdfinfo")
        .arg(pdf)
        .output()
        .map_err(|e| SlidecastError::extraction(format!("failed to start pdfinfo: {e}")))?;
    if !output.status.success() {
        return Err(SlidecastError::extraction(format!(
            "pdfinfo failed: {}",
            stderr_summary(&output)
        )));
    }
    parse_page_count(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| SlidecastError::extraction("pdfinfo reported no page count"))
}

fn parse_page_count(pdfinfo_stdout: &str) -> Option<usize> {
    pdfinfo_stdout
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|value| value.trim().parse().ok())
}
