//! Resume Text Extractor: tiered text recovery from PDF bytes.
//!
//! 1. Digital: the embedded text layer via `pdf-extract`, page by page, on the
//!    blocking pool.
//! 2. OCR (only when enabled): `pdftoppm` renders pages, `tesseract` reads them.
//!    Each tool invocation is bounded by the configured timeout and killed when
//!    it expires or the request is dropped.
//! 3. Neither: the caller switches to file-based scoring.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::config::OcrConfig;

const PAGE_SEPARATOR: &str = "\n\n";
const OCR_DPI: &str = "300";

/// Which tier produced the resume text, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Digital(String),
    Ocr(String),
    None,
}

impl Extraction {
    pub fn tier(&self) -> &'static str {
        match self {
            Extraction::Digital(_) => "digital",
            Extraction::Ocr(_) => "ocr",
            Extraction::None => "none",
        }
    }
}

/// Runs the tiers in order and reports the first that yields text. Fails only
/// if the blocking extraction task itself could not complete.
pub async fn extract_resume_text(
    pdf_bytes: &[u8],
    ocr: &OcrConfig,
) -> Result<Extraction, JoinError> {
    let bytes = pdf_bytes.to_vec();
    let digital = tokio::task::spawn_blocking(move || extract_digital(&bytes)).await?;

    if let Some(text) = digital {
        debug!("Digital extraction produced {} chars", text.len());
        return Ok(Extraction::Digital(text));
    }

    if !ocr.enabled {
        debug!("No embedded text layer and OCR disabled");
        return Ok(Extraction::None);
    }

    Ok(match extract_ocr(pdf_bytes, ocr).await {
        Some(text) => {
            debug!("OCR produced {} chars", text.len());
            Extraction::Ocr(text)
        }
        None => Extraction::None,
    })
}

/// Reads the embedded text layer. `None` if the document cannot be opened or
/// every page is blank (typically a scanned PDF).
pub fn extract_digital(pdf_bytes: &[u8]) -> Option<String> {
    // The PDF parser panics on some malformed inputs; treat that as unreadable.
    let pages = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
    }));

    match pages {
        Ok(Ok(pages)) => join_pages(pages.iter().map(String::as_str)),
        Ok(Err(e)) => {
            debug!("PDF text layer unreadable: {e}");
            None
        }
        Err(_) => {
            warn!("PDF parser panicked while reading the text layer");
            None
        }
    }
}

/// Renders every page and runs OCR on each in page order. `None` on any
/// tooling failure or timeout, or when nothing is recognized.
pub async fn extract_ocr(pdf_bytes: &[u8], ocr: &OcrConfig) -> Option<String> {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            warn!("OCR unavailable, cannot create temp dir: {e}");
            return None;
        }
    };

    let images = match render_pages(dir.path(), pdf_bytes, ocr).await {
        Ok(images) => images,
        Err(e) => {
            warn!("OCR page rendering failed: {e}");
            return None;
        }
    };

    let mut texts = Vec::with_capacity(images.len());
    for image in &images {
        match recognize_page(image, ocr).await {
            Ok(text) => texts.push(text),
            Err(e) => {
                warn!("OCR failed on {}: {e}", image.display());
                return None;
            }
        }
    }

    join_pages(texts.iter().map(String::as_str))
}

async fn render_pages(
    dir: &Path,
    pdf_bytes: &[u8],
    ocr: &OcrConfig,
) -> Result<Vec<PathBuf>, String> {
    let input = dir.join("input.pdf");
    tokio::fs::write(&input, pdf_bytes)
        .await
        .map_err(|e| format!("writing temporary pdf: {e}"))?;

    run_tool(
        Command::new(&ocr.pdftoppm_cmd)
            .arg("-png")
            .arg("-r")
            .arg(OCR_DPI)
            .arg(&input)
            .arg(dir.join("page")),
        &ocr.pdftoppm_cmd,
        ocr.command_timeout,
    )
    .await?;

    let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(dir)
        .map_err(|e| format!("listing rendered pages: {e}"))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| page_number(&path).map(|n| (n, path)))
        .collect();
    pages.sort_by_key(|(n, _)| *n);

    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

async fn recognize_page(image: &Path, ocr: &OcrConfig) -> Result<String, String> {
    let stdout = run_tool(
        Command::new(&ocr.tesseract_cmd)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&ocr.language),
        &ocr.tesseract_cmd,
        ocr.command_timeout,
    )
    .await?;

    Ok(String::from_utf8_lossy(&stdout).into_owned())
}

/// Runs an external tool to completion and returns its stdout. The child is
/// killed if `limit` elapses or the calling future is dropped.
async fn run_tool(cmd: &mut Command, name: &str, limit: Duration) -> Result<Vec<u8>, String> {
    let output = tokio::time::timeout(limit, cmd.kill_on_drop(true).output())
        .await
        .map_err(|_| format!("{name} timed out after {}ms", limit.as_millis()))?
        .map_err(|e| format!("{name} unavailable: {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "{name} exited with {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    Ok(output.stdout)
}

/// Parses the page number from `pdftoppm` output names such as `page-01.png`.
fn page_number(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("page-")?
        .parse()
        .ok()
}

/// Joins trimmed non-blank pages with a blank line; `None` if nothing remains.
fn join_pages<'a>(pages: impl Iterator<Item = &'a str>) -> Option<String> {
    let joined = pages
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR);

    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
