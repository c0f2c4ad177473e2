//! SVG export.
//!
//! Output layout:
//!
//! ```text
//! <svg width height [viewBox]>
//!   <defs>
//!     <g id="N"> ... </g>        one group per dictionary entry
//!   </defs>
//!   <g id="slot_count"> ... </g>  root timeline, one frame
//! </svg>
//! ```
//!
//! Placements become `<use>` references to the definition groups, so shared
//! characters are written once. Any decode or I/O error aborts the export;
//! [`export_svg`] never leaves a complete-looking file behind on failure.

mod exporter;
mod svg;

pub use exporter::SvgExporter;
pub use svg::{escape, num};

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::util::{Error, Result};

// ============================================================================
// Options
// ============================================================================

/// Export settings, loadable from JSON. Missing fields take defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Root timeline frame to export. Frames past 0 show everything still
    /// standing after that frame.
    pub frame: u32,
    /// Extension of external bitmap files.
    pub image_extension: String,
    /// Directory prefix of bitmap references; the output file stem when unset.
    pub image_base: Option<String>,
    /// Decimal places for coordinates.
    pub precision: usize,
    pub view_box: bool,
    /// Emit only bitmap fills of shapes (image atlas preview).
    pub bitmap_shapes_only: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            frame: 0,
            image_extension: "png".to_string(),
            image_base: None,
            precision: 6,
            view_box: true,
            bitmap_shapes_only: false,
        }
    }
}

impl ExportOptions {
    /// Load options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn with_frame(mut self, frame: u32) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_image_base(mut self, base: impl Into<String>) -> Self {
        self.image_base = Some(base.into());
        self
    }

    /// Bitmap reference prefix for an export to `output`.
    pub fn resolve_image_base(&self, output: Option<&Path>) -> String {
        if let Some(base) = &self.image_base {
            return base.clone();
        }
        output
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "images".to_string())
    }
}

// ============================================================================
// State and statistics
// ============================================================================

/// Export progress. Transitions only move forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExportState {
    #[default]
    NotStarted,
    WritingHeader,
    WritingDictionaryEntries,
    WritingRootTimeline,
    Done,
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not started",
            Self::WritingHeader => "writing header",
            Self::WritingDictionaryEntries => "writing dictionary entries",
            Self::WritingRootTimeline => "writing root timeline",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// Export statistics
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct ExportStats {
    pub shapes: usize,
    pub morphs: usize,
    pub sprites: usize,
    pub texts: usize,
    pub edit_texts: usize,
    pub placements: usize,
    pub skipped_placements: usize,
    pub filters: usize,
    pub images: usize,
    pub gradients: usize,
    pub skipped_fills: usize,
}

impl ExportStats {
    /// Definition groups written.
    pub fn total(&self) -> usize {
        self.shapes + self.morphs + self.sprites + self.texts + self.edit_texts
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Removes the temporary output unless disarmed.
struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "Could not remove partial output");
            }
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Export `doc` to an SVG file.
///
/// Output goes to `<path>.partial` first and is renamed into place only
/// after the whole document was written.
#[tracing::instrument(skip(doc, path, opts), fields(path = %path.display(), frame = opts.frame))]
pub fn export_svg(doc: &Document, path: &Path, opts: &ExportOptions) -> Result<ExportStats> {
    tracing::info!("Exporting to {}", path.display());

    let tmp = partial_path(path);
    let mut guard = PartialFile::new(tmp.clone());
    let file = File::create(&tmp)?;
    let mut writer = BufWriter::new(file);

    let base = opts.resolve_image_base(Some(path));
    let stats = write_svg(doc, &mut writer, &base, opts)?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)?;
    guard.disarm();

    tracing::info!("Export complete: {} groups, {} placements", stats.total(), stats.placements);
    Ok(stats)
}

/// Render `doc` as SVG into any writer. `image_base` prefixes bitmap paths.
pub fn write_svg<W: Write>(doc: &Document, out: W, image_base: &str, opts: &ExportOptions) -> Result<ExportStats> {
    let mut exporter = SvgExporter::new(doc, out, image_base, opts)?;
    exporter.run()?;
    Ok(exporter.stats())
}

/// Render `doc` to a string.
pub fn to_svg_string(doc: &Document, image_base: &str, opts: &ExportOptions) -> Result<String> {
    let mut buf = Vec::new();
    write_svg(doc, &mut buf, image_base, opts)?;
    Ok(String::from_utf8(buf)?)
}
