//! Horizontal slicing of a page image into bands.
//!
//! Dense schedules are read more reliably a few rows at a time. A page is cut
//! top-to-bottom into `n` full-width bands of `height / n` pixels; the last
//! band absorbs the rounding remainder so no pixel row is lost.
//!
//! Slices are scratch files. They live in a [`SliceSet`], which owns a
//! private temp directory: [`SliceSet::cleanup`] deletes them explicitly after
//! the page's extraction calls, and dropping the set removes anything left.

use crate::error::ScheduleError;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Slice images for one page, in top-to-bottom order.
#[derive(Debug)]
pub struct SliceSet {
    paths: Vec<PathBuf>,
    _dir: TempDir,
}

impl SliceSet {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Delete every slice file now. The directory goes when `self` drops.
    pub fn cleanup(self) {
        delete_slices(&self.paths);
    }
}

/// `(top, height)` of each band for an image `height` pixels tall.
///
/// Never returns zero-height bands: an image shorter than `slices` rows gets
/// one band per row.
pub fn band_bounds(height: u32, slices: u32) -> Vec<(u32, u32)> {
    let n = slices.min(height).max(1);
    let band = height / n;
    (0..n)
        .map(|i| {
            let top = i * band;
            let h = if i == n - 1 { height - top } else { band };
            (top, h)
        })
        .collect()
}

/// Cut `image` into `slices` horizontal bands.
///
/// Blocking: decodes and re-encodes PNGs. Call from `spawn_blocking` in async
/// code.
pub fn slice_image(image: &Path, slices: u32) -> Result<SliceSet, ScheduleError> {
    let fail = |detail: String| ScheduleError::SliceFailed {
        path: image.to_path_buf(),
        slices,
        detail,
    };
    if slices == 0 {
        return Err(fail("slice count must be at least 1".into()));
    }

    let img = image::open(image).map_err(|e| fail(e.to_string()))?;
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(fail(format!("image is {}x{}", width, height)));
    }

    let dir = tempfile::Builder::new()
        .prefix("beamsched-slices-")
        .tempdir()
        .map_err(|e| fail(e.to_string()))?;

    let mut paths = Vec::with_capacity(slices as usize);
    for (i, (top, h)) in band_bounds(height, slices).into_iter().enumerate() {
        let path = dir.path().join(format!("slice_{}.png", i + 1));
        img.crop_imm(0, top, width, h)
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| fail(e.to_string()))?;
        paths.push(path);
    }

    debug!(
        "Sliced {} ({}x{}) into {} bands",
        image.display(),
        width,
        height,
        paths.len()
    );
    Ok(SliceSet { paths, _dir: dir })
}

/// Best-effort removal of slice files.
///
/// Every path is attempted; a file that is already gone is fine, any other
/// failure is logged and skipped.
pub fn delete_slices(paths: &[PathBuf]) {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not delete slice {}: {}", path.display(), e),
        }
    }
}
