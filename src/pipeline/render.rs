//! PDF rasterisation: render every page to `page_<n>.png` via pdfium.
//!
//! pdfium keeps thread-local state and blocks for the whole render, so every
//! document is rendered inside `tokio::task::spawn_blocking`, one binding per
//! call.
//!
//! ## DPI and the pixel cap
//!
//! Schedules carry small print (bar marks, `C/C` suffixes), so pages are
//! rendered at `dpi / 72` scale, 300 DPI by default. `max_rendered_pixels`
//! still caps the longest edge: an A0 sheet at 300 DPI would otherwise be
//! about 10,000 × 14,000 px.

use crate::config::ExtractionConfig;
use crate::error::ScheduleError;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bind to the pdfium shared library.
///
/// `PDFIUM_LIB_PATH` may name the library file or the directory holding it;
/// otherwise the system library search path is used.
pub fn bind_pdfium() -> Result<Pdfium, ScheduleError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(p) => {
            let p = PathBuf::from(p);
            let lib = if p.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&p)
            } else {
                p
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_system_library(),
    };
    bindings
        .map(Pdfium::new)
        .map_err(|e| ScheduleError::PdfiumBindingFailed(e.to_string()))
}

/// Render every page of `pdf_path` into `out_dir` as `page_<n>.png`.
///
/// Returns the image paths in page order, 1-indexed names. `out_dir` must
/// already exist.
pub async fn render_pages(
    pdf_path: &Path,
    out_dir: &Path,
    config: &ExtractionConfig,
) -> Result<Vec<PathBuf>, ScheduleError> {
    render(pdf_path, out_dir, config, None).await
}

/// Render only page 1, for classification without extraction.
pub async fn render_first_page(
    pdf_path: &Path,
    out_dir: &Path,
    config: &ExtractionConfig,
) -> Result<PathBuf, ScheduleError> {
    render(pdf_path, out_dir, config, Some(1))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ScheduleError::NoPages {
            path: pdf_path.to_path_buf(),
        })
}

async fn render(
    pdf_path: &Path,
    out_dir: &Path,
    config: &ExtractionConfig,
    limit: Option<usize>,
) -> Result<Vec<PathBuf>, ScheduleError> {
    let path = pdf_path.to_path_buf();
    let dir = out_dir.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(&path, &dir, dpi, max_pixels, password.as_deref(), limit)
    })
    .await
    .map_err(|e| ScheduleError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    pdf_path: &Path,
    out_dir: &Path,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<PathBuf>, ScheduleError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| ScheduleError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);
    if total_pages == 0 {
        return Err(ScheduleError::NoPages {
            path: pdf_path.to_path_buf(),
        });
    }

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let wanted = limit.map_or(total_pages, |n| n.min(total_pages));
    let mut results = Vec::with_capacity(wanted);

    for idx in 0..wanted {
        let page_num = idx + 1;
        let raster_err = |e: PdfiumError| ScheduleError::RasterisationFailed {
            page: page_num,
            detail: format!("{:?}", e),
        };

        let page = pages.get(idx as u16).map_err(raster_err)?;
        let bitmap = page.render_with_config(&render_config).map_err(raster_err)?;
        let image = bitmap.as_image();

        let file = out_dir.join(page_file_name(page_num));
        image
            .save_with_format(&file, ImageFormat::Png)
            .map_err(|e| ScheduleError::ImageIo {
                path: file.clone(),
                detail: e.to_string(),
            })?;

        debug!(
            "Rendered page {} → {}x{} px → {}",
            page_num,
            image.width(),
            image.height(),
            file.display()
        );
        results.push(file);
    }

    Ok(results)
}

/// File name for a rendered page, `page_<n>.png` with `n` starting at 1.
pub fn page_file_name(page_num: usize) -> String {
    format!("page_{}.png", page_num)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_names_are_one_indexed() {
        assert_eq!(page_file_name(1), "page_1.png");
        assert_eq!(page_file_name(12), "page_12.png");
    }
}
