//! PDF rasterization via MuPDF.
//!
//! Rendering is CPU-bound and the mupdf handles are not `Sync`, so every
//! call opens the document inside `spawn_blocking` and hands back plain
//! data. Floor plans are single-page documents; only the first page is
//! probed and rendered.

use async_trait::async_trait;
use bytes::Bytes;
use image::RgbaImage;
use mupdf::{Colorspace, Document, Matrix};

use crate::error::RenderError;
use crate::pyramid::POINTS_PER_INCH;

use super::PageInfo;

/// Minimum extractable characters on the first page for the document to
/// count as vector content rather than a scanned sheet.
pub const VECTOR_TEXT_THRESHOLD: usize = 32;

/// Decodes a PDF byte stream into page metadata and an RGBA raster.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Probe page geometry and content class without rasterizing.
    async fn probe(&self, pdf: Bytes) -> Result<PageInfo, RenderError>;

    /// Render the first page at `scale` (1.0 = 72 dpi).
    async fn render(&self, pdf: Bytes, scale: f32) -> Result<RgbaImage, RenderError>;
}

/// MuPDF-backed implementation of [`PdfRenderer`].
#[derive(Clone, Copy, Default)]
pub struct MupdfRenderer;

impl MupdfRenderer {
    /// Create a new renderer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PdfRenderer for MupdfRenderer {
    async fn probe(&self, pdf: Bytes) -> Result<PageInfo, RenderError> {
        tokio::task::spawn_blocking(move || probe_blocking(&pdf))
            .await
            .map_err(|e| RenderError::Render(format!("render task panicked: {e}")))?
    }

    async fn render(&self, pdf: Bytes, scale: f32) -> Result<RgbaImage, RenderError> {
        tokio::task::spawn_blocking(move || render_blocking(&pdf, scale))
            .await
            .map_err(|e| RenderError::Render(format!("render task panicked: {e}")))?
    }
}

fn open_document(pdf: &[u8]) -> Result<(Document, usize), RenderError> {
    let doc = Document::from_bytes(pdf, "application/pdf")
        .map_err(|e| RenderError::Open(e.to_string()))?;
    let page_count = doc
        .page_count()
        .map_err(|e| RenderError::Open(e.to_string()))? as usize;
    if page_count == 0 {
        return Err(RenderError::EmptyDocument);
    }
    Ok((doc, page_count))
}

fn probe_blocking(pdf: &[u8]) -> Result<PageInfo, RenderError> {
    let (doc, page_count) = open_document(pdf)?;

    let page = doc
        .load_page(0)
        .map_err(|e| RenderError::Open(e.to_string()))?;
    let bounds = page
        .bounds()
        .map_err(|e| RenderError::Open(e.to_string()))?;

    // Scanned sheets have no text layer; vector drawings do
    let text_chars = page
        .to_text()
        .map(|t| t.chars().filter(|c| !c.is_whitespace()).count())
        .unwrap_or(0);

    Ok(PageInfo {
        width_in: ((bounds.x1 - bounds.x0) as f64) / POINTS_PER_INCH,
        height_in: ((bounds.y1 - bounds.y0) as f64) / POINTS_PER_INCH,
        page_count,
        has_text_layer: text_chars >= VECTOR_TEXT_THRESHOLD,
    })
}

fn render_blocking(pdf: &[u8], scale: f32) -> Result<RgbaImage, RenderError> {
    let (doc, _) = open_document(pdf)?;

    let page = doc
        .load_page(0)
        .map_err(|e| RenderError::Render(e.to_string()))?;

    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();
    let pixmap = page
        .to_pixmap(&matrix, &colorspace, true, false)
        .map_err(|e| RenderError::Render(e.to_string()))?;

    pixmap_to_rgba(&pixmap)
}

fn pixmap_to_rgba(pixmap: &mupdf::Pixmap) -> Result<RgbaImage, RenderError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            let a = if n >= 4 {
                samples.get(offset + 3).copied().unwrap_or(255)
            } else {
                255
            };
            rgba.extend_from_slice(&[r, g, b, a]);
        }
    }

    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| RenderError::Render("pixmap buffer size mismatch".to_string()))
}
