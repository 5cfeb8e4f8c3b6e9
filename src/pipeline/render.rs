//! PDF rasterisation: count pages and render one page to a PNG.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is CPU-bound and not
//! async-safe. Every call goes through `tokio::task::spawn_blocking` so the
//! runtime stays responsive while a page is being drawn.
//!
//! ## Collaborator seam
//!
//! The pipeline talks to a [`Rasterizer`], not to pdfium directly.
//! [`PdfiumRasterizer`] is the production implementation; tests substitute
//! deterministic in-memory rasterizers.

use crate::error::{OcrError, RenderFailure};
use crate::pipeline::encode;
use crate::pipeline::input::SourceDocument;
use image::RgbImage;
use pdfium_render::prelude::*;
use std::sync::Arc;
use tracing::{debug, warn};

/// Environment variable pointing at an existing pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Document rasterizer contract: page count + single-page rasterisation.
///
/// Implementations must be deterministic: the same bytes, index and zoom
/// produce the same pixels. Each call owns whatever document handle it opens.
pub trait Rasterizer: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, pdf: &[u8]) -> Result<usize, RenderFailure>;

    /// Rasterise page `page_index` (0-based) at `zoom`× native size.
    fn rasterize(&self, pdf: &[u8], page_index: usize, zoom: f32) -> Result<RgbImage, RenderFailure>;
}

/// One rendered page, PNG-encoded. Consumed by extraction, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    /// 0-based page index.
    pub page_index: usize,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl RenderedImage {
    pub fn to_base64(&self) -> String {
        encode::to_base64(&self.png)
    }
}

/// Count the pages of `document`.
pub async fn page_count(
    rasterizer: &Arc<dyn Rasterizer>,
    document: &SourceDocument,
) -> Result<usize, RenderFailure> {
    let rasterizer = Arc::clone(rasterizer);
    let bytes = document.bytes();
    tokio::task::spawn_blocking(move || rasterizer.page_count(&bytes))
        .await
        .map_err(|e| RenderFailure::new(format!("page-count task panicked: {e}")))?
}

/// Render one page of `document` to a PNG.
///
/// The index is re-validated against the document's page count; an
/// out-of-range index yields `RenderFailure` ("index out of range").
pub async fn render_page(
    rasterizer: &Arc<dyn Rasterizer>,
    document: &SourceDocument,
    page_index: usize,
    zoom: f32,
) -> Result<RenderedImage, RenderFailure> {
    let rasterizer = Arc::clone(rasterizer);
    let bytes = document.bytes();
    tokio::task::spawn_blocking(move || {
        render_page_blocking(rasterizer.as_ref(), &bytes, page_index, zoom)
    })
    .await
    .map_err(|e| RenderFailure::new(format!("render task panicked: {e}")))?
}

/// Blocking implementation of [`render_page`].
pub fn render_page_blocking(
    rasterizer: &dyn Rasterizer,
    pdf: &[u8],
    page_index: usize,
    zoom: f32,
) -> Result<RenderedImage, RenderFailure> {
    let total = rasterizer.page_count(pdf)?;
    if page_index >= total {
        warn!("Page index {} out of range (total={})", page_index, total);
        return Err(RenderFailure::index_out_of_range(page_index, total));
    }

    let pixels = rasterizer.rasterize(pdf, page_index, zoom)?;
    let png = encode::encode_png(&pixels)
        .map_err(|e| RenderFailure::new(format!("PNG encoding failed: {e}")))?;

    Ok(RenderedImage {
        page_index,
        width: pixels.width(),
        height: pixels.height(),
        png,
    })
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Bind to a pdfium library.
///
/// Lookup order: `PDFIUM_LIB_PATH`, the working directory, then the system
/// library path.
pub fn bind_pdfium() -> Result<Pdfium, PdfiumError> {
    if let Ok(path) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !path.is_empty() {
            return Pdfium::bind_to_library(&path).map(Pdfium::new);
        }
    }

    match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")) {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(primary_err) => match Pdfium::bind_to_system_library() {
            Ok(bindings) => Ok(Pdfium::new(bindings)),
            Err(_) => Err(primary_err),
        },
    }
}

/// [`Rasterizer`] backed by pdfium.
///
/// Binds to the library on each call and loads the document from the byte
/// slice, so no handle outlives the call that opened it.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer;

impl PdfiumRasterizer {
    /// Create a rasterizer after checking that pdfium can be bound.
    pub fn new() -> Result<Self, OcrError> {
        bind_pdfium().map_err(|e| OcrError::PdfiumBindingFailed(format!("{e:?}")))?;
        Ok(Self)
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn page_count(&self, pdf: &[u8]) -> Result<usize, RenderFailure> {
        let pdfium =
            bind_pdfium().map_err(|e| RenderFailure::new(format!("pdfium unavailable: {e:?}")))?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| RenderFailure::new(format!("cannot open document: {e:?}")))?;
        Ok(document.pages().len() as usize)
    }

    fn rasterize(&self, pdf: &[u8], page_index: usize, zoom: f32) -> Result<RgbImage, RenderFailure> {
        let pdfium =
            bind_pdfium().map_err(|e| RenderFailure::new(format!("pdfium unavailable: {e:?}")))?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| RenderFailure::new(format!("cannot open document: {e:?}")))?;

        let pages = document.pages();
        let total = pages.len() as usize;
        if page_index >= total {
            return Err(RenderFailure::index_out_of_range(page_index, total));
        }

        let page = pages
            .get(page_index as u16)
            .map_err(|e| RenderFailure::new(format!("cannot load page {}: {e:?}", page_index + 1)))?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(zoom);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| RenderFailure::new(format!("rasterisation failed: {e:?}")))?;

        let image = bitmap.as_image().to_rgb8();
        debug!(
            "Rendered page {} at {}× → {}x{} px",
            page_index + 1,
            zoom,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}
