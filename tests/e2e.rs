//! End-to-end tests against real pdfium and a live Ollama server.
//!
//! Gated behind `E2E_ENABLED` so they only run when requested. PDFs are read
//! from `./test_cases/`; the model defaults to `llava` and can be changed
//! with `E2E_MODEL`.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=./libpdfium.so cargo test --test e2e -- --nocapture

use pdf2md_ocr::pipeline::input::load_input;
use pdf2md_ocr::{
    convert_inputs, inspect_inputs, ConversionConfig, FilePipeline, FileStatus, PdfiumRasterizer,
    Rasterizer,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn e2e_model() -> String {
    std::env::var("E2E_MODEL").unwrap_or_else(|_| "llava".to_string())
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

// ── Page counts (pdfium only) ────────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_sample_text() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample_text.pdf"));
    let rasterizer: Arc<dyn Rasterizer> = Arc::new(PdfiumRasterizer::new().unwrap());

    let reports = inspect_inputs(&rasterizer, &[path.to_string_lossy().into_owned()], 30).await;

    assert_eq!(reports.len(), 1);
    assert!(reports[0].error.is_none(), "{:?}", reports[0].error);
    assert!(reports[0].pages.unwrap_or(0) > 0);
}

#[tokio::test]
async fn test_render_is_deterministic() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample_text.pdf"));
    let document = load_input(&path.to_string_lossy(), 30).await.unwrap();
    let rasterizer: Arc<dyn Rasterizer> = Arc::new(PdfiumRasterizer::new().unwrap());

    let a = pdf2md_ocr::pipeline::render::render_page(&rasterizer, &document, 0, 2.0)
        .await
        .unwrap();
    let b = pdf2md_ocr::pipeline::render::render_page(&rasterizer, &document, 0, 2.0)
        .await
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(&a.png[..4], b"\x89PNG");

    let out_of_range = pdf2md_ocr::pipeline::render::render_page(&rasterizer, &document, 10_000, 2.0)
        .await
        .unwrap_err();
    assert!(out_of_range.reason.contains("index out of range"));
}

// ── Full conversion (pdfium + Ollama) ────────────────────────────────────────

#[tokio::test]
async fn test_convert_sample_text() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample_text.pdf"));
    let out = tempfile::tempdir().unwrap();

    let config = ConversionConfig::builder()
        .model(e2e_model())
        .output_dir(out.path())
        .page_budget(Duration::from_secs(300))
        .build()
        .unwrap();
    let pipeline = FilePipeline::from_config(config).unwrap();

    let summary = convert_inputs(&pipeline, &[path.to_string_lossy().into_owned()]).await;
    let outcome = &summary.outcomes[0];
    println!("{outcome:#?}");

    assert_ne!(outcome.status, FileStatus::Failure, "{:?}", outcome.failure);
    let md = std::fs::read_to_string(outcome.output_path.as_ref().unwrap()).unwrap();
    assert!(md.starts_with("# OCR Output for: sample_text.pdf\n\n"));
    for n in 1..=outcome.total_pages {
        assert!(md.contains(&format!("## Page {n}\n\n")), "missing page {n}");
    }
}

#[tokio::test]
async fn test_unreachable_server_gives_placeholders_not_output() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample_text.pdf"));
    let out = tempfile::tempdir().unwrap();

    // Nothing listens on port 9: every extraction is a transport failure.
    let config = ConversionConfig::builder()
        .model(e2e_model())
        .ollama_host("http://127.0.0.1:9")
        .output_dir(out.path())
        .page_pause(Duration::ZERO)
        .build()
        .unwrap();
    let pipeline = FilePipeline::from_config(config).unwrap();

    let summary = convert_inputs(&pipeline, &[path.to_string_lossy().into_owned()]).await;

    assert!(summary.all_failed());
    assert!(std::fs::read_dir(out.path()).unwrap().next().is_none());
}
