//! Pipeline tests against a real pdfium and a stub note generator.
//!
//! No network: generators are local stubs. Every test that needs
//! pdfium skips itself when the library cannot be bound.
//!
//! Run with:
//!   LD_LIBRARY_PATH=. cargo test --test pipeline -- --nocapture

use futures::future::BoxFuture;
use pdfium_render::prelude::*;
use scribblepdf::pipeline::extract::{self, bind_pdfium};
use scribblepdf::pipeline::intake::Declared;
use scribblepdf::{
    annotate_pdf, inspect, AnnotationProgressCallback, Annotator, NoteGenerator, NotesError,
    NotesService, PageContent, PageError, ScribbleConfig,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Write an A4 PDF with one page per entry of `lines`; `None` without pdfium.
fn fixture_pdf(dir: &Path, name: &str, lines: &[&str]) -> Option<PathBuf> {
    let pdfium = match bind_pdfium(None) {
        Ok(p) => p,
        Err(e) => {
            println!("SKIP: pdfium unavailable: {e}");
            return None;
        }
    };
    let path = dir.join(name);
    let mut document = pdfium.create_new_pdf().ok()?;
    let font = document.fonts_mut().helvetica();
    for line in lines {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .ok()?;
        page.objects_mut()
            .create_text_object(
                PdfPoints::new(72.0),
                PdfPoints::new(700.0),
                *line,
                font,
                PdfPoints::new(24.0),
            )
            .ok()?;
    }
    document.save_to_file(&path).ok()?;
    Some(path)
}

macro_rules! skip_without_pdfium {
    ($dir:expr) => {
        skip_without_pdfium!($dir, "hello.pdf", &["Hello World"])
    };
    ($dir:expr, $name:expr, $lines:expr) => {{
        match fixture_pdf($dir, $name, $lines) {
            Some(p) => p,
            None => return,
        }
    }};
}

/// Returns the same reply for every page.
struct Fixed(&'static str);

impl NoteGenerator for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn generate<'a>(&'a self, _page: &'a PageContent) -> BoxFuture<'a, Result<String, NotesError>> {
        Box::pin(async move { Ok(self.0.to_string()) })
    }
}

/// Always fails like a rejected API call.
struct Refusing;

impl NoteGenerator for Refusing {
    fn name(&self) -> &str {
        "refusing"
    }

    fn generate<'a>(&'a self, _page: &'a PageContent) -> BoxFuture<'a, Result<String, NotesError>> {
        Box::pin(async {
            Err(NotesError::Api {
                status: 403,
                message: "API key not valid".into(),
            })
        })
    }
}

/// Fails on page 1 and answers "second page notes" everywhere else.
struct FailsFirstPage;

impl NoteGenerator for FailsFirstPage {
    fn name(&self) -> &str {
        "fails-first-page"
    }

    fn generate<'a>(&'a self, page: &'a PageContent) -> BoxFuture<'a, Result<String, NotesError>> {
        Box::pin(async move {
            if page.page_num == 1 {
                Err(NotesError::Api {
                    status: 500,
                    message: "backend exploded".into(),
                })
            } else {
                Ok("second page notes".to_string())
            }
        })
    }
}

/// Fails the first call, then succeeds.
#[derive(Default)]
struct FlakyOnce {
    calls: AtomicUsize,
}

impl NoteGenerator for FlakyOnce {
    fn name(&self) -> &str {
        "flaky-once"
    }

    fn generate<'a>(&'a self, _page: &'a PageContent) -> BoxFuture<'a, Result<String, NotesError>> {
        Box::pin(async move {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(NotesError::Provider("temporarily unavailable".into()))
            } else {
                Ok("recovered".to_string())
            }
        })
    }
}

async fn upload_fixture(service: &NotesService, pdf: &Path) -> String {
    service
        .upload(
            &std::fs::read(pdf).unwrap(),
            Declared {
                content_type: Some("application/pdf"),
                filename: None,
            },
        )
        .await
        .unwrap()
        .id
}

fn config_with(generator: Arc<dyn NoteGenerator>, dir: &Path) -> ScribbleConfig {
    ScribbleConfig::builder()
        .generator(generator)
        .dpi(72)
        .seed(7)
        .upload_dir(dir.join("uploads"))
        .generated_dir(dir.join("generated"))
        .build()
        .unwrap()
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn extracts_text_and_canvas_size() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path());
    let config = config_with(Arc::new(Fixed("")), dir.path());

    let pages = extract::extract_pages(&pdf, &config).await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].page_num, 1);
    assert!(pages[0].text.contains("Hello World"), "text: {:?}", pages[0].text);
    // A4 at 72 DPI is 595 × 842 points, one pixel per point.
    assert!((594..=596).contains(&pages[0].width), "width {}", pages[0].width);
    assert!((841..=843).contains(&pages[0].height), "height {}", pages[0].height);
    let png = pages[0].image.as_ref().expect("rasterised by default");
    assert!(png.starts_with(b"\x89PNG"));
}

#[tokio::test]
async fn extraction_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path());
    let config = config_with(Arc::new(Fixed("")), dir.path());

    let first = extract::extract_pages(&pdf, &config).await.unwrap();
    let second = extract::extract_pages(&pdf, &config).await.unwrap();
    assert_eq!(first[0].text, second[0].text);
    assert_eq!((first[0].width, first[0].height), (second[0].width, second[0].height));
}

#[tokio::test]
async fn page_out_of_range_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path());
    let config = config_with(Arc::new(Fixed("")), dir.path());

    let err = extract::extract_page(&pdf, &config, 3).await.unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn inspect_needs_no_generator() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path());

    let info = inspect(&pdf, &ScribbleConfig::default()).await.unwrap();
    assert_eq!(info.page_count, 1);
    assert_eq!(info.pages[0].page_num, 1);
    assert!(info.pages[0].text_chars >= "Hello World".len());
}

#[tokio::test]
async fn inspect_nonexistent_file() {
    let err = inspect("/no/such/lecture.pdf", &ScribbleConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

// ── Annotation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn annotates_with_notes_and_page_sized_canvas() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path());
    let config = config_with(Arc::new(Fixed("Key idea: hello\nKey idea: world")), dir.path());

    let doc = annotate_pdf(&pdf, &config).await.unwrap();
    assert_eq!(doc.stats.total_pages, 1);
    assert_eq!(doc.stats.annotated_pages, 1);
    assert_eq!(doc.stats.total_notes, 2);

    let page = &doc.pages[0];
    assert!(page.error.is_none());
    assert_eq!(page.notes[1].content, "Key idea: world");
    let (w, h) = page.image.dimensions();
    assert!((594..=596).contains(&w) && (841..=843).contains(&h), "{w}x{h}");

    let written = doc.save_pngs(dir.path(), "hello").unwrap();
    assert_eq!(written, vec![dir.path().join("hello_page_0.png")]);
    assert!(written[0].is_file());
}

#[tokio::test]
async fn failed_page_gets_error_image() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path());
    let config = config_with(Arc::new(Refusing), dir.path());

    let doc = annotate_pdf(&pdf, &config).await.unwrap();
    assert_eq!(doc.stats.failed_pages, 1);
    assert_eq!(doc.stats.annotated_pages, 0);
    match doc.pages[0].error {
        Some(PageError::NotesFailed { page: 1, ref detail }) => {
            assert!(detail.contains("API key not valid"), "{detail}");
        }
        ref other => panic!("unexpected {other:?}"),
    }
    assert!(doc.pages[0].notes.is_empty());
}

#[tokio::test]
async fn failed_page_does_not_stop_later_pages() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path(), "two.pdf", &["First page", "Second page"]);
    let config = config_with(Arc::new(FailsFirstPage), dir.path());

    let doc = annotate_pdf(&pdf, &config).await.unwrap();
    assert_eq!(doc.stats.total_pages, 2);
    assert_eq!(doc.stats.failed_pages, 1);
    assert_eq!(doc.stats.annotated_pages, 1);
    assert_eq!(doc.pages.len(), 2);

    assert!(matches!(doc.pages[0].error, Some(PageError::NotesFailed { page: 1, .. })));
    assert!(doc.pages[0].notes.is_empty());

    assert_eq!(doc.pages[1].page_num, 2);
    assert!(doc.pages[1].error.is_none());
    assert_eq!(doc.pages[1].notes.len(), 1);
    assert_eq!(doc.pages[1].notes[0].content, "second page notes");
}

#[tokio::test]
async fn same_seed_same_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path());
    let config = config_with(Arc::new(Fixed("one\ntwo\nthree")), dir.path());

    let a = annotate_pdf(&pdf, &config).await.unwrap();
    let b = annotate_pdf(&pdf, &config).await.unwrap();
    assert_eq!(a.pages[0].image, b.pages[0].image);
}

#[tokio::test]
async fn progress_callback_sees_every_page() {
    #[derive(Default)]
    struct Tally {
        started: AtomicUsize,
        completed: AtomicUsize,
        finished: AtomicUsize,
    }

    impl AnnotationProgressCallback for Tally {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, note_count: usize) {
            assert_eq!(note_count, 1);
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
        fn on_document_complete(&self, total_pages: usize, success_count: usize) {
            assert_eq!((total_pages, success_count), (1, 1));
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path());
    let tally = Arc::new(Tally::default());
    let config = ScribbleConfig::builder()
        .generator(Arc::new(Fixed("only note")))
        .dpi(72)
        .progress_callback(tally.clone())
        .build()
        .unwrap();

    annotate_pdf(&pdf, &config).await.unwrap();
    assert_eq!(tally.started.load(Ordering::SeqCst), 1);
    assert_eq!(tally.completed.load(Ordering::SeqCst), 1);
    assert_eq!(tally.finished.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn interleaved_pdf_doubles_the_page_count() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path());
    let config = config_with(Arc::new(Fixed("note")), dir.path());

    let doc = annotate_pdf(&pdf, &config).await.unwrap();
    let out = dir.path().join("out").join("hello_notes.pdf");
    doc.finalize_pdf(&out, &config).await.unwrap();

    let info = inspect(&out, &config).await.unwrap();
    assert_eq!(info.page_count, 2);
    assert!(info.pages[0].text_chars > 0);

    // Nothing but the finished PDF is left beside it.
    let entries: Vec<_> = std::fs::read_dir(out.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("hello_notes.pdf")]);
}

#[tokio::test]
async fn single_page_annotation() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path());
    let annotator = Annotator::new(config_with(Arc::new(Fixed("a\nb")), dir.path())).unwrap();

    let mut rng = annotator.rng();
    let page = annotator.annotate_page(&pdf, 0, &mut rng).await.unwrap();
    assert_eq!(page.page_num, 1);
    assert_eq!(page.notes.len(), 2);
}

// ── Service ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_generate_and_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path());
    let service = NotesService::new(config_with(Arc::new(Fixed("Key idea: hello")), dir.path())).unwrap();
    let bytes = std::fs::read(&pdf).unwrap();

    let receipt = service
        .upload(
            &bytes,
            Declared {
                content_type: Some("application/pdf"),
                filename: Some("hello.pdf"),
            },
        )
        .await
        .unwrap();
    assert_eq!(receipt.page_count, 1);
    assert_eq!(receipt.id.len(), 32);

    let manifest = service.generate_notes(&receipt.id).await.unwrap();
    assert_eq!(manifest.id, receipt.id);
    assert_eq!(manifest.pages.len(), 1);
    assert_eq!(manifest.pages[0].page_index, 0);
    assert_eq!(manifest.pages[0].url, format!("/pages/{}/0", receipt.id));
    assert!(manifest.pages[0].error.is_none());
    assert!(dir.path().join("generated").join(&manifest.pages[0].file).is_file());

    let png = service.get_page(&receipt.id, 0).await.unwrap();
    assert!(png.starts_with(b"\x89PNG"));
    assert_eq!(service.get_page(&receipt.id, 1).await.unwrap_err().status_code(), 404);
}

#[tokio::test]
async fn get_page_generates_on_demand() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path());
    let service = NotesService::new(config_with(Arc::new(Fixed("lazy")), dir.path())).unwrap();
    let receipt = service
        .upload(
            &std::fs::read(&pdf).unwrap(),
            Declared {
                content_type: Some("application/pdf"),
                filename: None,
            },
        )
        .await
        .unwrap();

    let png = service.get_page(&receipt.id, 0).await.unwrap();
    assert!(png.starts_with(b"\x89PNG"));
    let stored = dir
        .path()
        .join("generated")
        .join(format!("{}_page_0.png", receipt.id));
    assert_eq!(std::fs::read(stored).unwrap(), png);
}

#[tokio::test]
async fn manifest_marks_the_failed_page_only() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path(), "two.pdf", &["First page", "Second page"]);
    let service = NotesService::new(config_with(Arc::new(FailsFirstPage), dir.path())).unwrap();
    let id = upload_fixture(&service, &pdf).await;

    let manifest = service.generate_notes(&id).await.unwrap();
    assert_eq!(manifest.pages.len(), 2);
    let failed = manifest.pages[0].error.as_deref().unwrap();
    assert!(failed.contains("backend exploded"), "{failed}");
    assert!(manifest.pages[1].error.is_none());
    for page in &manifest.pages {
        assert!(dir.path().join("generated").join(&page.file).is_file());
    }
}

#[tokio::test]
async fn get_page_does_not_cache_error_pages() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path());
    let service = NotesService::new(config_with(Arc::new(FlakyOnce::default()), dir.path())).unwrap();
    let id = upload_fixture(&service, &pdf).await;
    let stored = dir.path().join("generated").join(format!("{id}_page_0.png"));

    let error_png = service.get_page(&id, 0).await.unwrap();
    assert!(error_png.starts_with(b"\x89PNG"));
    assert!(!stored.exists());

    let png = service.get_page(&id, 0).await.unwrap();
    assert_ne!(png, error_png);
    assert_eq!(std::fs::read(&stored).unwrap(), png);
}

#[tokio::test]
async fn truncated_pdf_is_rejected_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = skip_without_pdfium!(dir.path());
    let service = NotesService::new(config_with(Arc::new(Fixed("")), dir.path())).unwrap();
    let bytes = std::fs::read(&pdf).unwrap();

    let err = service
        .upload(
            &bytes[..16],
            Declared {
                content_type: Some("application/pdf"),
                filename: Some("hello.pdf"),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert_eq!(std::fs::read_dir(dir.path().join("uploads")).unwrap().count(), 0);
}
