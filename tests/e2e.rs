//! End-to-end integration tests for gdoc-down.
//!
//! The pointer files and the HTML export under `./tests/fixtures/` are real
//! in shape; the Drive side is replaced by [`FakeDrive`], which answers each
//! export request with a canned payload and counts the calls, so these run
//! offline and in CI.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use gdoc_down::pipeline::formats::formats_for;
use gdoc_down::{
    convert, convert_sync, convert_to_file, execute, inspect, plan, DocumentKind, ExportClient,
    ExportConfig, ExportPayload, ExportProgressCallback, ExportRequest, GDocDownError, Rendering,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const DOC_ID: &str = "1mgPojZVReTAMBIVvt6LSQ59AGTsxx2-myLR9oIYIJ2s";

// ── Test helpers ─────────────────────────────────────────────────────────────

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn gdoc() -> PathBuf {
    fixtures_dir().join("example.gdoc")
}

fn gsheet() -> PathBuf {
    fixtures_dir().join("example.gsheet")
}

fn gslides() -> PathBuf {
    fixtures_dir().join("example.gslides")
}

fn fixture_for(kind: DocumentKind) -> PathBuf {
    match kind {
        DocumentKind::Document => gdoc(),
        DocumentKind::Spreadsheet => gsheet(),
        DocumentKind::Presentation => gslides(),
    }
}

/// In-memory stand-in for Drive's export endpoint.
///
/// `text/html` gets the fixture export, `text/plain` a one-line document,
/// anything else a payload naming the MIME type.
struct FakeDrive {
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, String)>>,
    fail_with: Option<u16>,
}

impl FakeDrive {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    fn failing(status: u16) -> Self {
        Self {
            fail_with: Some(status),
            ..Self::new()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn payload(mime_type: &str) -> Vec<u8> {
        match mime_type {
            "text/html" => std::fs::read(fixtures_dir().join("example.html")).unwrap(),
            "text/plain" => b"\xef\xbb\xbfgdoc_down example file\r\n".to_vec(),
            other => format!("{other} payload").into_bytes(),
        }
    }
}

impl ExportClient for FakeDrive {
    async fn export(&self, document_id: &str, mime_type: &str) -> Result<Vec<u8>, GDocDownError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((document_id.to_string(), mime_type.to_string()));
        match self.fail_with {
            Some(status) => Err(GDocDownError::ExportFailed {
                document_id: document_id.to_string(),
                mime_type: mime_type.to_string(),
                status,
            }),
            None => Ok(Self::payload(mime_type)),
        }
    }
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
}

// ── Typeset (tex) ────────────────────────────────────────────────────────────

const EXPECTED_TEX: &str = concat!(
    "gdoc_down example file\n\n",
    "Umlauts {\\\"A}{\\\"o}{\\\"u} and quotes ``here'' --- done",
    "\\pdfcomment{Please check the spelling}\n\n",
    "Line one\nline two\n\n",
    "Second comment here\\pdfcomment{Cite a source}\n\n",
);

#[tokio::test]
async fn test_gdoc_to_tex() {
    let out = tempfile::tempdir().unwrap();
    let drive = FakeDrive::new();
    let config = ExportConfig::default();
    let request = ExportRequest::default().format("tex").out_path(out.path());

    let stats = convert_to_file(&drive, gdoc(), &request, &config)
        .await
        .expect("tex export should succeed");

    let path = out.path().join("example.tex");
    let text = std::fs::read_to_string(&path).unwrap();
    println!("{text}");

    assert_eq!(text, EXPECTED_TEX);
    assert!(!text.contains("[a]") && !text.contains("[b]"), "comment glyphs left over");
    assert_eq!(stats.annotations_inlined, 2);
    assert_eq!(stats.bytes_written, text.len());
    assert_eq!(drive.calls(), 1);
    assert_eq!(
        drive.requests.lock().unwrap()[0],
        (DOC_ID.to_string(), "text/html".to_string())
    );
}

#[tokio::test]
async fn test_tex_output_in_memory() {
    let drive = FakeDrive::new();
    let config = ExportConfig::builder().comment_macro("todo").build().unwrap();
    let request = ExportRequest::default().format(".TEX");

    let output = convert(&drive, gdoc(), &request, &config).await.unwrap();

    assert_eq!(output.format, "tex");
    assert_eq!(output.target_path, fixtures_dir().join("example.tex"));
    assert_eq!(output.annotations.len(), 2);
    assert_eq!(output.annotations[1].sequence, 2);
    assert_eq!(output.annotations[1].text, "Cite a source");
    let text = output.payload.as_text().expect("typeset payload is text");
    assert!(text.contains("\\todo{Please check the spelling}"), "{text}");
    // Nothing is written by `convert` alone.
    assert!(!output.target_path.exists());
}

#[tokio::test]
async fn test_tex_comment_limit() {
    let drive = FakeDrive::new();
    let config = ExportConfig::builder().max_annotations(1).build().unwrap();
    let request = ExportRequest::default().format("tex");

    let output = convert(&drive, gdoc(), &request, &config).await.unwrap();
    let text = output.payload.as_text().unwrap();

    assert_eq!(output.stats.annotations_inlined, 1);
    assert!(text.contains("\\pdfcomment{Please check the spelling}"));
    // The second comment stays as exported.
    assert!(text.contains("[b]"), "{text}");
    assert!(text.contains("Cite a source"), "{text}");
}

// ── Passthrough formats ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_every_passthrough_format() {
    for kind in DocumentKind::ALL {
        for spec in formats_for(kind).filter(|s| s.rendering == Rendering::Passthrough) {
            let context = format!("{kind}/{}", spec.extension);
            let out = tempfile::tempdir().unwrap();
            let drive = FakeDrive::new();
            let request = ExportRequest::default()
                .format(spec.extension)
                .out_path(out.path());

            let stats = convert_to_file(&drive, fixture_for(kind), &request, &ExportConfig::default())
                .await
                .unwrap_or_else(|e| panic!("[{context}] export failed: {e}"));

            let path = out.path().join(format!("example.{}", spec.extension));
            let bytes = std::fs::read(&path)
                .unwrap_or_else(|e| panic!("[{context}] {} missing: {e}", path.display()));
            assert_eq!(bytes, FakeDrive::payload(spec.mime_type), "[{context}] payload changed");
            assert_eq!(stats.bytes_written, bytes.len(), "[{context}]");
            assert_eq!(stats.annotations_inlined, 0, "[{context}]");
            assert_eq!(drive.calls(), 1, "[{context}]");
            assert_eq!(files_in(out.path()), vec![path], "[{context}] stray files");
            println!("[{context}] ✓ {} bytes", bytes.len());
        }
    }
}

#[tokio::test]
async fn test_html_export_is_not_typeset() {
    let drive = FakeDrive::new();
    let request = ExportRequest::default().format("html");
    let output = convert(&drive, gdoc(), &request, &ExportConfig::default())
        .await
        .unwrap();

    assert!(matches!(output.payload, ExportPayload::Bytes(_)));
    let html = String::from_utf8(output.payload.as_bytes().to_vec()).unwrap();
    assert!(html.contains("cmnt_ref1"));
    assert!(html.contains("gdoc_down example file"));
}

#[tokio::test]
async fn test_html_zip_naming() {
    let out = tempfile::tempdir().unwrap();
    let drive = FakeDrive::new();
    let request = ExportRequest::default().format("html.zip").out_path(out.path());

    convert_to_file(&drive, gdoc(), &request, &ExportConfig::default())
        .await
        .unwrap();

    assert!(out.path().join("example.html.zip").is_file());
    assert_eq!(drive.requests.lock().unwrap()[0].1, "application/zip");
}

#[tokio::test]
async fn test_explicit_output_file() {
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("example-out.text");
    let drive = FakeDrive::new();
    let request = ExportRequest::default().format("txt").out_path(&path);

    convert_to_file(&drive, gdoc(), &request, &ExportConfig::default())
        .await
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.trim().contains("gdoc_down example file"));
}

#[tokio::test]
async fn test_extension_override() {
    let out = tempfile::tempdir().unwrap();
    let drive = FakeDrive::new();
    let request = ExportRequest::default()
        .format("txt")
        .extension("text")
        .out_path(out.path());

    convert_to_file(&drive, gdoc(), &request, &ExportConfig::default())
        .await
        .unwrap();

    assert_eq!(files_in(out.path()), vec![out.path().join("example.text")]);
}

#[tokio::test]
async fn test_format_inferred_from_output_file() {
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("budget.xlsx");
    let drive = FakeDrive::new();
    let request = ExportRequest::default().out_path(&path);

    convert_to_file(&drive, gsheet(), &request, &ExportConfig::default())
        .await
        .unwrap();

    assert!(path.is_file());
    assert_eq!(
        drive.requests.lock().unwrap()[0].1,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
}

#[tokio::test]
async fn test_default_format_next_to_pointer() {
    let dir = tempfile::tempdir().unwrap();
    let pointer = dir.path().join("Quarterly Report.gdoc");
    std::fs::copy(gdoc(), &pointer).unwrap();
    let drive = FakeDrive::new();

    convert_to_file(&drive, &pointer, &ExportRequest::default(), &ExportConfig::default())
        .await
        .unwrap();

    assert!(dir.path().join("Quarterly Report.docx").is_file());
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unsupported_formats() {
    let cases = [
        (DocumentKind::Document, "xlsx"),
        (DocumentKind::Spreadsheet, "docx"),
        (DocumentKind::Spreadsheet, "tex"),
        (DocumentKind::Presentation, "csv"),
        (DocumentKind::Presentation, "Nope"),
    ];
    for (kind, format) in cases {
        let drive = FakeDrive::new();
        let request = ExportRequest::default().format(format);
        let err = convert(&drive, fixture_for(kind), &request, &ExportConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), format!("Unknown format \"{format}\""), "[{kind}]");
        assert_eq!(drive.calls(), 0, "[{kind}/{format}] no request expected");
    }
}

#[tokio::test]
async fn test_unknown_pointer_extension() {
    let dir = tempfile::tempdir().unwrap();
    let pointer = dir.path().join("example.tmp");
    std::fs::copy(gdoc(), &pointer).unwrap();
    let drive = FakeDrive::new();

    let err = convert(&drive, &pointer, &ExportRequest::default(), &ExportConfig::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Unknown Google document extension \".tmp\"");
    assert_eq!(drive.calls(), 0);
}

#[tokio::test]
async fn test_conflicting_output_spec() {
    let out = tempfile::tempdir().unwrap();
    let drive = FakeDrive::new();
    let request = ExportRequest::default()
        .format("pdf")
        .extension("pdf")
        .out_path(out.path().join("example.pdf"));

    let err = convert_to_file(&drive, gdoc(), &request, &ExportConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GDocDownError::ConflictingOutputSpec));
    assert_eq!(
        err.to_string(),
        "Output file path and extension cannot both be specified"
    );
    assert_eq!(drive.calls(), 0);
    assert!(files_in(out.path()).is_empty());
}

#[tokio::test]
async fn test_export_failure_writes_nothing() {
    let out = tempfile::tempdir().unwrap();
    let drive = FakeDrive::failing(403);
    let request = ExportRequest::default().format("pdf").out_path(out.path());

    let err = convert_to_file(&drive, gdoc(), &request, &ExportConfig::default())
        .await
        .unwrap_err();

    assert!(
        matches!(err, GDocDownError::ExportFailed { status: 403, .. }),
        "unexpected error: {err}"
    );
    assert_eq!(drive.calls(), 1);
    assert!(files_in(out.path()).is_empty());
}

#[tokio::test]
async fn test_missing_pointer_file() {
    let drive = FakeDrive::new();
    let err = convert(
        &drive,
        fixtures_dir().join("missing.gdoc"),
        &ExportRequest::default(),
        &ExportConfig::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, GDocDownError::PointerNotFound { .. }));
    assert_eq!(drive.calls(), 0);
}

#[tokio::test]
async fn test_plan_rejects_usage_errors_without_a_client() {
    let config = ExportConfig::default();
    let unsupported = ExportRequest::default().format("unsupported");
    let err = plan(gdoc(), &unsupported, &config).unwrap_err();
    assert!(err.is_usage_error(), "{err}");

    let conflicting = ExportRequest::default().extension("txt").out_path("report.txt");
    let err = plan(gdoc(), &conflicting, &config).unwrap_err();
    assert!(matches!(err, GDocDownError::ConflictingOutputSpec));

    let drive = FakeDrive::new();
    let ready = plan(gslides(), &ExportRequest::default().format("pdf"), &config).unwrap();
    assert_eq!(ready.pointer.kind, DocumentKind::Presentation);
    let output = execute(&drive, ready, &config).await.unwrap();
    assert_eq!(output.format, "pdf");
    assert_eq!(drive.calls(), 1);
}

// ── Progress, inspect, sync ──────────────────────────────────────────────────

#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl ExportProgressCallback for RecordingCallback {
    fn on_export_start(&self, _document_id: &str, mime_type: &str) {
        self.events.lock().unwrap().push(format!("start {mime_type}"));
    }

    fn on_export_complete(&self, _document_id: &str, _bytes: usize) {
        self.events.lock().unwrap().push("complete".to_string());
    }

    fn on_render_complete(&self, annotations: usize) {
        self.events.lock().unwrap().push(format!("render {annotations}"));
    }

    fn on_write_complete(&self, path: &Path, _bytes: usize) {
        let name = path.file_name().unwrap().to_string_lossy();
        self.events.lock().unwrap().push(format!("write {name}"));
    }
}

#[tokio::test]
async fn test_progress_events_in_order() {
    let out = tempfile::tempdir().unwrap();
    let recorder = Arc::new(RecordingCallback::default());
    let config = ExportConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let request = ExportRequest::default().format("tex").out_path(out.path());

    convert_to_file(&FakeDrive::new(), gdoc(), &request, &config)
        .await
        .unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["start text/html", "complete", "render 2", "write example.tex"]
    );
}

#[test]
fn test_inspect_fixtures() {
    for kind in DocumentKind::ALL {
        let pointer = inspect(fixture_for(kind)).expect("fixture should parse");
        assert_eq!(pointer.kind, kind);
        assert_eq!(pointer.id, DOC_ID);
        assert_eq!(pointer.email.as_deref(), Some("gdoc.down@example.org"));
        assert_eq!(pointer.stem(), "example");
    }
}

#[test]
fn test_convert_sync() {
    let out = tempfile::tempdir().unwrap();
    let request = ExportRequest::default().format("pptx").out_path(out.path());

    let stats = convert_sync(&FakeDrive::new(), gslides(), &request, &ExportConfig::default())
        .expect("sync export should succeed");

    assert!(out.path().join("example.pptx").is_file());
    assert!(stats.bytes_written > 0);
}
