//! End-to-end tests against the real pdfium library.
//!
//! Documents are generated in memory, so no fixtures are needed, but pdfium
//! must be installed. The tests are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly
//! requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e -- --nocapture

use futures::StreamExt;
use pdf2png::{
    convert, convert_blocking, convert_many, ConversionConfig, ConversionResult, Converter,
    FailureKind, RawDocument, RenderQuality,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    };
}

/// A valid PDF with one blank page per `(width, height)` entry, in points.
fn minimal_pdf(pages: &[(u32, u32)]) -> Vec<u8> {
    let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", i + 3)).collect();
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        ),
    ];
    for (w, h) in pages {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {w} {h}] /Resources << >> >>"
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

fn png_dimensions(result: &ConversionResult) -> (u32, u32) {
    let file = result.file().expect("conversion should succeed");
    let img = image::load_from_memory(&file.bytes).expect("valid PNG");
    (img.width(), img.height())
}

// ── Conversions ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_letter_page_default_scale() {
    e2e_skip_unless_enabled!();

    let result = convert(minimal_pdf(&[(612, 792)]), "letter.pdf").await;
    assert!(result.is_success(), "error: {:?}", result.error());
    assert_eq!(result.file().unwrap().name, "letter.png");
    assert_eq!(png_dimensions(&result), (1224, 1584));
    println!("letter.png: {} bytes", result.file().unwrap().size());
}

#[tokio::test]
async fn test_only_first_page_size_counts() {
    e2e_skip_unless_enabled!();

    let config = ConversionConfig::builder()
        .scale(1.0)
        .quality(RenderQuality::Fast)
        .build()
        .unwrap();
    let converter = Converter::pdfium(config);
    let result = converter
        .convert(minimal_pdf(&[(300, 200), (612, 792)]), "Mixed.PDF")
        .await;

    assert_eq!(result.file().unwrap().name, "Mixed.png");
    assert_eq!(png_dimensions(&result), (300, 200));
}

#[tokio::test]
async fn test_blank_page_renders_white() {
    e2e_skip_unless_enabled!();

    let converter = Converter::pdfium(ConversionConfig::builder().scale(0.5).build().unwrap());
    let result = converter.convert(minimal_pdf(&[(100, 100)]), "blank.pdf").await;
    let file = result.file().expect("conversion should succeed");
    let img = image::load_from_memory(&file.bytes).unwrap().into_rgba8();
    assert!(img.pixels().all(|p| p.0 == [255, 255, 255, 255]));
}

#[tokio::test]
async fn test_zero_page_document() {
    e2e_skip_unless_enabled!();

    let result = convert(minimal_pdf(&[]), "empty-doc.pdf").await;
    assert_eq!(result.failure_kind(), Some(FailureKind::PageNotFound));
}

#[tokio::test]
async fn test_not_a_pdf() {
    e2e_skip_unless_enabled!();

    for bytes in [Vec::new(), b"<html><body>hi</body></html>".to_vec()] {
        let result = convert(bytes, "page.pdf").await;
        assert_eq!(result.failure_kind(), Some(FailureKind::DocumentParse));
        assert_eq!(result.image_url(), "");
        println!("error: {}", result.error().unwrap());
    }
}

#[tokio::test]
async fn test_batch_shares_backend() {
    e2e_skip_unless_enabled!();

    let converter = Converter::pdfium(ConversionConfig::default());
    let inputs: Vec<(String, RawDocument)> = (1..=6)
        .map(|i| (format!("doc{i}.pdf"), minimal_pdf(&[(100 * i, 100)]).into()))
        .collect();

    let results: Vec<_> = convert_many(&converter, inputs, 3).collect().await;
    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|(_, r)| r.is_success()));
    assert_eq!(converter.loader().attempts(), 1);
}

#[test]
fn test_convert_blocking() {
    e2e_skip_unless_enabled!();

    let result = convert_blocking(minimal_pdf(&[(200, 100)]), "sync.pdf");
    assert_eq!(png_dimensions(&result), (400, 200));
}
