//! Scripted rendering backend shared by the integration tests.
//!
//! A "document" is a line of text:
//!
//! ```text
//! MOCK pages=1 size=612x792 [noise] [sleep=MS] [paint=fail|panic]
//! ```
//!
//! Anything that does not start with `MOCK` fails to open, the way a real
//! engine rejects bytes without a PDF header.

#![allow(dead_code)]

use image::Rgba;
use pdf2png::{
    BackendDocument, BackendError, BackendLoader, ConversionConfig, Converter, LoadError,
    ObjectUrlRegistry, PageSize, RenderBackend, RenderQuality, Surface,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct MockBackend;

#[derive(Debug, Default)]
pub struct MockDocument {
    pages: usize,
    size: Option<(f32, f32)>,
    noise: bool,
    sleep_ms: u64,
    paint: Option<String>,
}

impl RenderBackend for MockBackend {
    type Document<'a>
        = MockDocument
    where
        Self: 'a;

    fn name(&self) -> &str {
        "mock"
    }

    fn open_document<'a>(&'a self, bytes: &'a [u8]) -> Result<MockDocument, BackendError> {
        let text = std::str::from_utf8(bytes).map_err(|_| BackendError::new("binary garbage"))?;
        let mut words = text.split_whitespace();
        if words.next() != Some("MOCK") {
            return Err(BackendError::new("missing %PDF header"));
        }

        let mut doc = MockDocument::default();
        for word in words {
            match word.split_once('=') {
                Some(("pages", n)) => {
                    doc.pages = n.parse().map_err(|_| BackendError::new("bad page count"))?
                }
                Some(("size", s)) => {
                    let (w, h) = s.split_once('x').ok_or_else(|| BackendError::new("bad size"))?;
                    let w = w.parse().map_err(|_| BackendError::new("bad width"))?;
                    let h = h.parse().map_err(|_| BackendError::new("bad height"))?;
                    doc.size = Some((w, h));
                }
                Some(("sleep", ms)) => {
                    doc.sleep_ms = ms.parse().map_err(|_| BackendError::new("bad sleep"))?
                }
                Some(("paint", mode)) => doc.paint = Some(mode.to_string()),
                None if word == "noise" => doc.noise = true,
                _ => return Err(BackendError::new(format!("unknown token {word}"))),
            }
        }
        Ok(doc)
    }
}

impl BackendDocument for MockDocument {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_size(&self, index: usize) -> Result<PageSize, BackendError> {
        if index >= self.pages {
            return Err(BackendError::new(format!("no page {index}")));
        }
        let (w, h) = self.size.unwrap_or((612.0, 792.0));
        Ok(PageSize::new(w, h))
    }

    fn paint_page(
        &self,
        _index: usize,
        surface: &mut Surface,
        _quality: RenderQuality,
    ) -> Result<(), BackendError> {
        if self.sleep_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.sleep_ms));
        }
        match self.paint.as_deref() {
            Some("fail") => return Err(BackendError::new("scripted paint failure")),
            Some("panic") => panic!("scripted paint panic"),
            _ => {}
        }

        if self.noise {
            // xorshift: incompressible pixels, so PNG size tracks pixel count.
            let mut state: u32 = 0x9E37_79B9;
            for px in surface.pixels_mut().pixels_mut() {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let [r, g, b, _] = state.to_le_bytes();
                *px = Rgba([r, g, b, 255]);
            }
        } else {
            let (w, h) = (surface.width(), surface.height());
            for y in 0..h / 2 {
                for x in 0..w / 2 {
                    surface.pixels_mut().put_pixel(x, y, Rgba([0, 0, 0, 255]));
                }
            }
        }
        Ok(())
    }
}

/// Bytes of a mock document with `pages` pages of `width × height` points.
pub fn mock_pdf(pages: usize, width: f32, height: f32) -> Vec<u8> {
    format!("MOCK pages={pages} size={width}x{height}").into_bytes()
}

/// Like [`mock_pdf`], with extra tokens appended.
pub fn mock_pdf_with(pages: usize, width: f32, height: f32, extra: &[&str]) -> Vec<u8> {
    let mut text = format!("MOCK pages={pages} size={width}x{height}");
    for token in extra {
        text.push(' ');
        text.push_str(token);
    }
    text.into_bytes()
}

/// A loader that counts init calls, fails the first `fail_first` of them,
/// and takes `delay` to finish each.
pub fn counting_loader(
    loads: Arc<AtomicUsize>,
    fail_first: usize,
    delay: Duration,
) -> Arc<BackendLoader<MockBackend>> {
    Arc::new(BackendLoader::new(move || {
        let loads = Arc::clone(&loads);
        async move {
            let n = loads.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(delay).await;
            if n <= fail_first {
                Err(LoadError::new(format!("mock library missing (attempt {n})")))
            } else {
                Ok(MockBackend)
            }
        }
    }))
}

/// A converter over a ready mock backend with its own registry.
pub fn mock_converter(config: ConversionConfig) -> Converter<MockBackend> {
    Converter::new(Arc::new(BackendLoader::preloaded(MockBackend)), config)
        .with_registry(Arc::new(ObjectUrlRegistry::new()))
}
