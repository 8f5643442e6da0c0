//! Batch conversion: many documents, results as they complete.
//!
//! Each input is an independent conversion through the same [`Converter`], so
//! they share one backend load and one image registry. Results arrive in
//! completion order, not input order; each item carries the declared name so
//! callers can correlate.

use crate::backend::RenderBackend;
use crate::convert::Converter;
use crate::output::ConversionResult;
use crate::pipeline::input::RawDocument;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of `(declared name, result)` pairs.
pub type ResultStream = Pin<Box<dyn Stream<Item = (String, ConversionResult)> + Send>>;

/// Convert every `(name, document)` in `inputs`, running at most
/// `concurrency` conversions at once (minimum 1).
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use pdf2png::{convert_many, Converter, RawDocument};
///
/// # #[tokio::main]
/// # async fn main() {
/// let converter = Converter::pdfium(Default::default());
/// let inputs = vec![
///     ("a.pdf".to_string(), RawDocument::from(std::fs::read("a.pdf").unwrap())),
///     ("b.pdf".to_string(), RawDocument::from(std::fs::read("b.pdf").unwrap())),
/// ];
/// let mut results = convert_many(&converter, inputs, 4);
/// while let Some((name, result)) = results.next().await {
///     println!("{name}: {}", result.error().unwrap_or("ok"));
/// }
/// # }
/// ```
pub fn convert_many<B, I>(converter: &Converter<B>, inputs: I, concurrency: usize) -> ResultStream
where
    B: RenderBackend,
    I: IntoIterator<Item = (String, RawDocument)>,
    I::IntoIter: Send + 'static,
{
    let concurrency = concurrency.max(1);
    info!("Starting batch conversion (concurrency {})", concurrency);

    let converter = converter.clone();
    let s = stream::iter(inputs.into_iter().map(move |(name, document)| {
        let converter = converter.clone();
        async move {
            let result = converter.convert(document, &name).await;
            (name, result)
        }
    }))
    .buffer_unordered(concurrency);

    Box::pin(s)
}
