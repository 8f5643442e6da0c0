//! Pipeline stages for first-page PNG previews.
//!
//! Each submodule implements one transformation step and knows nothing about
//! the stages around it; [`crate::convert::Converter`] sequences them.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ open ──▶ render ──▶ encode
//! (bytes)   (page 1)  (pixels)   (PNG + reference)
//! ```
//!
//! 1. [`input`]: the raw byte buffer, and reading it from a local file
//! 2. [`open`]: parse with the backend and extract the first page
//! 3. [`render`]: size the viewport, allocate the surface, paint; runs in
//!    `spawn_blocking` together with `open` because pdfium is not async-safe
//! 4. [`encode`]: PNG-encode the surface, derive the output name, register
//!    the image reference

pub mod encode;
pub mod input;
pub mod open;
pub mod render;
