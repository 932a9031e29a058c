//! Pipeline stages that turn source bytes into per-page images.
//!
//! ## Data Flow
//!
//! ```text
//! bytes ──▶ document ──▶ classify ──┬─▶ extract ──────────────┐
//!          (lopdf)                  └─▶ render ──▶ encode ───┴─▶ PageImage
//!                                       (pdfium)   (PNG)
//! ```
//!
//! 1. [`document`]: parse the PDF (or decode a standalone image) and build a
//!    per-page plan
//! 2. [`inventory`]: gather a page's images and Form XObject text, following
//!    inherited resources
//! 3. [`classify`]: decide per page between lossless extraction and
//!    rasterisation
//! 4. [`extract`]: copy a lone embedded image out of the object table
//! 5. [`render`]: rasterise the remaining pages a batch at a time; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 6. [`encode`]: PNG-encode rendered pages

pub mod classify;
pub mod document;
pub mod encode;
pub mod extract;
pub mod inventory;
pub mod render;
