//! Pipeline stages for document → transcript extraction.
//!
//! Each submodule implements exactly one step. The three engine-facing
//! stages are traits so the coordinator can be driven by pdfium and
//! Tesseract in production and by in-memory fakes in tests.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌──────── image ───────────────────────────▶ recognize ──┐
//! input ─────┤                                                        ├──▶ transcript
//!            └─ pdf ─▶ native ──(too short / parse error)──▶ ocr ─────┘
//!                                                  (render ▶ recognize, per page)
//! ```
//!
//! 1. [`input`]      : stage a path, URL or byte buffer as a [`input::DocumentRef`]
//! 2. [`native`]     : read the PDF text layer
//! 3. [`render`]     : rasterise one page into a self-deleting [`render::PageImage`]
//! 4. [`recognize`]  : OCR one image
//! 5. [`ocr`]        : drive render + recognize over every page, in order
//! 6. [`postprocess`]: deterministic cleanup of OCR text
//! 7. [`pdfium`]     : pdfium implementation of stages 2 and 3
//! 8. [`llm`]        : the downstream summarizer call (outside the core)

pub mod input;
pub mod llm;
pub mod native;
pub mod ocr;
pub mod pdfium;
pub mod postprocess;
pub mod recognize;
pub mod render;
