//! PDF text extraction module
//!
//! Provides functionality to extract text from Strategic Management Journal
//! paper PDFs using the rsrpp crate.

mod extractor;

pub use extractor::{ExtractedText, ExtractionConfig, PdfExtractor};
