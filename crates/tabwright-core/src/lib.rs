pub mod boundary;
pub mod calibrate;
pub mod candidate;
pub mod config;
pub mod error;
pub mod extraction;
pub mod geometry;
pub mod heading;
pub mod hierarchy;
pub mod lines;
pub mod model;
pub mod pipeline;
pub mod reference;
pub mod report;
pub mod structure;

use config::schema::ExtractorConfig;
use error::TabwrightError;
use extraction::{PageWords, TextSource};
use heading::HeadingClassifier;
use model::DocumentResult;

/// Main API entry point: detect tables in a PDF.
///
/// Loads positioned words through `source`, then runs table detection over
/// every page. An unprocessable document is not an error; it comes back as
/// a [`DocumentResult`] with an `Unprocessable` status.
pub fn extract_pdf(
    pdf_bytes: &[u8],
    source: &dyn TextSource,
    config: &ExtractorConfig,
    classifier: &dyn HeadingClassifier,
) -> Result<DocumentResult, TabwrightError> {
    let pages = source.load_pages(pdf_bytes)?;
    tracing::debug!(
        backend = source.backend_name(),
        pages = pages.len(),
        "text loaded"
    );
    Ok(extract_tables(&pages, config, classifier))
}

/// Detect tables in already-extracted pages.
pub fn extract_tables(
    pages: &[PageWords],
    config: &ExtractorConfig,
    classifier: &dyn HeadingClassifier,
) -> DocumentResult {
    pipeline::extract_document(pages, config, classifier)
}
