//! Report payload shaping and artifact rendering.

mod assembler;
mod export;
mod layout;
mod payload;

pub use assembler::{
    filename, slugify, ArtifactKind, RenderedArtifact, ReportAssembler, ReportFormat,
    ReportSections,
};
pub use export::{encode_csv, CSV_COLUMNS};
pub use layout::{layout_report, DocumentEncoder, DocumentLayout, PlainTextEncoder, Section};
pub use payload::{CsvRow, KpiSummary, ReportMeta, ReportPayload};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write report output: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to format report text")]
    Format(#[from] std::fmt::Error),
    #[error("document encoder failed: {0}")]
    Encoder(String),
}
