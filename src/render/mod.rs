// src/render/mod.rs
//! Certificate artifact rendering.
//!
//! The verification flow depends only on [`ArtifactRenderer`]; the PDF
//! implementation lives in [`pdf`].

pub mod pdf;

use crate::error::RenderError;
use crate::models::certificate::CertificateRecord;
use bytes::Bytes;

/// Target paper size, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpec {
    pub width_mm: f32,
    pub height_mm: f32,
}

impl PageSpec {
    /// ISO A4, landscape. The only page format certificates are printed on.
    pub const A4_LANDSCAPE: PageSpec = PageSpec {
        width_mm: 297.0,
        height_mm: 210.0,
    };
}

/// A rendered, downloadable document.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Bytes,
}

/// Turns a fully-populated certificate into a printable document.
///
/// Rendering is synchronous and CPU-bound; async callers should run it on
/// the blocking pool. Every failure is retriable.
pub trait ArtifactRenderer: Send + Sync {
    fn render(&self, record: &CertificateRecord, page: PageSpec) -> Result<Artifact, RenderError>;
}
