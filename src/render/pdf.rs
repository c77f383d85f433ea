// src/render/pdf.rs
//! Single-page PDF certificate renderer.
//!
//! The certificate is laid out as a fixed template of text lines positioned
//! relative to the page size, then written with the PDF builtin Helvetica
//! faces so no font files have to ship with the service. Those faces only
//! cover Windows-1252, so a field with any other character fails the render
//! instead of losing glyphs on the page.

use crate::error::RenderError;
use crate::models::certificate::CertificateRecord;
use crate::render::{Artifact, ArtifactRenderer, PageSpec};
use bytes::Bytes;
use log::{debug, error};
use printpdf::{BuiltinFont, Mm, PdfDocument};

/// Millimetres per PostScript point.
const MM_PER_PT: f32 = 0.3528;
/// Average Helvetica glyph advance as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;
/// Distance kept from the left/right page edge for corner text.
const SIDE_MARGIN_MM: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Anchor {
    Center,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
struct TextLine {
    text: String,
    size_pt: f32,
    bold: bool,
    anchor: Anchor,
    /// Baseline height as a fraction of the page height, from the bottom.
    y_frac: f32,
}

impl TextLine {
    fn new(text: impl Into<String>, size_pt: f32, bold: bool, anchor: Anchor, y_frac: f32) -> Self {
        Self {
            text: text.into(),
            size_pt,
            bold,
            anchor,
            y_frac,
        }
    }

    fn x_mm(&self, page: PageSpec) -> f32 {
        let width = self.text.chars().count() as f32 * self.size_pt * AVG_GLYPH_EM * MM_PER_PT;
        match self.anchor {
            Anchor::Left => SIDE_MARGIN_MM,
            Anchor::Right => (page.width_mm - SIDE_MARGIN_MM - width).max(SIDE_MARGIN_MM),
            Anchor::Center => ((page.width_mm - width) / 2.0).max(0.0),
        }
    }
}

/// The certificate's printed content, filled from a record.
struct CertificateTemplate<'a> {
    institute_name: &'a str,
    record: &'a CertificateRecord,
}

/// Whether the builtin fonts (WinAnsiEncoding) have a glyph for `c`.
fn builtin_font_covers(c: char) -> bool {
    matches!(c, ' '..='~' | '\u{a0}'..='\u{ff}')
        || matches!(
            c,
            '€' | '‚' | 'ƒ' | '„' | '…' | '†' | '‡' | 'ˆ' | '‰' | 'Š' | '‹' | 'Œ' | 'Ž' | '‘' | '’'
                | '“' | '”' | '•' | '–' | '—' | '˜' | '™' | 'š' | '›' | 'œ' | 'ž' | 'Ÿ'
        )
}

impl<'a> CertificateTemplate<'a> {
    fn required(name: &'static str, value: &str) -> Result<(), RenderError> {
        if value.trim().is_empty() {
            return Err(RenderError::MissingField(name));
        }
        match value.chars().find(|&c| !builtin_font_covers(c)) {
            Some(character) => Err(RenderError::UnsupportedCharacter {
                field: name,
                character,
            }),
            None => Ok(()),
        }
    }

    fn lines(&self) -> Result<Vec<TextLine>, RenderError> {
        let r = self.record;
        Self::required("instituteName", self.institute_name)?;
        Self::required("registrationNo", &r.registration_no)?;
        Self::required("serialNo", &r.serial_no)?;
        Self::required("studentName", &r.student_name)?;
        Self::required("guardianName", &r.guardian_name)?;
        Self::required("courseName", &r.course_name)?;
        Self::required("duration", &r.duration)?;
        Self::required("grade", &r.grade)?;
        Self::required("place", &r.place)?;

        Ok(vec![
            TextLine::new(format!("Sl. No.: {}", r.serial_no), 10.0, false, Anchor::Left, 0.93),
            TextLine::new(
                format!("Reg. No.: {}", r.registration_no),
                10.0,
                false,
                Anchor::Right,
                0.93,
            ),
            TextLine::new(self.institute_name, 26.0, true, Anchor::Center, 0.82),
            TextLine::new("CERTIFICATE OF COMPLETION", 20.0, true, Anchor::Center, 0.72),
            TextLine::new("This is to certify that", 13.0, false, Anchor::Center, 0.62),
            TextLine::new(r.student_name.as_str(), 22.0, true, Anchor::Center, 0.54),
            TextLine::new(
                format!("Son/Daughter of {}", r.guardian_name),
                13.0,
                false,
                Anchor::Center,
                0.47,
            ),
            TextLine::new("has successfully completed the course", 13.0, false, Anchor::Center, 0.40),
            TextLine::new(r.course_name.as_str(), 18.0, true, Anchor::Center, 0.33),
            TextLine::new(
                format!("of duration {} and secured grade {}", r.duration, r.grade),
                13.0,
                false,
                Anchor::Center,
                0.26,
            ),
            TextLine::new(format!("Place: {}", r.place), 11.0, false, Anchor::Left, 0.10),
            TextLine::new(
                format!("Date of Issue: {}", r.issue_date.format("%d-%m-%Y")),
                11.0,
                false,
                Anchor::Right,
                0.10,
            ),
        ])
    }
}

/// Renders certificates as PDF documents.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    institute_name: String,
}

impl PdfRenderer {
    /// # Arguments
    /// * `institute_name` - Heading printed at the top of every certificate
    pub fn new(institute_name: impl Into<String>) -> Self {
        Self {
            institute_name: institute_name.into(),
        }
    }
}

fn backend<E: std::fmt::Debug>(err: E) -> RenderError {
    RenderError::Backend(format!("{:?}", err))
}

impl ArtifactRenderer for PdfRenderer {
    fn render(&self, record: &CertificateRecord, page: PageSpec) -> Result<Artifact, RenderError> {
        let template = CertificateTemplate {
            institute_name: &self.institute_name,
            record,
        };
        let lines = template.lines()?;

        let title = format!("Certificate {}", record.registration_no);
        let (doc, page_index, layer_index) = PdfDocument::new(
            title.as_str(),
            Mm(page.width_mm),
            Mm(page.height_mm),
            "certificate",
        );
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(backend)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(backend)?;
        let layer = doc.get_page(page_index).get_layer(layer_index);

        for line in &lines {
            let font = if line.bold { &bold } else { &regular };
            layer.use_text(
                line.text.clone(),
                line.size_pt,
                Mm(line.x_mm(page)),
                Mm(page.height_mm * line.y_frac),
                font,
            );
        }

        let bytes = doc.save_to_bytes().map_err(|e| {
            error!("PDF serialization failed for {}: {:?}", record.registration_no, e);
            backend(e)
        })?;
        debug!(
            "Rendered certificate {} ({} bytes)",
            record.registration_no,
            bytes.len()
        );

        Ok(Artifact {
            filename: record.artifact_filename(),
            content_type: "application/pdf",
            bytes: Bytes::from(bytes),
        })
    }
}
