//! PDF reading: slide extraction for lectures and page text for ingestion.

mod describe;
mod images;
mod parser;
mod tables;
mod text;

pub use describe::{ImageDescriber, VisionDescriber};
pub use images::ExtractedImage;
pub use parser::{create_parser, DocumentParser, LlmParser, TextParser};
pub use tables::{detect_tables, Table};
pub use text::{clean_text, split_title, UNTITLED_SLIDE};

use crate::error::{Result, SmartLearnError};
use lopdf::Document;
use tracing::{debug, info, instrument, warn};

/// Everything read from one PDF page.
#[derive(Debug, Clone)]
pub struct ExtractedSlide {
    /// 1-based page number.
    pub number: u32,
    pub title: String,
    /// Cleaned body text.
    pub content: String,
    pub tables: Vec<Table>,
    pub images: Vec<ExtractedImage>,
}

fn load(pdf: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(pdf)?;
    if doc.get_pages().is_empty() {
        return Err(SmartLearnError::InvalidInput("PDF has no pages".to_string()));
    }
    Ok(doc)
}

/// Raw text of every page, in page order.
#[instrument(skip_all, fields(bytes = pdf.len()))]
pub fn page_texts(pdf: &[u8]) -> Result<Vec<String>> {
    let doc = load(pdf)?;
    let mut texts = Vec::new();
    for page_number in doc.get_pages().keys() {
        let text = doc.extract_text(&[*page_number]).unwrap_or_else(|e| {
            warn!("No text on page {}: {}", page_number, e);
            String::new()
        });
        texts.push(text);
    }
    debug!("Read {} pages", texts.len());
    Ok(texts)
}

/// Extract title, text, tables and embedded images of every page.
#[instrument(skip_all, fields(bytes = pdf.len()))]
pub fn extract_slides(pdf: &[u8]) -> Result<Vec<ExtractedSlide>> {
    let doc = load(pdf)?;
    let mut slides = Vec::new();

    for (page_number, page_id) in doc.get_pages() {
        let raw = doc.extract_text(&[page_number]).unwrap_or_else(|e| {
            warn!("No text on page {}: {}", page_number, e);
            String::new()
        });

        let (title, body) = split_title(&raw);
        let body_lines: Vec<&str> = body.lines().collect();

        slides.push(ExtractedSlide {
            number: page_number,
            title,
            content: clean_text(&body),
            tables: detect_tables(&body_lines),
            images: images::page_images(&doc, page_id),
        });
    }

    info!("Extracted {} slides", slides.len());
    Ok(slides)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_slides_titles_and_text() {
        let pdf = fixtures::pdf_with_pages(&[
            &["Linear Equations", "A line has slope m.", "It crosses y at b."],
            &["Quadratics", "Parabolas open up or down."],
        ]);

        let slides = extract_slides(&pdf).unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].number, 1);
        assert_eq!(slides[0].title.trim(), "Linear Equations");
        assert!(slides[0].content.contains("slope m."));
        assert_eq!(slides[1].title.trim(), "Quadratics");
    }

    #[test]
    fn test_page_texts_in_order() {
        let pdf = fixtures::pdf_with_pages(&[&["First"], &["Second"], &["Third"]]);
        let texts = page_texts(&pdf).unwrap();
        assert_eq!(texts.len(), 3);
        assert!(texts[2].contains("Third"));
    }

    #[test]
    fn test_embedded_jpeg_is_extracted() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];
        let pdf = fixtures::pdf_with_pages_and_image(&[&["Photo slide"], &["Plain"]], Some(&jpeg));

        let slides = extract_slides(&pdf).unwrap();
        assert_eq!(slides[0].images.len(), 1);
        assert_eq!(slides[0].images[0].format, "jpeg");
        assert_eq!(slides[0].images[0].width, 2);
        assert_eq!(slides[0].images[0].data, jpeg.to_vec());
        assert!(slides[1].images.is_empty());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(extract_slides(b"definitely not a pdf").is_err());
    }
}
