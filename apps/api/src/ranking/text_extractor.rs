//! PDF bytes to page-concatenated plain text.

use lopdf::Document;
use tracing::debug;

use crate::errors::PipelineError;

/// Extracts the text of every page in document order.
///
/// A page whose text cannot be decoded contributes an empty string; only an
/// unparseable (or encrypted) document is an error.
pub fn extract_text(filename: &str, content: &[u8]) -> Result<String, PipelineError> {
    let doc = Document::load_mem(content).map_err(|e| PipelineError::DocumentParse {
        filename: filename.to_string(),
        reason: e.to_string(),
    })?;

    if doc.is_encrypted() {
        return Err(PipelineError::DocumentParse {
            filename: filename.to_string(),
            reason: "document is encrypted".to_string(),
        });
    }

    let mut text = String::new();
    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => debug!("No text recovered from page {page_number} of {filename}: {e}"),
        }
    }
    Ok(text)
}

/// Builds a minimal PDF with one page per entry in `pages`.
#[cfg(test)]
pub(crate) fn sample_pdf(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page_text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*page_text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_single_page() {
        let pdf = sample_pdf(&["Name: Jane Doe"]);
        let text = extract_text("jane.pdf", &pdf).unwrap();
        assert!(text.contains("Name: Jane Doe"), "got {text:?}");
    }

    #[test]
    fn test_concatenates_pages_in_order() {
        let pdf = sample_pdf(&["First page Rust", "Second page Kafka"]);
        let text = extract_text("two.pdf", &pdf).unwrap();
        let first = text.find("First page").expect("first page text");
        let second = text.find("Second page").expect("second page text");
        assert!(first < second);
    }

    #[test]
    fn test_garbage_bytes_are_a_parse_error() {
        let err = extract_text("broken.pdf", b"definitely not a pdf").unwrap_err();
        match err {
            PipelineError::DocumentParse { filename, .. } => assert_eq!(filename, "broken.pdf"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_input_is_a_parse_error() {
        assert!(extract_text("empty.pdf", &[]).is_err());
    }
}
