//! Embedded image extraction.

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

/// An image XObject found on a page.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    /// Encoded image bytes.
    pub data: Vec<u8>,
    /// File format, "jpeg" or "jp2".
    pub format: String,
    pub width: u32,
    pub height: u32,
}

impl ExtractedImage {
    pub fn mime_type(&self) -> &'static str {
        match self.format.as_str() {
            "jp2" => "image/jp2",
            _ => "image/jpeg",
        }
    }
}

/// The page's resource dictionary, following `Parent` links for inherited resources.
fn page_resources<'a>(doc: &'a Document, page_id: ObjectId) -> Option<&'a Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    loop {
        if let Ok(resources) = node.get(b"Resources") {
            return doc.dereference(resources).ok()?.1.as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
}

fn has_filter(dict: &Dictionary, filter: &[u8]) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name.as_slice() == filter,
        Ok(Object::Array(filters)) => filters
            .iter()
            .any(|f| f.as_name().map(|n| n == filter).unwrap_or(false)),
        _ => false,
    }
}

fn dimension(dict: &Dictionary, key: &[u8]) -> u32 {
    dict.get(key)
        .and_then(|v| v.as_i64())
        .map(|v| v.max(0) as u32)
        .unwrap_or(0)
}

/// Image XObjects of a page that carry a standalone encoded image.
///
/// JPEG and JPEG 2000 streams are files on their own; images stored as raw
/// or deflated pixel data are skipped.
pub(crate) fn page_images(doc: &Document, page_id: ObjectId) -> Vec<ExtractedImage> {
    let mut images = Vec::new();

    let Some(resources) = page_resources(doc, page_id) else {
        return images;
    };
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_dict().ok())
    else {
        return images;
    };

    for (name, object) in xobjects.iter() {
        let Ok((_, target)) = doc.dereference(object) else {
            continue;
        };
        let Ok(stream) = target.as_stream() else {
            continue;
        };

        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(|s| s.as_name())
            .map(|s| s == b"Image")
            .unwrap_or(false);
        if !is_image {
            continue;
        }

        let format = if has_filter(&stream.dict, b"DCTDecode") {
            "jpeg"
        } else if has_filter(&stream.dict, b"JPXDecode") {
            "jp2"
        } else {
            debug!("Skipping raw image {}", String::from_utf8_lossy(name));
            continue;
        };

        images.push(ExtractedImage {
            data: stream.content.clone(),
            format: format.to_string(),
            width: dimension(&stream.dict, b"Width"),
            height: dimension(&stream.dict, b"Height"),
        });
    }

    images
}
