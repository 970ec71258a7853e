//! Document information dictionary

use chrono::{DateTime, Local};
use lopdf::{Dictionary, Object, StringFormat};

const DEFAULT_PRODUCER: &str = concat!("zhpdf pdf-core ", env!("CARGO_PKG_VERSION"));

/// Metadata written to the PDF Info dictionary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    /// Defaults to the crate name and version when unset
    pub producer: Option<String>,
}

impl DocumentInfo {
    /// Build the Info dictionary stamped with the given creation time
    pub fn to_dictionary(&self, created: DateTime<Local>) -> Dictionary {
        let mut dict = Dictionary::new();

        let fields = [
            ("Title", self.title.as_deref()),
            ("Author", self.author.as_deref()),
            ("Subject", self.subject.as_deref()),
            ("Creator", self.creator.as_deref()),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                dict.set(key, text_string(value));
            }
        }

        dict.set(
            "Producer",
            text_string(self.producer.as_deref().unwrap_or(DEFAULT_PRODUCER)),
        );
        dict.set("CreationDate", Object::string_literal(pdf_date(created)));

        dict
    }
}

/// Encode a PDF text string: PDFDocEncoding-compatible ASCII as a literal,
/// anything else as UTF-16BE with a byte order mark
pub(crate) fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::string_literal(value);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Format a timestamp as a PDF date, e.g. `D:20240131120000+07'00'`
fn pdf_date(time: DateTime<Local>) -> String {
    let offset = time.format("%z").to_string();
    let (hours, minutes) = offset.split_at(offset.len().saturating_sub(2));
    format!("D:{}{}'{}'", time.format("%Y%m%d%H%M%S"), hours, minutes)
}
