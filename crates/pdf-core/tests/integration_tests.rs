//! Integration tests for pdf-core
//!
//! These tests write complete documents and read them back with lopdf.
//! Tests that embed a font need a TrueType file: set `ZHPDF_TEST_FONT`
//! or install one of the common system fonts listed below.

use flate2::read::ZlibDecoder;
use lopdf::{Dictionary, Document, Object};
use pdf_core::{Canvas, Color, DocumentInfo, FontData, PageSize, PdfError};
use pretty_assertions::assert_eq;
use std::io::Read;
use std::path::PathBuf;

/// Find a TrueType font on this machine
fn get_test_font_data() -> Option<Vec<u8>> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(path) = std::env::var("ZHPDF_TEST_FONT") {
        candidates.push(path.into());
    }
    candidates.extend(
        [
            "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ]
        .map(PathBuf::from),
    );

    candidates
        .into_iter()
        .filter_map(|path| std::fs::read(path).ok())
        .find(|data| pdf_core::FontData::from_bytes("probe", data, 0).is_ok())
}

macro_rules! require_font {
    () => {
        match get_test_font_data() {
            Some(data) => data,
            None => {
                eprintln!("skipping: no TrueType font found (set ZHPDF_TEST_FONT)");
                return;
            }
        }
    };
}

/// Standalone TrueType files installed on this machine, at most `limit`
fn get_standalone_fonts(limit: usize) -> Vec<Vec<u8>> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSerif.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSerif.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSerif.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSerif-Regular.ttf",
    ]
    .iter()
    .filter_map(|path| std::fs::read(path).ok())
    .filter(|data| ttf_parser::fonts_in_collection(data).is_none())
    .filter(|data| FontData::from_bytes("probe", data, 0).is_ok())
    .take(limit)
    .collect()
}

/// Pack standalone fonts into a TrueType collection
///
/// Each font is copied as is; only the table offsets in its directory are
/// shifted, since offsets in a collection count from the start of the file.
fn build_collection(fonts: &[Vec<u8>]) -> Vec<u8> {
    let align = |n: usize| (n + 3) & !3;

    let mut offsets = Vec::with_capacity(fonts.len());
    let mut pos = align(12 + 4 * fonts.len());
    for font in fonts {
        offsets.push(pos);
        pos = align(pos + font.len());
    }

    let mut out = Vec::with_capacity(pos);
    out.extend_from_slice(b"ttcf");
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    out.extend_from_slice(&(fonts.len() as u32).to_be_bytes());
    for &offset in &offsets {
        out.extend_from_slice(&(offset as u32).to_be_bytes());
    }

    for (font, &offset) in fonts.iter().zip(&offsets) {
        out.resize(offset, 0);
        out.extend_from_slice(font);

        let num_tables = u16::from_be_bytes([font[4], font[5]]) as usize;
        for i in 0..num_tables {
            let at = offset + 12 + 16 * i + 8;
            let table_offset = u32::from_be_bytes([out[at], out[at + 1], out[at + 2], out[at + 3]]);
            out[at..at + 4].copy_from_slice(&(table_offset + offset as u32).to_be_bytes());
        }
    }
    out.resize(pos, 0);

    out
}

fn postscript_name(data: &[u8], index: u32) -> String {
    let face = ttf_parser::Face::parse(data, index).unwrap();
    face.names()
        .into_iter()
        .filter(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
        .find_map(|name| name.to_string())
        .unwrap()
}

/// All dictionaries in the document with the given /Subtype
fn dicts_with_subtype<'a>(doc: &'a Document, subtype: &str) -> Vec<&'a Dictionary> {
    doc.objects
        .values()
        .filter_map(|obj| obj.as_dict().ok())
        .filter(|dict| {
            dict.get(b"Subtype")
                .and_then(|s| s.as_name_str())
                .map(|s| s == subtype)
                .unwrap_or(false)
        })
        .collect()
}

/// Decompressed content of every page, in page order
fn page_contents(doc: &Document) -> Vec<String> {
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let content = doc.get_page_content(page_id).unwrap();
            String::from_utf8_lossy(&content).into_owned()
        })
        .collect()
}

#[test]
fn test_three_page_document() {
    let font_data = require_font!();

    let mut canvas = Canvas::new(PageSize::A4);
    canvas.register_font("wqy", &font_data, 0).unwrap();

    for text in ["测试第一页", "测试第二页", "测试第三页"] {
        canvas.set_font("wqy", 24.0).unwrap();
        canvas.draw_string(100.0, 700.0, text).unwrap();
        canvas.show_page();
    }
    assert_eq!(canvas.page_count(), 3);

    let bytes = canvas.to_bytes().expect("Failed to save PDF");
    let doc = Document::load_mem(&bytes).expect("Failed to re-open PDF");
    assert_eq!(doc.get_pages().len(), 3);

    for content in page_contents(&doc) {
        assert!(content.contains("/F1 24 Tf"));
        assert!(content.contains("100 700 Td"));
        assert!(content.contains("Tj"));
    }

    // One font shared by all pages
    assert_eq!(dicts_with_subtype(&doc, "Type0").len(), 1);
    assert_eq!(dicts_with_subtype(&doc, "CIDFontType2").len(), 1);
}

#[test]
fn test_font_state_resets_after_show_page() {
    let font_data = require_font!();

    let mut canvas = Canvas::default();
    canvas.register_font("wqy", &font_data, 0).unwrap();
    canvas.set_font("wqy", 24.0).unwrap();
    canvas.draw_string(100.0, 700.0, "one").unwrap();
    canvas.show_page();

    let result = canvas.draw_string(100.0, 700.0, "two");
    assert!(matches!(result, Err(PdfError::NoFontSelected(2))));
}

#[test]
fn test_pending_page_is_saved() {
    let font_data = require_font!();

    let mut canvas = Canvas::default();
    canvas.register_font("f", &font_data, 0).unwrap();
    canvas.set_font("f", 12.0).unwrap();
    canvas.draw_string(72.0, 72.0, "no trailing show_page").unwrap();
    assert_eq!(canvas.page_count(), 1);

    let bytes = canvas.to_bytes().unwrap();
    let doc = Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[test]
fn test_duplicate_font_name() {
    let font_data = require_font!();

    let mut canvas = Canvas::default();
    canvas.register_font("wqy", &font_data, 0).unwrap();
    let result = canvas.register_font("wqy", &font_data, 0);
    assert!(matches!(result, Err(PdfError::FontAlreadyExists(_))));
}

#[test]
fn test_face_index_out_of_range() {
    let font_data = require_font!();

    let mut canvas = Canvas::default();
    let result = canvas.register_font("wqy", &font_data, 99);
    assert!(matches!(result, Err(PdfError::FontParseError(_))));
}

#[test]
fn test_font_is_subsetted() {
    let font_data = require_font!();

    let mut canvas = Canvas::default();
    canvas.register_font("f", &font_data, 0).unwrap();
    canvas.set_font("f", 24.0).unwrap();
    canvas.draw_string(100.0, 700.0, "AB").unwrap();

    let bytes = canvas.to_bytes().unwrap();
    let doc = Document::load_mem(&bytes).unwrap();

    let descriptor = doc
        .objects
        .values()
        .filter_map(|obj| obj.as_dict().ok())
        .find(|dict| dict.has(b"FontFile2"))
        .expect("font descriptor");
    let font_file_id = descriptor
        .get(b"FontFile2")
        .unwrap()
        .as_reference()
        .unwrap();
    let font_file = doc.get_object(font_file_id).unwrap().as_stream().unwrap();
    let length1 = font_file.dict.get(b"Length1").unwrap().as_i64().unwrap();

    assert!(length1 > 0);
    assert!((length1 as usize) < font_data.len());

    let base_font = descriptor.get(b"FontName").unwrap().as_name_str().unwrap();
    assert_eq!(base_font.as_bytes()[6], b'+');
}

#[test]
fn test_tounicode_maps_drawn_text() {
    let font_data = require_font!();

    let mut canvas = Canvas::default();
    canvas.register_font("f", &font_data, 0).unwrap();
    canvas.set_font("f", 24.0).unwrap();
    canvas.draw_string(100.0, 700.0, "A").unwrap();

    let bytes = canvas.to_bytes().unwrap();
    let doc = Document::load_mem(&bytes).unwrap();

    let type0 = dicts_with_subtype(&doc, "Type0")[0];
    let cmap_id = type0.get(b"ToUnicode").unwrap().as_reference().unwrap();
    let cmap = doc.get_object(cmap_id).unwrap().as_stream().unwrap();
    let cmap_text = String::from_utf8_lossy(&cmap.content);

    assert!(cmap_text.contains("<0001> <0041>"));
    assert_eq!(
        type0.get(b"Encoding").unwrap().as_name_str().unwrap(),
        "Identity-H"
    );
}

#[test]
fn test_alignment_uses_string_width() {
    let font_data = require_font!();

    let mut canvas = Canvas::default();
    canvas.register_font("f", &font_data, 0).unwrap();
    canvas.set_font("f", 20.0).unwrap();
    canvas.set_compression(false);

    let width = canvas.string_width("Right", "f", 20.0).unwrap();
    assert!(width > 0.0);

    canvas.draw_right_string(300.0, 500.0, "Right").unwrap();
    canvas.draw_centred_string(300.0, 400.0, "Right").unwrap();

    let bytes = canvas.to_bytes().unwrap();
    let doc = Document::load_mem(&bytes).unwrap();
    let content = &page_contents(&doc)[0];

    let right_x = 300.0 - width;
    let centre_x = 300.0 - width / 2.0;
    let tds: Vec<f64> = content
        .lines()
        .filter(|line| line.ends_with(" Td"))
        .map(|line| line.split(' ').next().unwrap().parse().unwrap())
        .collect();

    assert_eq!(tds.len(), 2);
    assert!((tds[0] - right_x).abs() < 0.001);
    assert!((tds[1] - centre_x).abs() < 0.001);
}

#[test]
fn test_fill_color_and_info() {
    let font_data = require_font!();

    let mut canvas = Canvas::default();
    canvas.register_font("f", &font_data, 0).unwrap();
    canvas.set_info(DocumentInfo {
        title: Some("测试".to_string()),
        author: Some("zhpdf".to_string()),
        ..Default::default()
    });
    canvas.set_font("f", 12.0).unwrap();
    canvas.set_fill_color(Color::red());
    canvas.draw_string(10.0, 10.0, "red").unwrap();

    let bytes = canvas.to_bytes().unwrap();
    let doc = Document::load_mem(&bytes).unwrap();

    assert!(page_contents(&doc)[0].contains("1 0 0 rg"));

    let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = doc.get_dictionary(info_id).unwrap();
    assert!(matches!(info.get(b"Author"), Ok(Object::String(s, _)) if s == b"zhpdf"));
}

#[test]
fn test_save_to_file() {
    let font_data = require_font!();

    let path = std::env::temp_dir().join(format!("pdf-core-save-{}.pdf", std::process::id()));

    let mut canvas = Canvas::default();
    canvas.register_font("f", &font_data, 0).unwrap();
    canvas.set_font("f", 24.0).unwrap();
    canvas.draw_string(100.0, 700.0, "saved").unwrap();
    canvas.save(&path).unwrap();

    let doc = Document::load(&path).unwrap();
    assert_eq!(doc.get_pages().len(), 1);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_collection_face_is_embedded_standalone() {
    let fonts = get_standalone_fonts(2);
    if fonts.is_empty() {
        eprintln!("skipping: no standalone TrueType font found");
        return;
    }
    // Two distinct faces when available, otherwise the same face twice
    let fonts = if fonts.len() == 2 {
        fonts
    } else {
        vec![fonts[0].clone(), fonts[0].clone()]
    };

    let collection = build_collection(&fonts);
    assert_eq!(FontData::face_count(&collection).unwrap(), 2);

    let mut canvas = Canvas::new(PageSize::A4);
    canvas.register_font("wqy", &collection, 1).unwrap();
    for text in ["Page one", "Page two", "Page three"] {
        canvas.set_font("wqy", 24.0).unwrap();
        canvas.draw_string(100.0, 700.0, text).unwrap();
        canvas.show_page();
    }

    let bytes = canvas.to_bytes().unwrap();
    let doc = Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 3);

    let descriptor = doc
        .objects
        .values()
        .filter_map(|obj| obj.as_dict().ok())
        .find(|dict| dict.has(b"FontFile2"))
        .expect("font descriptor");
    let font_file_id = descriptor.get(b"FontFile2").unwrap().as_reference().unwrap();
    let font_file = doc.get_object(font_file_id).unwrap().as_stream().unwrap();

    let mut program = Vec::new();
    ZlibDecoder::new(&font_file.content[..])
        .read_to_end(&mut program)
        .unwrap();

    assert!(ttf_parser::fonts_in_collection(&program).is_none());
    assert!(ttf_parser::Face::parse(&program, 0).is_ok());

    let type0 = dicts_with_subtype(&doc, "Type0")[0];
    let base_font = type0.get(b"BaseFont").unwrap().as_name_str().unwrap();
    let expected = format!("+{}", postscript_name(&collection, 1));
    assert!(base_font.ends_with(&expected), "{base_font} does not name face 1");
}

#[test]
fn test_add_chars_reserves_cids() {
    let font_data = require_font!();

    let mut font = FontData::from_bytes("f", &font_data, 0).unwrap();
    assert_eq!(font.glyph_count(), 1);

    font.add_chars("AB");
    assert_eq!(font.glyph_count(), 3);

    // Already reserved characters keep their CIDs
    assert_eq!(font.encode_text_hex("BA"), "<00020001>");
    assert_eq!(font.glyph_count(), 3);
}
