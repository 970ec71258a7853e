//! Font handling for PDF documents
//!
//! Fonts are embedded as Type0 / CIDFontType2 with Identity-H encoding.
//! Glyphs get a CID the first time they are drawn, and the CIDs are dense
//! (0 is always `.notdef`), which is exactly the glyph order of the subset
//! produced at save time.

use crate::{PdfError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::{debug, warn};
use lopdf::{Dictionary, Object, Stream};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashSet};
use std::hash::{Hash, Hasher};
use std::io::Write;
use subsetter::GlyphRemapper;
use ttf_parser::{Face, GlyphId};

/// PDF glyph space is always 1000 units per em for CID fonts
const PDF_UNITS_PER_EM: f32 = 1000.0;
const SUBSET_TAG_LEN: usize = 6;

/// Font data structure for embedded fonts
#[derive(Debug, Clone)]
pub struct FontData {
    /// Font name/identifier
    pub name: String,
    /// Raw font file bytes (a single TrueType font or a whole collection)
    pub ttf_data: Vec<u8>,
    /// Face index inside a collection (0 for plain TTF files)
    pub index: u32,
    /// Glyphs referenced so far and their CIDs
    cids: CidMap,
    /// Subsetted font program, filled by `create_subset`
    subset: Option<Vec<u8>>,
}

/// CID assignment for the glyphs of one font
#[derive(Debug, Clone)]
struct CidMap {
    /// Original GID -> CID assignment
    remapper: GlyphRemapper,
    /// Original GID for each CID, indexed by CID
    glyphs: Vec<u16>,
    /// Character each CID stands for (ToUnicode)
    cid_to_unicode: BTreeMap<u16, char>,
    /// Characters already reported as missing
    missing_chars: HashSet<char>,
}

impl CidMap {
    fn new() -> Self {
        Self {
            remapper: GlyphRemapper::new(),
            glyphs: vec![0],
            cid_to_unicode: BTreeMap::new(),
            missing_chars: HashSet::new(),
        }
    }

    /// CID for a character, assigning the next free one on first use
    fn cid_for(&mut self, face: Option<&Face<'_>>, font_name: &str, c: char) -> u16 {
        let gid = match face.and_then(|f| f.glyph_index(c)) {
            Some(gid) => gid.0,
            None => {
                if self.missing_chars.insert(c) {
                    warn!("font '{}' has no glyph for {:?} (U+{:04X})", font_name, c, c as u32);
                }
                0
            }
        };

        let cid = self.remapper.remap(gid);
        if cid as usize == self.glyphs.len() {
            self.glyphs.push(gid);
        }
        if cid != 0 {
            self.cid_to_unicode.entry(cid).or_insert(c);
        }
        cid
    }
}

/// PDF objects generated for font embedding
pub struct FontObjects {
    /// Type0 font dictionary
    pub type0_font: Dictionary,
    /// CIDFont Type2 dictionary
    pub cid_font: Dictionary,
    /// Font descriptor dictionary
    pub font_descriptor: Dictionary,
    /// Font file stream (TrueType data)
    pub font_file_stream: Stream,
    /// ToUnicode CMap stream
    pub tounicode_stream: Stream,
}

impl FontData {
    /// Create font data from TrueType or TrueType Collection bytes
    ///
    /// # Arguments
    /// * `name` - Font identifier
    /// * `data` - Font file bytes
    /// * `index` - Face index inside a collection, 0 for a plain TTF
    pub fn from_bytes(name: &str, data: &[u8], index: u32) -> Result<Self> {
        let faces = Self::face_count(data)?;
        if index >= faces {
            return Err(PdfError::FontParseError(format!(
                "face index {index} out of range, font has {faces} face(s)"
            )));
        }

        let face =
            Face::parse(data, index).map_err(|e| PdfError::FontParseError(format!("{e:?}")))?;

        // Embedded as FontFile2, which only carries glyf outlines
        if face.tables().glyf.is_none() {
            return Err(PdfError::FontParseError(
                "only TrueType (glyf) outlines are supported".to_string(),
            ));
        }

        Ok(Self::with_data(name, data.to_vec(), index))
    }

    /// Number of faces in a font file
    pub fn face_count(data: &[u8]) -> Result<u32> {
        if let Some(count) = ttf_parser::fonts_in_collection(data) {
            return Ok(count);
        }

        Face::parse(data, 0)
            .map(|_| 1)
            .map_err(|e| PdfError::FontParseError(format!("{e:?}")))
    }

    fn with_data(name: &str, ttf_data: Vec<u8>, index: u32) -> Self {
        Self {
            name: name.to_string(),
            ttf_data,
            index,
            cids: CidMap::new(),
            subset: None,
        }
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.ttf_data, self.index).ok()
    }

    /// Reserve CIDs for characters so they are embedded even if never drawn
    pub fn add_chars(&mut self, text: &str) {
        let face = Face::parse(&self.ttf_data, self.index).ok();
        for c in text.chars() {
            self.cids.cid_for(face.as_ref(), &self.name, c);
        }
    }

    /// Get glyph ID for a character
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.face().and_then(|face| face.glyph_index(c).map(|id| id.0))
    }

    /// Check if font has a glyph for the given character
    pub fn has_glyph(&self, c: char) -> bool {
        self.glyph_id(c).map(|id| id != 0).unwrap_or(false)
    }

    /// Get glyph advance width in font units
    pub fn glyph_advance(&self, c: char) -> Option<u16> {
        let face = self.face()?;
        let glyph_id = face.glyph_index(c)?;
        face.glyph_hor_advance(glyph_id)
    }

    /// Get font units per em
    pub fn units_per_em(&self) -> u16 {
        self.face().map(|face| face.units_per_em()).unwrap_or(1000)
    }

    /// Get font ascender
    pub fn ascender(&self) -> i16 {
        self.face().map(|face| face.ascender()).unwrap_or(800)
    }

    /// Get font descender
    pub fn descender(&self) -> i16 {
        self.face().map(|face| face.descender()).unwrap_or(-200)
    }

    /// Calculate text width in font units
    ///
    /// Missing characters count with the `.notdef` advance, as they are drawn.
    pub fn text_width(&self, text: &str) -> u32 {
        let Some(face) = self.face() else {
            return 0;
        };

        text.chars()
            .map(|c| face.glyph_index(c).unwrap_or(GlyphId(0)))
            .filter_map(|gid| face.glyph_hor_advance(gid))
            .map(u32::from)
            .sum()
    }

    /// Calculate text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f32 {
        let width = self.text_width(text);
        let units_per_em = self.units_per_em() as f32;
        (width as f32 / units_per_em) * font_size
    }

    /// Encode text as a hex string of CIDs for the PDF Tj operator
    ///
    /// Glyphs seen for the first time are assigned the next free CID.
    /// Characters the font cannot render map to CID 0 (`.notdef`).
    pub fn encode_text_hex(&mut self, text: &str) -> String {
        // Parse from the field directly so the CID map stays mutable
        let face = Face::parse(&self.ttf_data, self.index).ok();
        let mut result = String::with_capacity(text.len() * 4 + 2);
        result.push('<');

        for c in text.chars() {
            let cid = self.cids.cid_for(face.as_ref(), &self.name, c);
            result.push_str(&format!("{cid:04X}"));
        }

        result.push('>');
        result
    }

    /// Number of distinct glyphs referenced so far (including `.notdef`)
    pub fn glyph_count(&self) -> usize {
        self.cids.glyphs.len()
    }

    /// Build the subsetted font program from the glyphs drawn so far
    pub fn create_subset(&mut self) -> Result<()> {
        let data = subsetter::subset(&self.ttf_data, self.index, &self.cids.remapper)
            .map_err(|e| PdfError::FontSubsetError(format!("{}: {e}", self.name)))?;

        debug!(
            "subset font '{}': {} glyph(s), {} -> {} bytes",
            self.name,
            self.cids.glyphs.len(),
            self.ttf_data.len(),
            data.len()
        );

        self.subset = Some(data);
        Ok(())
    }

    /// Generate all PDF objects needed to embed this font
    ///
    /// References between the objects are left as `0 0 R` placeholders and
    /// linked by the caller once the objects have ids.
    pub fn to_pdf_objects(&self) -> Result<FontObjects> {
        let base_font = format!("{}+{}", self.subset_tag(), self.postscript_name());
        let font_name = Object::Name(base_font.into_bytes());
        let scale = PDF_UNITS_PER_EM / self.units_per_em() as f32;

        // Generate ToUnicode CMap
        let tounicode_content = self.generate_tounicode_cmap();
        let tounicode_stream = Stream::new(
            Dictionary::from_iter(vec![("Type", "CMap".into())]),
            tounicode_content.into_bytes(),
        );

        // Generate font file stream (subset if available, whole face otherwise)
        let program = self.subset.as_deref().unwrap_or(&self.ttf_data);
        let font_file_stream = Stream::new(
            Dictionary::from_iter(vec![
                ("Length1", (program.len() as i64).into()),
                ("Filter", "FlateDecode".into()),
            ]),
            deflate(program)?,
        );

        let (bbox, cap_height) = match self.face() {
            Some(face) => {
                let rect = face.global_bounding_box();
                (
                    [rect.x_min, rect.y_min, rect.x_max, rect.y_max],
                    face.capital_height().unwrap_or(face.ascender()),
                )
            }
            None => (
                [0, self.descender(), self.units_per_em() as i16, self.ascender()],
                self.ascender(),
            ),
        };

        let to_pdf = |v: i16| Object::Integer((v as f32 * scale).round() as i64);

        let font_descriptor = Dictionary::from_iter(vec![
            ("Type", "FontDescriptor".into()),
            ("FontName", font_name.clone()),
            ("Flags", 4.into()), // Symbolic font
            ("FontBBox", bbox.iter().map(|&v| to_pdf(v)).collect::<Vec<_>>().into()),
            ("ItalicAngle", 0.into()),
            ("Ascent", to_pdf(self.ascender())),
            ("Descent", to_pdf(self.descender())),
            ("CapHeight", to_pdf(cap_height)),
            ("StemV", 80.into()),
            ("FontFile2", Object::Reference((0, 0))),
        ]);

        let cid_system_info = Dictionary::from_iter(vec![
            ("Registry", Object::string_literal("Adobe")),
            ("Ordering", Object::string_literal("Identity")),
            ("Supplement", 0.into()),
        ]);

        let cid_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "CIDFontType2".into()),
            ("BaseFont", font_name.clone()),
            ("CIDSystemInfo", cid_system_info.into()),
            ("FontDescriptor", Object::Reference((0, 0))),
            ("CIDToGIDMap", "Identity".into()),
            ("W", self.generate_widths_array().into()),
            ("DW", 1000.into()),
        ]);

        let type0_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type0".into()),
            ("BaseFont", font_name),
            ("Encoding", "Identity-H".into()),
            ("DescendantFonts", vec![Object::Reference((0, 0))].into()),
            ("ToUnicode", Object::Reference((0, 0))),
        ]);

        Ok(FontObjects {
            type0_font,
            cid_font,
            font_descriptor,
            font_file_stream,
            tounicode_stream,
        })
    }

    /// Generate /W array for glyph widths
    ///
    /// CIDs are dense, so a single `0 [w0 w1 ...]` run covers every glyph.
    fn generate_widths_array(&self) -> Vec<Object> {
        let Some(face) = self.face() else {
            return Vec::new();
        };

        let scale = PDF_UNITS_PER_EM / face.units_per_em() as f32;
        let widths: Vec<Object> = self
            .cids
            .glyphs
            .iter()
            .map(|&gid| {
                let advance = face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0);
                Object::Integer((advance as f32 * scale).round() as i64)
            })
            .collect();

        vec![0.into(), widths.into()]
    }

    /// Generate ToUnicode CMap stream content
    fn generate_tounicode_cmap(&self) -> String {
        let mut cmap = String::new();

        // Header
        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
        cmap.push_str("/CMapType 2 def\n");

        // Code space range (all 16-bit values)
        cmap.push_str("1 begincodespacerange\n");
        cmap.push_str("<0000> <FFFF>\n");
        cmap.push_str("endcodespacerange\n");

        let entries: Vec<(&u16, &char)> = self.cids.cid_to_unicode.iter().collect();

        // bfchar sections are limited to 100 entries
        for chunk in entries.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for (cid, c) in chunk {
                let mut utf16 = [0u16; 2];
                let unicode: String = c
                    .encode_utf16(&mut utf16)
                    .iter()
                    .map(|unit| format!("{unit:04X}"))
                    .collect();
                cmap.push_str(&format!("<{cid:04X}> <{unicode}>\n"));
            }
            cmap.push_str("endbfchar\n");
        }

        // Footer
        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\n");
        cmap.push_str("end\n");

        cmap
    }

    /// PostScript name from the `name` table, reduced to characters valid in a PDF name
    fn postscript_name(&self) -> String {
        let from_table = self.face().and_then(|face| {
            face.names()
                .into_iter()
                .filter(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
                .find_map(|name| name.to_string())
        });

        let raw = from_table.unwrap_or_else(|| self.name.clone());
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_graphic() && !"()<>[]{}/%#".contains(*c))
            .take(120)
            .collect();

        if cleaned.is_empty() {
            "Unnamed".to_string()
        } else {
            cleaned
        }
    }

    /// Six uppercase letters derived from the font and its glyph set
    fn subset_tag(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.name.hash(&mut hasher);
        self.index.hash(&mut hasher);
        self.cids.glyphs.hash(&mut hasher);
        let mut hash = hasher.finish();

        let mut tag = String::with_capacity(SUBSET_TAG_LEN);
        for _ in 0..SUBSET_TAG_LEN {
            tag.push((b'A' + (hash % 26) as u8) as char);
            hash /= 26;
        }
        tag
    }
}

/// Compress bytes with zlib for a FlateDecode stream
pub(crate) fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
