//! Page-at-a-time PDF canvas

use crate::font::deflate;
use crate::info::DocumentInfo;
use crate::text::{fmt_num, generate_text_operators, TextRenderContext};
use crate::{Align, FontData, PageSize, PdfError, Result};
use log::debug;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    pub fn red() -> Self {
        Self::rgb(1.0, 0.0, 0.0)
    }

    pub fn green() -> Self {
        Self::rgb(0.0, 1.0, 0.0)
    }

    pub fn blue() -> Self {
        Self::rgb(0.0, 0.0, 1.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Per-page drawing state, reset by `show_page`
#[derive(Debug, Clone)]
struct GraphicsState {
    font: Option<String>,
    font_size: f32,
    fill_color: Color,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            font: None,
            font_size: 12.0,
            fill_color: Color::default(),
        }
    }
}

/// A page whose content has been recorded but not yet written
#[derive(Debug, Clone)]
struct PageContent {
    size: PageSize,
    /// Content stream operators
    content: Vec<u8>,
    /// Fonts drawn on this page
    fonts: BTreeSet<String>,
}

impl PageContent {
    fn new(size: PageSize) -> Self {
        Self {
            size,
            content: Vec::new(),
            fonts: BTreeSet::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// A PDF document drawn one page at a time
///
/// Coordinates are in points with the origin at the bottom-left corner of
/// the page. Fonts are registered once per document; the font, size and fill
/// color are page state and must be set again after every `show_page`.
pub struct Canvas {
    /// Registered fonts (name -> font)
    fonts: HashMap<String, FontData>,
    /// Document-wide resource names (font name -> "F1", "F2", ...)
    font_resources: HashMap<String, String>,
    /// Next font resource number
    next_font_resource: u32,
    /// Finished pages
    pages: Vec<PageContent>,
    /// Page currently being drawn
    current: PageContent,
    /// Size for the current and following pages
    page_size: PageSize,
    state: GraphicsState,
    info: DocumentInfo,
    compress: bool,
}

impl Canvas {
    /// Create an empty document
    pub fn new(page_size: PageSize) -> Self {
        Self {
            fonts: HashMap::new(),
            font_resources: HashMap::new(),
            next_font_resource: 1,
            pages: Vec::new(),
            current: PageContent::new(page_size),
            page_size,
            state: GraphicsState::default(),
            info: DocumentInfo::default(),
            compress: true,
        }
    }

    /// Register a TrueType font (or one face of a collection)
    ///
    /// # Arguments
    /// * `name` - Font identifier (used in set_font)
    /// * `data` - Font file bytes
    /// * `index` - Face index for `.ttc` collections, 0 otherwise
    pub fn register_font(&mut self, name: &str, data: &[u8], index: u32) -> Result<()> {
        if self.fonts.contains_key(name) {
            return Err(PdfError::FontAlreadyExists(name.to_string()));
        }

        let font = FontData::from_bytes(name, data, index)?;
        debug!(
            "registered font '{}' (face {}, {} units/em)",
            name,
            index,
            font.units_per_em()
        );
        self.fonts.insert(name.to_string(), font);

        Ok(())
    }

    /// Whether a font with this name has been registered
    pub fn has_font(&self, name: &str) -> bool {
        self.fonts.contains_key(name)
    }

    /// Select the font and size for subsequent drawing on the current page
    pub fn set_font(&mut self, name: &str, size: f32) -> Result<()> {
        if !self.fonts.contains_key(name) {
            return Err(PdfError::FontNotFound(name.to_string()));
        }
        if !(size > 0.0) || !size.is_finite() {
            return Err(PdfError::InvalidFontSize(size));
        }

        self.state.font = Some(name.to_string());
        self.state.font_size = size;
        Ok(())
    }

    /// Set the fill color used for text
    pub fn set_fill_color(&mut self, color: Color) {
        self.state.fill_color = color;
    }

    /// Set the page size for the current page and the pages after it
    pub fn set_page_size(&mut self, size: PageSize) {
        self.page_size = size;
        self.current.size = size;
    }

    /// Current page size
    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Set the document metadata
    pub fn set_info(&mut self, info: DocumentInfo) {
        self.info = info;
    }

    /// Enable or disable FlateDecode compression of page content streams
    pub fn set_compression(&mut self, compress: bool) {
        self.compress = compress;
    }

    /// Draw a string with its left edge at `x`
    pub fn draw_string(&mut self, x: f64, y: f64, text: &str) -> Result<()> {
        self.draw_text(x, y, text, Align::Left)
    }

    /// Draw a string with its right edge at `x`
    pub fn draw_right_string(&mut self, x: f64, y: f64, text: &str) -> Result<()> {
        self.draw_text(x, y, text, Align::Right)
    }

    /// Draw a string centred on `x`
    pub fn draw_centred_string(&mut self, x: f64, y: f64, text: &str) -> Result<()> {
        self.draw_text(x, y, text, Align::Center)
    }

    /// Draw a single line of text with its baseline at `y`
    ///
    /// # Arguments
    /// * `x` - X coordinate in points (from left)
    /// * `y` - Y coordinate in points (from bottom)
    /// * `text` - Text to draw; empty text is a no-op
    /// * `align` - Which point of the string sits at `x`
    pub fn draw_text(&mut self, x: f64, y: f64, text: &str, align: Align) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        let font_name = self
            .state
            .font
            .clone()
            .ok_or(PdfError::NoFontSelected(self.pages.len() + 1))?;
        let resource_name = self.font_resource(&font_name);
        let font_size = self.state.font_size;

        let font = self
            .fonts
            .get_mut(&font_name)
            .ok_or_else(|| PdfError::FontNotFound(font_name.clone()))?;
        let text_width = font.text_width_points(text, font_size) as f64;
        let text_hex = font.encode_text_hex(text);

        let ctx = TextRenderContext {
            font_name: resource_name,
            font_size,
            text_width,
            color: self.state.fill_color,
        };
        let operators = generate_text_operators(&text_hex, x, y, align, &ctx);

        self.current.content.extend_from_slice(&operators);
        self.current.fonts.insert(font_name);

        Ok(())
    }

    /// Width of `text` in points for a registered font and size
    pub fn string_width(&self, text: &str, font: &str, size: f32) -> Result<f64> {
        let font_data = self
            .fonts
            .get(font)
            .ok_or_else(|| PdfError::FontNotFound(font.to_string()))?;

        Ok(font_data.text_width_points(text, size) as f64)
    }

    /// Finish the current page and start a new one
    ///
    /// The new page starts with a fresh graphics state (no font selected).
    pub fn show_page(&mut self) {
        let finished = std::mem::replace(&mut self.current, PageContent::new(self.page_size));
        debug!(
            "finished page {} ({} content bytes)",
            self.pages.len() + 1,
            finished.content.len()
        );
        self.pages.push(finished);
        self.state = GraphicsState::default();
    }

    /// Number of pages the saved document will have
    ///
    /// Counts finished pages, plus the current page when something has been
    /// drawn on it.
    pub fn page_count(&self) -> usize {
        self.pages.len() + usize::from(!self.current.is_empty())
    }

    /// Save the document to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Save the document to bytes
    ///
    /// A current page with content is finished first. A document without any
    /// page gets a single blank one.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        if !self.current.is_empty() {
            self.show_page();
        }
        if self.pages.is_empty() {
            self.pages.push(PageContent::new(self.page_size));
        }

        let mut doc = self.build_document()?;

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Get or assign the resource name for a font
    fn font_resource(&mut self, font_name: &str) -> String {
        if let Some(resource_name) = self.font_resources.get(font_name) {
            return resource_name.clone();
        }

        let resource_name = format!("F{}", self.next_font_resource);
        self.next_font_resource += 1;
        self.font_resources
            .insert(font_name.to_string(), resource_name.clone());

        resource_name
    }

    /// Assemble the lopdf object graph for all finished pages
    fn build_document(&mut self) -> Result<Document> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        // 1. Subset and embed every font that was drawn with
        let mut used_fonts: Vec<String> = self
            .pages
            .iter()
            .flat_map(|page| page.fonts.iter().cloned())
            .collect();
        used_fonts.sort();
        used_fonts.dedup();

        let mut embedded_fonts: HashMap<String, ObjectId> = HashMap::new();
        for font_name in used_fonts {
            let font_id = self.embed_font_object(&mut doc, &font_name)?;
            embedded_fonts.insert(font_name, font_id);
        }

        // 2. Write pages
        let mut kids = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let mut font_dict = Dictionary::new();
            for font_name in &page.fonts {
                let font_id = embedded_fonts
                    .get(font_name)
                    .ok_or_else(|| PdfError::FontNotFound(font_name.clone()))?;
                let resource_name = self
                    .font_resources
                    .get(font_name)
                    .ok_or_else(|| PdfError::FontNotFound(font_name.clone()))?;
                font_dict.set(resource_name.as_bytes(), Object::Reference(*font_id));
            }

            let contents_id = doc.add_object(self.content_stream(&page.content)?);

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    0.into(),
                    0.into(),
                    Object::Real(page.size.width as f32),
                    Object::Real(page.size.height as f32),
                ],
                "Resources" => dictionary! {
                    "Font" => font_dict,
                },
                "Contents" => contents_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let page_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
            }),
        );

        // 3. Catalog and metadata
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(self.info.to_dictionary(chrono::Local::now()));

        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        debug!(
            "built document: {} page(s), {} font(s), {} objects",
            self.pages.len(),
            embedded_fonts.len(),
            doc.objects.len()
        );

        Ok(doc)
    }

    /// Subset a font and add its objects to the document
    fn embed_font_object(&mut self, doc: &mut Document, font_name: &str) -> Result<ObjectId> {
        let font_data = self
            .fonts
            .get_mut(font_name)
            .ok_or_else(|| PdfError::FontNotFound(font_name.to_string()))?;
        font_data.create_subset()?;

        // Generate all PDF objects for the font
        let font_objects = font_data.to_pdf_objects()?;

        // Add font file stream
        let font_file_id = doc.add_object(font_objects.font_file_stream);

        // Update font descriptor with font file reference
        let mut font_descriptor = font_objects.font_descriptor;
        font_descriptor.set("FontFile2", Object::Reference(font_file_id));
        let font_descriptor_id = doc.add_object(font_descriptor);

        // Update CIDFont with font descriptor reference
        let mut cid_font = font_objects.cid_font;
        cid_font.set("FontDescriptor", Object::Reference(font_descriptor_id));
        let cid_font_id = doc.add_object(cid_font);

        // Update Type0 font with CIDFont and ToUnicode references
        let mut type0_font = font_objects.type0_font;
        type0_font.set(
            "DescendantFonts",
            Object::Array(vec![Object::Reference(cid_font_id)]),
        );

        let tounicode_id = doc.add_object(font_objects.tounicode_stream);
        type0_font.set("ToUnicode", Object::Reference(tounicode_id));

        Ok(doc.add_object(type0_font))
    }

    /// Wrap page operators in a (possibly compressed) content stream
    fn content_stream(&self, content: &[u8]) -> Result<Stream> {
        if self.compress && !content.is_empty() {
            Ok(Stream::new(
                dictionary! { "Filter" => "FlateDecode" },
                deflate(content)?,
            ))
        } else {
            Ok(Stream::new(Dictionary::new(), content.to_vec()))
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(PageSize::default())
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("fonts", &self.fonts.keys().collect::<Vec<_>>())
            .field("pages", &self.pages.len())
            .field(
                "page_size",
                &format_args!(
                    "{} x {}",
                    fmt_num(self.page_size.width),
                    fmt_num(self.page_size.height)
                ),
            )
            .finish()
    }
}
