//! Job JSON schema types

use font_fetch::WQY_MICROHEI_URL;
use pdf_core::PageSize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Output file name used when neither the command line nor the job names one
pub const DEFAULT_OUTPUT: &str = "zh_multi.pdf";

/// RGB Color for text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Color {
    /// Red component (0.0 - 1.0)
    pub r: f32,
    /// Green component (0.0 - 1.0)
    pub g: f32,
    /// Blue component (0.0 - 1.0)
    pub b: f32,
}

impl Color {
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

impl From<Color> for pdf_core::Color {
    fn from(color: Color) -> Self {
        pdf_core::Color::rgb(color.r, color.g, color.b)
    }
}

/// Root job structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Schema version
    #[serde(default = "default_version")]
    pub version: String,

    /// Output PDF path
    ///
    /// Relative paths resolve against the working directory, like a path
    /// given on the command line, not against the job's base directory.
    #[serde(default)]
    pub output: Option<String>,

    /// Default page size for every page
    #[serde(rename = "pageSize")]
    #[serde(default)]
    pub page_size: PageSizeDef,

    /// Document metadata
    #[serde(default)]
    pub info: Info,

    /// Compress page content streams
    #[serde(default = "default_true")]
    pub compress: bool,

    /// Font definitions
    #[serde(default)]
    pub fonts: Vec<FontDef>,

    /// Pages, in order
    #[serde(default)]
    pub pages: Vec<Page>,

    /// Directory that relative font paths are resolved against
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Job {
    /// Three A4 pages, each with one line of Chinese text drawn at (100, 700)
    /// in WenQuanYi Micro Hei 24pt, written to `zh_multi.pdf`
    fn default() -> Self {
        let pages = ["测试第一页", "测试第二页", "测试第三页"]
            .into_iter()
            .map(|text| Page {
                page_size: None,
                items: vec![TextItem {
                    text: text.to_string(),
                    position: Position { x: 100.0, y: 700.0 },
                    font: FontSpec {
                        family: "wqy".to_string(),
                        size: 24.0,
                    },
                    align: Align::Left,
                    color: None,
                }],
            })
            .collect();

        Self {
            version: default_version(),
            output: Some(DEFAULT_OUTPUT.to_string()),
            page_size: PageSizeDef::default(),
            info: Info::default(),
            compress: true,
            fonts: vec![FontDef {
                id: "wqy".to_string(),
                path: "wqy-microhei.ttc".to_string(),
                url: Some(WQY_MICROHEI_URL.to_string()),
                index: 0,
            }],
            pages,
            base_dir: None,
        }
    }
}

impl Job {
    /// Set the directory relative font paths are resolved against
    pub fn with_base_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Resolve a path from the job against the base directory
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Look up a font definition by id
    pub fn font(&self, id: &str) -> Option<&FontDef> {
        self.fonts.iter().find(|f| f.id == id)
    }

    /// Output path from the job, or the default file name
    ///
    /// Unlike font paths this is not joined with the base directory.
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(self.output.as_deref().unwrap_or(DEFAULT_OUTPUT))
    }
}

/// Page size: a paper name (`a4`, `a5`, `letter`) or explicit dimensions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PageSizeDef {
    Named(String),
    Custom { width: f64, height: f64 },
}

impl Default for PageSizeDef {
    fn default() -> Self {
        PageSizeDef::Named("a4".to_string())
    }
}

impl PageSizeDef {
    /// Resolve to concrete dimensions
    pub fn to_page_size(&self) -> Option<PageSize> {
        match self {
            PageSizeDef::Named(name) => PageSize::from_name(name),
            PageSizeDef::Custom { width, height } => PageSize::new(*width, *height).ok(),
        }
    }
}

/// Document metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Info {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
}

impl From<&Info> for pdf_core::DocumentInfo {
    fn from(info: &Info) -> Self {
        pdf_core::DocumentInfo {
            title: info.title.clone(),
            author: info.author.clone(),
            subject: info.subject.clone(),
            creator: info.creator.clone(),
            producer: None,
        }
    }
}

/// Font definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FontDef {
    /// Font identifier (used by text items)
    pub id: String,

    /// Local font file; also where a download is stored
    pub path: String,

    /// Where to download the font from when `path` does not exist
    #[serde(default)]
    pub url: Option<String>,

    /// Face index inside a `.ttc` collection
    #[serde(default)]
    pub index: u32,
}

/// A single page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    /// Overrides the job page size for this page
    #[serde(rename = "pageSize")]
    #[serde(default)]
    pub page_size: Option<PageSizeDef>,

    /// Text drawn on the page
    #[serde(default)]
    pub items: Vec<TextItem>,
}

/// Position in PDF coordinates (origin bottom-left)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    /// X coordinate in points
    pub x: f64,

    /// Baseline Y coordinate in points (from bottom)
    pub y: f64,
}

/// Font specification for a text item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FontSpec {
    /// Font id from `fonts`
    pub family: String,

    /// Font size in points
    #[serde(default = "default_font_size")]
    pub size: f32,
}

fn default_font_size() -> f32 {
    12.0
}

/// Text alignment
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    #[serde(alias = "centre")]
    Center,
    Right,
}

impl From<Align> for pdf_core::Align {
    fn from(align: Align) -> Self {
        match align {
            Align::Left => pdf_core::Align::Left,
            Align::Center => pdf_core::Align::Center,
            Align::Right => pdf_core::Align::Right,
        }
    }
}

/// One line of text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextItem {
    /// Text to draw
    pub text: String,

    /// Anchor position
    pub position: Position,

    /// Font specification
    pub font: FontSpec,

    /// Which point of the text sits at `position.x`
    #[serde(default)]
    pub align: Align,

    /// Fill color, black when unset
    #[serde(default)]
    pub color: Option<Color>,
}
