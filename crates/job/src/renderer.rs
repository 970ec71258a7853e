//! Job rendering

use crate::schema::*;
use crate::{JobError, Result};
use font_fetch::{FetchOptions, FontSource};
use log::{debug, info};
use pdf_core::Canvas;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Job renderer
pub struct JobRenderer<'a> {
    /// The job to render
    job: &'a Job,
    /// HTTP settings used for fonts that have to be downloaded
    fetch_options: FetchOptions,
}

impl<'a> JobRenderer<'a> {
    /// Create a new renderer for a job
    pub fn new(job: &'a Job) -> Self {
        Self {
            job,
            fetch_options: FetchOptions::default(),
        }
    }

    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.fetch_options = options;
        self
    }

    /// Fetch (if needed) and register the fonts the job draws with
    ///
    /// Declared fonts that no item uses are neither downloaded nor read.
    pub fn load_fonts(&self, canvas: &mut Canvas) -> Result<()> {
        let used: HashSet<&str> = self
            .job
            .pages
            .iter()
            .flat_map(|page| page.items.iter())
            .map(|item| item.font.family.as_str())
            .collect();

        for font_def in &self.job.fonts {
            if used.contains(font_def.id.as_str()) {
                self.load_font(canvas, font_def)?;
            } else {
                debug!("font '{}' is not used, skipping", font_def.id);
            }
        }
        Ok(())
    }

    fn load_font(&self, canvas: &mut Canvas, font_def: &FontDef) -> Result<()> {
        let mut source =
            FontSource::new(self.job.resolve_path(&font_def.path)).with_index(font_def.index);
        if let Some(url) = &font_def.url {
            source = source.with_url(url);
        }

        let data = font_fetch::load_font(&source, &self.fetch_options)?;
        canvas
            .register_font(&font_def.id, &data, font_def.index)
            .map_err(|e| {
                JobError::FontError(format!(
                    "Failed to load font '{}' from {}: {}",
                    font_def.id,
                    source.path.display(),
                    e
                ))
            })?;

        debug!("font '{}' ready ({} bytes)", font_def.id, data.len());
        Ok(())
    }

    /// Render the job to PDF bytes
    pub fn render(&self) -> Result<Vec<u8>> {
        self.job.validate()?;

        let default_size = page_size(&self.job.page_size)?;
        let mut canvas = Canvas::new(default_size);
        canvas.set_info((&self.job.info).into());
        canvas.set_compression(self.job.compress);

        self.load_fonts(&mut canvas)?;

        for page in &self.job.pages {
            let size = match &page.page_size {
                Some(def) => page_size(def)?,
                None => default_size,
            };
            canvas.set_page_size(size);

            for item in &page.items {
                render_item(&mut canvas, item)?;
            }
            canvas.show_page();
        }

        info!("rendered {} page(s)", canvas.page_count().max(1));
        Ok(canvas.to_bytes()?)
    }

    /// Render the job and write it to `path`
    pub fn render_to_file<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        let bytes = self.render()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, &bytes)?;

        info!("wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(path.to_path_buf())
    }
}

fn render_item(canvas: &mut Canvas, item: &TextItem) -> Result<()> {
    canvas.set_font(&item.font.family, item.font.size)?;
    canvas.set_fill_color(item.color.unwrap_or_default().into());
    canvas.draw_text(
        item.position.x,
        item.position.y,
        &item.text,
        item.align.into(),
    )?;
    Ok(())
}

fn page_size(def: &PageSizeDef) -> Result<pdf_core::PageSize> {
    def.to_page_size()
        .ok_or_else(|| JobError::ValidationError(format!("unsupported page size {def:?}")))
}
