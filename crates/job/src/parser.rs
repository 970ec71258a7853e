//! Job JSON parsing and validation

use crate::{Job, JobError, PageSizeDef, Result};
use std::collections::HashSet;
use std::path::Path;

/// Parse a job from JSON string
pub fn parse_job(json: &str) -> Result<Job> {
    serde_json::from_str(json).map_err(|e| JobError::ParseError(e.to_string()))
}

impl Job {
    /// Read, parse and validate a job file
    ///
    /// Relative font paths in the job resolve against the file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Job> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let job = parse_job(&json)?;

        let job = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => job.with_base_dir(dir),
            _ => job,
        };
        job.validate()?;

        Ok(job)
    }

    /// Check references and values that the JSON shape alone cannot express
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for font in &self.fonts {
            if font.id.is_empty() {
                return Err(invalid("font id must not be empty"));
            }
            if !ids.insert(font.id.as_str()) {
                return Err(invalid(format!("duplicate font id '{}'", font.id)));
            }
            if font.path.is_empty() {
                return Err(invalid(format!("font '{}' has an empty path", font.id)));
            }
        }

        check_page_size(&self.page_size, "job")?;

        for (page_no, page) in self.pages.iter().enumerate().map(|(i, p)| (i + 1, p)) {
            if let Some(size) = &page.page_size {
                check_page_size(size, &format!("page {page_no}"))?;
            }

            for item in &page.items {
                if !ids.contains(item.font.family.as_str()) {
                    return Err(invalid(format!(
                        "page {}: unknown font family '{}'",
                        page_no, item.font.family
                    )));
                }
                if !(item.font.size > 0.0) || !item.font.size.is_finite() {
                    return Err(invalid(format!(
                        "page {}: font size must be positive, got {}",
                        page_no, item.font.size
                    )));
                }
            }
        }

        Ok(())
    }
}

fn check_page_size(size: &PageSizeDef, what: &str) -> Result<()> {
    match size.to_page_size() {
        Some(_) => Ok(()),
        None => Err(invalid(format!("{what}: unsupported page size {size:?}"))),
    }
}

fn invalid(message: impl Into<String>) -> JobError {
    JobError::ValidationError(message.into())
}
