//! CSV output
//!
//! Writes the per-post and per-creator tables of a run. Both files get a
//! header row; parent directories are created as needed.

use crate::error::{Result, ScanError};
use crate::pipeline::{CreatorRecord, PostRecord};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct PostRow<'a> {
    creator_handle: &'a str,
    post_url: &'a str,
    total_comments: usize,
    text_percentage: f64,
    emoji_percentage: f64,
    mixed_percentage: f64,
    unique_commenters_ratio: f64,
    #[serde(rename = "EQS")]
    eqs: f64,
    pass: &'static str,
}

impl<'a> From<&'a PostRecord> for PostRow<'a> {
    fn from(record: &'a PostRecord) -> Self {
        let m = &record.metrics;
        Self {
            creator_handle: record.creator_handle.as_str(),
            post_url: record.post_url.as_str(),
            total_comments: m.total_comments,
            text_percentage: m.text_percentage,
            emoji_percentage: m.emoji_percentage,
            mixed_percentage: m.mixed_percentage,
            unique_commenters_ratio: m.unique_commenters_ratio,
            eqs: m.eqs,
            pass: m.pass_label(),
        }
    }
}

#[derive(Serialize)]
struct CreatorRow<'a> {
    creator_handle: &'a str,
    posts_analyzed: usize,
    posts_passed: usize,
    avg_text_percentage: f64,
    avg_emoji_percentage: f64,
    avg_mixed_percentage: f64,
    #[serde(rename = "avg_EQS")]
    avg_eqs: f64,
    #[serde(rename = "best_EQS")]
    best_eqs: f64,
    #[serde(rename = "worst_EQS")]
    worst_eqs: f64,
}

impl<'a> From<&'a CreatorRecord> for CreatorRow<'a> {
    fn from(record: &'a CreatorRecord) -> Self {
        let s = &record.summary;
        Self {
            creator_handle: record.creator_handle.as_str(),
            posts_analyzed: s.posts_analyzed,
            posts_passed: s.posts_passed,
            avg_text_percentage: s.avg_text_percentage,
            avg_emoji_percentage: s.avg_emoji_percentage,
            avg_mixed_percentage: s.avg_mixed_percentage,
            avg_eqs: s.avg_eqs,
            best_eqs: s.best_eqs,
            worst_eqs: s.worst_eqs,
        }
    }
}

/// Column headers of the posts table
pub const POST_HEADERS: &[&str] = &[
    "creator_handle",
    "post_url",
    "total_comments",
    "text_percentage",
    "emoji_percentage",
    "mixed_percentage",
    "unique_commenters_ratio",
    "EQS",
    "pass",
];

/// Column headers of the creators table
pub const CREATOR_HEADERS: &[&str] = &[
    "creator_handle",
    "posts_analyzed",
    "posts_passed",
    "avg_text_percentage",
    "avg_emoji_percentage",
    "avg_mixed_percentage",
    "avg_EQS",
    "best_EQS",
    "worst_EQS",
];

/// Write the posts table
pub fn write_posts(path: &Path, posts: &[PostRecord]) -> Result<()> {
    write_table(path, POST_HEADERS, posts.iter().map(PostRow::from))?;
    tracing::info!("Saved {} post rows to {}", posts.len(), path.display());
    Ok(())
}

/// Write the creators table
pub fn write_creators(path: &Path, creators: &[CreatorRecord]) -> Result<()> {
    write_table(path, CREATOR_HEADERS, creators.iter().map(CreatorRow::from))?;
    tracing::info!(
        "Saved {} creator rows to {}",
        creators.len(),
        path.display()
    );
    Ok(())
}

fn write_table<R, I>(path: &Path, headers: &[&str], rows: I) -> Result<()>
where
    R: Serialize,
    I: IntoIterator<Item = R>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ScanError::Io {
            source: e,
            context: format!("Failed to create output directory: {}", parent.display()),
        })?;
    }

    let csv_error = |e: csv::Error| ScanError::Csv {
        source: e,
        context: format!("Failed to write {}", path.display()),
    };

    // Headers are written explicitly so an empty table still has them
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_error)?;
    writer.write_record(headers).map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush().map_err(|e| ScanError::Io {
        source: e,
        context: format!("Failed to flush {}", path.display()),
    })?;
    Ok(())
}

/// Output file locations for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub posts_csv: PathBuf,
    pub creators_csv: PathBuf,
}

impl OutputPaths {
    /// Keep the configured file names but place them under `dir`
    pub fn in_dir(&self, dir: &Path) -> Self {
        let relocate = |path: &Path, fallback: &str| {
            dir.join(path.file_name().map(PathBuf::from).unwrap_or_else(|| fallback.into()))
        };
        Self {
            posts_csv: relocate(&self.posts_csv, "posts.csv"),
            creators_csv: relocate(&self.creators_csv, "creators.csv"),
        }
    }

    /// Write both tables
    pub fn write(&self, posts: &[PostRecord], creators: &[CreatorRecord]) -> Result<()> {
        write_posts(&self.posts_csv, posts)?;
        write_creators(&self.creators_csv, creators)
    }
}
