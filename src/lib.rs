//! creatorscan - comment-quality creator discovery
//!
//! Classifies a post's comments as text, emoji or mixed, scores the post's
//! engagement quality, and runs a two-phase pipeline that first triages posts
//! found for a keyword and then analyzes the creators behind the posts that
//! pass.

pub mod classifier;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod runs;
pub mod source;

pub use error::{Result, ScanError};
