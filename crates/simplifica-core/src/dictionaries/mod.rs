//! Dictionaries for text analysis.
//!
//! Curated Portuguese word sets used by sentence segmentation.

pub mod abbreviations;
