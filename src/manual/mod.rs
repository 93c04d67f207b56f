//! Generated manual documents
//!
//! The generator returns one flat markdown document. [`parse`] splits it into
//! titled sections, each with at most one illustration, and [`layout`] pairs
//! those sections with their illustration cell for the two-column result view.

mod layout;
mod parser;

pub use layout::{layout, Illustration, SectionRow};
pub use parser::parse;

use serde::Serialize;

/// Inline image taken from a `![alt](src)` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionImage {
    pub alt_text: String,
    pub source_ref: String,
}

/// One titled block of the guide.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Empty for text that appears before the first heading.
    pub title: String,
    pub body_lines: Vec<String>,
    pub image: Option<SectionImage>,
}

impl Section {
    fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    fn has_content(&self) -> bool {
        !self.title.is_empty() || !self.body_lines.is_empty()
    }

    /// Body joined back into markdown for the render collaborator.
    pub fn body_markdown(&self) -> String {
        self.body_lines.join("\n")
    }
}
