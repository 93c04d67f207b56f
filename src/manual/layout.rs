//! Two-column presentation of parsed sections.
//!
//! The first section is the guide's introduction and never shows an
//! illustration, even when the parser found an image in it. Every other
//! section shows its own inline image and nothing else.

use serde::Serialize;

use super::Section;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Illustration {
    pub alt_text: String,
    pub source_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRow {
    pub section: Section,
    pub illustration: Option<Illustration>,
}

pub fn layout(sections: &[Section]) -> Vec<SectionRow> {
    sections
        .iter()
        .enumerate()
        .map(|(index, section)| {
            let illustration = match &section.image {
                Some(image) if index > 0 => Some(Illustration {
                    alt_text: image.alt_text.clone(),
                    source_ref: image.source_ref.clone(),
                }),
                _ => None,
            };
            SectionRow {
                section: section.clone(),
                illustration,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manual::parse;

    #[test]
    fn first_row_never_illustrated() {
        let sections = parse("Intro\n![cover](cover.png)\n## Step\nDo\n![s](s.png)");
        let rows = layout(&sections);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].illustration, None);
        // The parser output itself is untouched.
        assert!(rows[0].section.image.is_some());
        assert_eq!(rows[1].illustration.as_ref().unwrap().source_ref, "s.png");
    }

    #[test]
    fn sections_without_image_line_stay_unillustrated() {
        let sections = parse("Intro\n## One\na\n![one](a.png)\n## Two\nb\n## Three\nc\n![three](b.png)");
        let shown: Vec<_> = layout(&sections)
            .into_iter()
            .map(|row| row.illustration.map(|i| i.source_ref))
            .collect();

        assert_eq!(
            shown,
            vec![None, Some("a.png".to_string()), None, Some("b.png".to_string())]
        );
    }

    #[test]
    fn illustration_keeps_alt_text() {
        let rows = layout(&parse("Intro\n## Step\n![Tighten the bolt](bolt.png)"));
        assert_eq!(
            rows[1].illustration,
            Some(Illustration {
                alt_text: "Tighten the bolt".into(),
                source_ref: "bolt.png".into(),
            })
        );
    }

    #[test]
    fn empty_sections_give_empty_layout() {
        assert!(layout(&[]).is_empty());
    }
}
