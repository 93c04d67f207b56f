//! Section parser for illustrated manuals.
//!
//! Scans line by line:
//! - `## Heading` closes the current section and opens a new one
//! - `![alt](src)` on its own line sets the current section's image (last wins)
//! - any other non-blank line is body text; blank lines are dropped

use regex::Regex;
use std::sync::LazyLock;

use super::{Section, SectionImage};

/// Level-2 heading: up to three spaces of indent, exactly two hashes,
/// whitespace, then the title. Four spaces make it an indented code line.
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}##[ \t]+(\S.*)$").unwrap());

/// A whole-line markdown image, with an optional quoted title after the source.
static IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^!\[([^\]]*)\]\(\s*<?([^)\s>]*)>?(?:\s+"[^"]*")?\s*\)$"#).unwrap()
});

/// Split a generated document into sections.
///
/// Pure and deterministic: the same input always yields the same output.
///
/// # Examples
///
/// ```
/// use manual_studio::manual::parse;
///
/// let sections = parse("Intro line\n## Next\nBody");
/// assert_eq!(sections.len(), 2);
/// assert_eq!(sections[0].title, "");
/// assert_eq!(sections[0].body_lines, vec!["Intro line"]);
/// assert_eq!(sections[1].title, "Next");
/// ```
pub fn parse(document: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section::default();

    for raw in document.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = HEADING.captures(raw.trim_end()) {
            let finished = std::mem::replace(&mut current, Section::titled(caps[1].trim()));
            if finished.has_content() {
                sections.push(finished);
            }
        } else if let Some(caps) = IMAGE.captures(line) {
            current.image = Some(SectionImage {
                alt_text: caps[1].to_string(),
                source_ref: caps[2].to_string(),
            });
        } else {
            current.body_lines.push(raw.trim_end().to_string());
        }
    }

    if current.has_content() {
        sections.push(current);
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(alt: &str, src: &str) -> Option<SectionImage> {
        Some(SectionImage {
            alt_text: alt.to_string(),
            source_ref: src.to_string(),
        })
    }

    #[test]
    fn empty_document() {
        assert!(parse("").is_empty());
        assert!(parse("\n   \n\t\n").is_empty());
    }

    #[test]
    fn headings_with_image() {
        let sections = parse("## Step One\nDo X\n![a](img1.png)\n## Step Two\nDo Y");
        assert_eq!(
            sections,
            vec![
                Section {
                    title: "Step One".into(),
                    body_lines: vec!["Do X".into()],
                    image: image("a", "img1.png"),
                },
                Section {
                    title: "Step Two".into(),
                    body_lines: vec!["Do Y".into()],
                    image: None,
                },
            ]
        );
    }

    #[test]
    fn preamble_without_heading() {
        let sections = parse("Intro line\n## Next\nBody");
        assert_eq!(sections[0].title, "");
        assert_eq!(sections[0].body_lines, vec!["Intro line"]);
        assert_eq!(sections[0].image, None);
        assert_eq!(sections[1].title, "Next");
        assert_eq!(sections[1].body_lines, vec!["Body"]);
    }

    #[test]
    fn no_headings_is_one_untitled_section() {
        let doc = "first line\n\nsecond line\n   \n- a bullet\n";
        let sections = parse(doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "");
        assert_eq!(
            sections[0].body_lines,
            vec!["first line", "second line", "- a bullet"]
        );
    }

    #[test]
    fn consecutive_headings_keep_empty_section() {
        let sections = parse("## One\n## Two\ntext");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "One");
        assert!(sections[0].body_lines.is_empty());
        assert_eq!(sections[1].body_lines, vec!["text"]);
    }

    #[test]
    fn last_image_wins_and_is_not_body() {
        let sections = parse("## Step\n![first](a.png)\ntext\n![second](b.png)");
        assert_eq!(sections[0].image, image("second", "b.png"));
        assert_eq!(sections[0].body_lines, vec!["text"]);
    }

    #[test]
    fn first_section_still_gets_its_image() {
        let sections = parse("Intro\n![cover](cover.png)\n## Step\nDo it");
        assert_eq!(sections[0].image, image("cover", "cover.png"));
    }

    #[test]
    fn image_only_preamble_is_dropped() {
        let sections = parse("![orphan](o.png)\n## Step\nDo it");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Step");
        assert_eq!(sections[0].image, None);
    }

    #[test]
    fn other_heading_levels_are_body() {
        let sections = parse("# Title\n### Detail\n##NoSpace\n## Real");
        assert_eq!(sections[0].body_lines, vec!["# Title", "### Detail", "##NoSpace"]);
        assert_eq!(sections[1].title, "Real");
    }

    #[test]
    fn heading_text_is_trimmed() {
        let sections = parse("  ##   Spaced out   ");
        assert_eq!(sections[0].title, "Spaced out");
    }

    #[test]
    fn deeply_indented_heading_is_body() {
        let sections = parse("## Setup\n    ## not a heading\n   ## Three spaces\n\t## tabbed");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Setup");
        assert_eq!(sections[0].body_lines, vec!["    ## not a heading"]);
        assert_eq!(sections[1].title, "Three spaces");
        assert_eq!(sections[1].body_lines, vec!["\t## tabbed"]);
    }

    #[test]
    fn image_with_title_and_inline_image_text() {
        let sections = parse("## S\n![alt text](https://x.test/a.png \"Caption\")\nsee ![i](b.png) here");
        assert_eq!(sections[0].image, image("alt text", "https://x.test/a.png"));
        assert_eq!(sections[0].body_lines, vec!["see ![i](b.png) here"]);
    }

    #[test]
    fn body_keeps_indentation_and_order() {
        let sections = parse("## List\n1. one\n   - nested  \n2. two");
        assert_eq!(sections[0].body_lines, vec!["1. one", "   - nested", "2. two"]);
    }

    #[test]
    fn crlf_input() {
        let sections = parse("## A\r\nbody\r\n");
        assert_eq!(sections[0].title, "A");
        assert_eq!(sections[0].body_lines, vec!["body"]);
    }

    #[test]
    fn parse_is_deterministic() {
        let doc = "pre\n## A\n![x](1.png)\na\n\n## B\nb\n![y](2.png)\n![z](3.png)";
        assert_eq!(parse(doc), parse(doc));
    }
}
