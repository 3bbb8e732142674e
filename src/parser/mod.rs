pub mod blocks;
pub mod classify;
pub mod extract;
pub mod sections;

use crate::model::SourceDocument;
use blocks::Block;
use sections::{Section, SectionKind};

/// A document split into blocks and sections, shared by every extractor.
pub struct ParsedDocument<'a> {
    pub text: &'a str,
    pub blocks: Vec<Block>,
    pub sections: Vec<Section>,
}

/// Two-pass parse: text → blocks → sections.
pub fn parse(doc: &SourceDocument) -> ParsedDocument<'_> {
    let blocks = blocks::classify_lines(&doc.text);
    let sections = sections::cluster_sections(&blocks);
    ParsedDocument {
        text: &doc.text,
        blocks,
        sections,
    }
}

impl ParsedDocument<'_> {
    /// First value of a labeled line with the given canonical key.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            Block::Labeled { key: k, value } if k == key && !value.is_empty() => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn links(&self) -> impl Iterator<Item = (&str, &str)> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Link { text, url } => Some((text.as_str(), url.as_str())),
            _ => None,
        })
    }
}
