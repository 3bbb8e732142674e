use super::blocks::Block;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Everything before the first recognized section header.
    Header,
    Description,
    Benefits,
    Other,
}

#[derive(Debug, Clone)]
pub struct Section {
    pub kind: SectionKind,
    pub blocks: Vec<Block>,
}

/// Cluster a flat Vec<Block> into sections at each section header.
/// The header block itself opens the new section.
pub fn cluster_sections(blocks: &[Block]) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current_blocks: Vec<Block> = Vec::new();
    let mut current_kind = SectionKind::Header;

    for block in blocks {
        if let Some(new_kind) = detect_transition(block) {
            if !current_blocks.is_empty() {
                sections.push(Section {
                    kind: current_kind,
                    blocks: std::mem::take(&mut current_blocks),
                });
            }
            current_kind = new_kind;
        }
        current_blocks.push(block.clone());
    }

    if !current_blocks.is_empty() {
        sections.push(Section {
            kind: current_kind,
            blocks: current_blocks,
        });
    }

    sections
}

fn detect_transition(block: &Block) -> Option<SectionKind> {
    match block {
        // Level-1 heading is the technology name, not a section
        Block::Heading { level, text } if *level >= 2 => Some(kind_for_title(text)),
        Block::Labeled { key, .. } if key == "description" => Some(SectionKind::Description),
        Block::Labeled { key, .. } if key == "benefits" => Some(SectionKind::Benefits),
        _ => None,
    }
}

fn kind_for_title(title: &str) -> SectionKind {
    let lower = title.trim().trim_end_matches(':').to_lowercase();
    match lower.as_str() {
        "description" | "details" | "overview" | "abstract" | "technology description" => {
            SectionKind::Description
        }
        "benefits" | "advantages" | "benefit" | "key benefits" => SectionKind::Benefits,
        _ => SectionKind::Other,
    }
}

impl Section {
    /// Text between the section header and the next list-item boundary (or the end of the
    /// section), paragraphs joined by newlines. A section made only of list items yields the
    /// items joined with `; `.
    pub fn captured_text(&self) -> Option<String> {
        let mut paragraphs: Vec<String> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut items: Vec<&str> = Vec::new();

        // Inline value of a `Description: ...` label counts as the first line
        if let Some(Block::Labeled { value, .. }) = self.blocks.first() {
            if !value.trim().is_empty() {
                current.push(value.trim());
            }
        }

        for block in self.blocks.iter().skip(1) {
            match block {
                Block::Text(t) => {
                    if !items.is_empty() {
                        break;
                    }
                    current.push(t);
                }
                Block::Empty => {
                    if !current.is_empty() {
                        paragraphs.push(current.join(" "));
                        current.clear();
                    }
                }
                Block::Link { .. } => {}
                Block::ListItem(item) => {
                    if !current.is_empty() || !paragraphs.is_empty() {
                        break;
                    }
                    items.push(item);
                }
                Block::Labeled { .. } | Block::Heading { .. } => break,
            }
        }
        if !current.is_empty() {
            paragraphs.push(current.join(" "));
        }

        let text = if paragraphs.is_empty() {
            items.join("; ")
        } else {
            paragraphs.join("\n")
        };
        let text = text.trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
