use super::base::bracketed_or_plain;
use crate::model::PartialRecord;
use crate::parser::blocks::strip_link_syntax;
use crate::parser::ParsedDocument;

pub fn extract(doc: &ParsedDocument) -> PartialRecord {
    PartialRecord {
        uploader: doc.label("uploaded by").and_then(bracketed_or_plain),
        source_label: doc
            .label("source")
            .map(|v| strip_link_syntax(v).trim().to_string())
            .filter(|v| !v.is_empty()),
        ..Default::default()
    }
}
