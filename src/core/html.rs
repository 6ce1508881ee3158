use scraper::{ElementRef, Html};

use crate::core::dom::{Document, NodeId};
use crate::core::error::GuardError;

/// Parse a full HTML page into a [`Document`] anchored at `url`.
pub fn parse_document(url: &str, html: &str) -> Document {
    let parsed = Html::parse_document(html);
    let mut doc = Document::with_root(url, "html");
    let root = doc.root();
    copy_children(&mut doc, root, parsed.root_element());
    doc
}

/// Parse an HTML fragment and append its top-level nodes under `parent`.
/// Returns the handles of the appended top-level elements.
pub fn append_fragment(
    doc: &mut Document,
    parent: NodeId,
    html: &str,
) -> Result<Vec<NodeId>, GuardError> {
    if !doc.is_connected(parent) {
        return Err(GuardError::Html(format!("{parent} is not attached to the page")));
    }
    let parsed = Html::parse_fragment(html);
    let before = doc.children(parent).len();
    copy_children(doc, parent, parsed.root_element());
    Ok(doc.children(parent)[before..]
        .iter()
        .copied()
        .filter(|id| doc.tag(*id).is_some())
        .collect())
}

fn copy_children(doc: &mut Document, parent: NodeId, source: ElementRef<'_>) {
    for child in source.children() {
        if let Some(element) = ElementRef::wrap(child) {
            let id = doc.create_element(element.value().name());
            for (name, value) in element.value().attrs() {
                doc.set_attr(id, name, value);
            }
            doc.append_child(parent, id);
            copy_children(doc, id, element);
        } else if let Some(text) = child.value().as_text() {
            let id = doc.create_text(&**text);
            doc.append_child(parent, id);
        }
    }
}
