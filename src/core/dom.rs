//! Arena-backed model of the host page's DOM.
//!
//! Nodes are addressed by [`NodeId`] handles that stay valid for the lifetime
//! of the document, including after the node is detached. Guard state and
//! banner bookkeeping key off these handles rather than marker attributes.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

const HIDDEN_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "link", "meta", "source"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
    },
    Text(String),
    /// Pre-rendered markup inserted as-is (the `innerHTML` path).
    Markup(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// What caused a submit event to be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    Button,
    EnterKey,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    Submitted,
    Prevented,
}

/// Owned element tree a host uses to inject new content into a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    nodes: Vec<Node>,
    root: NodeId,
    intercepted: HashSet<NodeId>,
}

impl Document {
    /// Blank page with `html`, `head` and `body` elements.
    pub fn new(url: impl Into<String>) -> Self {
        let mut doc = Self::with_root(url, "html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(doc.root, head);
        doc.append_child(doc.root, body);
        doc
    }

    pub(crate) fn with_root(url: impl Into<String>, tag: &str) -> Self {
        let mut doc = Self {
            url: url.into(),
            nodes: Vec::new(),
            root: NodeId(0),
            intercepted: HashSet::new(),
        };
        doc.root = doc.create_element(tag);
        doc
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> Option<NodeId> {
        self.first_by_tag("head")
    }

    /// The `body` element, falling back to the root for fragment-like pages.
    pub fn body(&self) -> NodeId {
        self.first_by_tag("body").unwrap_or(self.root)
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_markup(&mut self, markup: impl Into<String>) -> NodeId {
        self.push(NodeData::Markup(markup.into()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        self.remove(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        self.remove(child);
        self.nodes[parent.0].children.insert(0, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Detach `node` from its parent. The handle stays valid.
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.node(node).and_then(|n| n.parent) else {
            return;
        };
        self.nodes[parent.0].children.retain(|c| *c != node);
        self.nodes[node.0].parent = None;
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.node(node)?.data {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.node(node)?.data {
            NodeData::Element { attrs, .. } => attrs.get(&name.to_ascii_lowercase()).map(String::as_str),
            _ => None,
        }
    }

    pub fn attrs(&self, node: NodeId) -> Vec<(&str, &str)> {
        match self.node(node).map(|n| &n.data) {
            Some(NodeData::Element { attrs, .. }) => {
                attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        if let Some(NodeData::Element { attrs, .. }) = self.nodes.get_mut(node.0).map(|n| &mut n.data) {
            attrs.insert(name.to_ascii_lowercase(), value.into());
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(NodeData::Element { attrs, .. }) = self.nodes.get_mut(node.0).map(|n| &mut n.data) {
            attrs.remove(&name.to_ascii_lowercase());
        }
    }

    pub fn data(&self, node: NodeId, key: &str) -> Option<&str> {
        self.attr(node, &format!("data-{key}"))
    }

    pub fn set_data(&mut self, node: NodeId, key: &str, value: impl Into<String>) {
        self.set_attr(node, &format!("data-{key}"), value);
    }

    pub fn remove_data(&mut self, node: NodeId, key: &str) {
        self.remove_attr(node, &format!("data-{key}"));
    }

    pub fn is_disabled(&self, node: NodeId) -> bool {
        self.attr(node, "disabled").is_some()
    }

    pub fn set_disabled(&mut self, node: NodeId, disabled: bool) {
        if disabled {
            self.set_attr(node, "disabled", "");
        } else {
            self.remove_attr(node, "disabled");
        }
    }

    /// Pre-order descendants of `node`, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Connected elements in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = vec![self.root];
        out.extend(self.descendants(self.root));
        out.retain(|id| self.tag(*id).is_some());
        out
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|id| self.tag(*id).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
            .collect()
    }

    pub fn first_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.elements_by_tag(tag).into_iter().next()
    }

    pub fn forms(&self) -> Vec<NodeId> {
        self.elements_by_tag("form")
    }

    /// True if `node` is a `tag` element or has one among its descendants.
    pub fn contains_tag(&self, node: NodeId, tag: &str) -> bool {
        std::iter::once(node)
            .chain(self.descendants(node))
            .any(|id| self.tag(id).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for id in std::iter::once(node).chain(self.descendants(node)) {
            if let Some(NodeData::Text(text)) = self.node(id).map(|n| &n.data) {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace all children of `node` with a single text node.
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        for child in self.children(node).to_vec() {
            self.remove(child);
        }
        let text_id = self.create_text(text);
        self.append_child(node, text_id);
    }

    pub fn title(&self) -> String {
        self.first_by_tag("title")
            .map(|id| normalize_ws(&self.text_content(id)))
            .unwrap_or_default()
    }

    /// Rendered text of the body, skipping script-like containers.
    pub fn visible_text(&self) -> String {
        let mut parts = Vec::new();
        self.collect_visible(self.body(), &mut parts);
        normalize_ws(&parts.join(" "))
    }

    fn collect_visible<'a>(&'a self, node: NodeId, parts: &mut Vec<&'a str>) {
        let Some(n) = self.node(node) else {
            return;
        };
        match &n.data {
            NodeData::Text(text) => parts.push(text),
            NodeData::Markup(_) => {}
            NodeData::Element { tag, .. } => {
                if HIDDEN_TEXT_TAGS.contains(&tag.as_str()) {
                    return;
                }
                for child in &n.children {
                    self.collect_visible(*child, parts);
                }
            }
        }
    }

    /// Submit-capable controls owned by `form`.
    pub fn submit_controls(&self, form: NodeId) -> Vec<NodeId> {
        self.descendants(form)
            .into_iter()
            .filter(|id| self.is_submit_control(*id))
            .collect()
    }

    fn is_submit_control(&self, node: NodeId) -> bool {
        let kind = self.attr(node, "type").map(|t| t.trim().to_ascii_lowercase());
        match self.tag(node) {
            Some("button") => matches!(kind.as_deref(), None | Some("") | Some("submit")),
            Some("input") => matches!(kind.as_deref(), Some("submit") | Some("image")),
            _ => false,
        }
    }

    /// Build `spec` as a new subtree under `parent` and return its root.
    pub fn append_spec(&mut self, parent: NodeId, spec: &ElementSpec) -> NodeId {
        let id = self.create_element(&spec.tag);
        for (name, value) in &spec.attrs {
            self.set_attr(id, name, value.clone());
        }
        if let Some(text) = &spec.text {
            let text_id = self.create_text(text.clone());
            self.append_child(id, text_id);
        }
        for child in &spec.children {
            self.append_spec(id, child);
        }
        self.append_child(parent, id);
        id
    }

    pub fn intercept_submit(&mut self, form: NodeId) {
        self.intercepted.insert(form);
    }

    pub fn release_submit(&mut self, form: NodeId) {
        self.intercepted.remove(&form);
    }

    pub fn is_submit_intercepted(&self, form: NodeId) -> bool {
        self.intercepted.contains(&form)
    }

    /// Fire a submit event at `form` and report whether it went through.
    pub fn dispatch_submit(&self, form: NodeId, trigger: SubmitTrigger) -> SubmitOutcome {
        if self.tag(form) != Some("form") || self.is_submit_intercepted(form) {
            return SubmitOutcome::Prevented;
        }
        if trigger == SubmitTrigger::Button {
            let controls = self.submit_controls(form);
            if !controls.is_empty() && controls.iter().all(|c| self.is_disabled(*c)) {
                return SubmitOutcome::Prevented;
            }
        }
        SubmitOutcome::Submitted
    }

    pub fn to_html(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>");
        self.write_node(self.root, &mut out);
        out
    }

    fn write_node(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.node(node) else {
            return;
        };
        match &n.data {
            NodeData::Text(text) => out.push_str(&escape(text, false)),
            NodeData::Markup(markup) => out.push_str(markup),
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    if value.is_empty() {
                        out.push_str(&format!(" {name}"));
                    } else {
                        out.push_str(&format!(" {name}=\"{}\"", escape(value, true)));
                    }
                }
                out.push('>');
                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }
                for child in &n.children {
                    self.write_node(*child, out);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }
}

fn escape(input: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn normalize_ws(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
