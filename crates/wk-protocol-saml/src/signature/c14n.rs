//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//!
//! Produces a byte-stable serialization of a document subtree, independent
//! of attribute order and inherited namespace clutter. Only "visibly
//! utilized" namespace declarations are output: a namespace is visibly
//! utilized on an element if its prefix is used by the element's tag name
//! or by one of its attributes.
//!
//! An optional exclusion node implements the enveloped-signature
//! transform: the excluded subtree (the `<ds:Signature>` element and
//! everything below it) is dropped from the output entirely.

use std::collections::BTreeMap;

use roxmltree::{Node, NodeId, NodeType};

use super::CanonicalizationAlgorithm;

/// The reserved `xml:` namespace; its declaration is never emitted.
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Canonicalizes a subtree with exc-C14N, comments omitted.
#[must_use]
pub fn canonicalize_subtree(node: Node<'_, '_>) -> String {
    canonicalize(node, None, CanonicalizationAlgorithm::ExclusiveC14N)
}

/// Canonicalizes a subtree, optionally dropping one nested subtree
/// (the enveloped-signature transform).
#[must_use]
pub fn canonicalize(
    node: Node<'_, '_>,
    exclude: Option<Node<'_, '_>>,
    mode: CanonicalizationAlgorithm,
) -> String {
    let mut out = String::new();
    let ctx = C14nContext {
        exclude: exclude.map(|n| n.id()),
        with_comments: mode.with_comments(),
    };
    ctx.process_node(node, &BTreeMap::new(), &mut out);
    out
}

struct C14nContext {
    exclude: Option<NodeId>,
    with_comments: bool,
}

impl C14nContext {
    fn process_node(
        &self,
        node: Node<'_, '_>,
        rendered_ns: &BTreeMap<String, String>,
        out: &mut String,
    ) {
        if self.exclude == Some(node.id()) {
            return;
        }
        match node.node_type() {
            NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, rendered_ns, out);
                }
            }
            NodeType::Element => self.process_element(node, rendered_ns, out),
            NodeType::Text => {
                out.push_str(&escape_text(node.text().unwrap_or("")));
            }
            NodeType::Comment => {
                if self.with_comments {
                    out.push_str("<!--");
                    out.push_str(node.text().unwrap_or(""));
                    out.push_str("-->");
                }
            }
            NodeType::PI => {
                if let Some(pi) = node.pi() {
                    out.push_str("<?");
                    out.push_str(pi.target);
                    if let Some(value) = pi.value {
                        if !value.is_empty() {
                            out.push(' ');
                            out.push_str(&value.replace('\r', "&#xD;"));
                        }
                    }
                    out.push_str("?>");
                }
            }
        }
    }

    fn process_element(
        &self,
        node: Node<'_, '_>,
        rendered_ns: &BTreeMap<String, String>,
        out: &mut String,
    ) {
        // All namespace bindings in scope at this element, prefix → URI.
        let mut scope: BTreeMap<String, String> = BTreeMap::new();
        for ns in node.namespaces() {
            scope.insert(ns.name().unwrap_or("").to_string(), ns.uri().to_string());
        }

        let elem_prefix = element_prefix(node, &scope);
        let qname = match &elem_prefix {
            Some(p) => format!("{}:{}", p, node.tag_name().name()),
            None => node.tag_name().name().to_string(),
        };

        // Visibly utilized prefixes: the element's own, plus attribute
        // prefixes. "" stands for the default namespace.
        let mut utilized: Vec<String> = Vec::new();
        if node.tag_name().namespace().is_some() {
            utilized.push(elem_prefix.clone().unwrap_or_default());
        }
        for attr in node.attributes() {
            match attr.namespace() {
                Some(XML_NAMESPACE) | None => {}
                Some(uri) => {
                    if let Some(p) = prefixed_binding(&scope, uri) {
                        if !utilized.contains(&p) {
                            utilized.push(p);
                        }
                    }
                }
            }
        }

        let mut ns_decls: Vec<(String, String)> = Vec::new();
        for prefix in &utilized {
            if prefix == "xml" {
                continue;
            }
            if let Some(uri) = scope.get(prefix) {
                if rendered_ns.get(prefix) != Some(uri) {
                    ns_decls.push((prefix.clone(), uri.clone()));
                }
            }
        }
        // An element outside any namespace under a rendered default
        // namespace must undeclare it.
        if node.tag_name().namespace().is_none() {
            if let Some(prev) = rendered_ns.get("") {
                if !prev.is_empty() {
                    ns_decls.push((String::new(), String::new()));
                }
            }
        }
        ns_decls.sort();

        // (ns_uri, local_name, qualified_name, value)
        let mut attrs: Vec<(String, String, String, String)> = Vec::new();
        for attr in node.attributes() {
            let qn = match attr.namespace() {
                Some(XML_NAMESPACE) => format!("xml:{}", attr.name()),
                Some(uri) => match prefixed_binding(&scope, uri) {
                    Some(p) => format!("{}:{}", p, attr.name()),
                    None => attr.name().to_string(),
                },
                None => attr.name().to_string(),
            };
            attrs.push((
                attr.namespace().unwrap_or("").to_string(),
                attr.name().to_string(),
                qn,
                attr.value().to_string(),
            ));
        }
        // Unqualified attributes first by local name, then qualified by
        // (namespace URI, local name).
        attrs.sort_by(|a, b| match (a.0.is_empty(), b.0.is_empty()) {
            (true, true) => a.1.cmp(&b.1),
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => a.0.cmp(&b.0).then(a.1.cmp(&b.1)),
        });

        out.push('<');
        out.push_str(&qname);
        for (prefix, uri) in &ns_decls {
            if prefix.is_empty() {
                out.push_str(&format!(" xmlns=\"{}\"", escape_attr(uri)));
            } else {
                out.push_str(&format!(" xmlns:{}=\"{}\"", prefix, escape_attr(uri)));
            }
        }
        for (_, _, qn, value) in &attrs {
            out.push_str(&format!(" {}=\"{}\"", qn, escape_attr(value)));
        }
        out.push('>');

        let mut child_rendered = rendered_ns.clone();
        for (prefix, uri) in &ns_decls {
            child_rendered.insert(prefix.clone(), uri.clone());
        }
        for child in node.children() {
            self.process_node(child, &child_rendered, out);
        }

        out.push_str("</");
        out.push_str(&qname);
        out.push('>');
    }
}

/// Resolves the output prefix for an element. The default namespace wins
/// when it binds the element's URI; otherwise the first prefixed binding
/// in prefix order is used.
fn element_prefix(node: Node<'_, '_>, scope: &BTreeMap<String, String>) -> Option<String> {
    let uri = node.tag_name().namespace()?;
    if scope.get("").map(String::as_str) == Some(uri) {
        return None;
    }
    prefixed_binding(scope, uri)
}

/// Finds a non-default prefix bound to `uri`, in prefix order.
fn prefixed_binding(scope: &BTreeMap<String, String>, uri: &str) -> Option<String> {
    scope
        .iter()
        .find(|(p, u)| !p.is_empty() && u.as_str() == uri)
        .map(|(p, _)| p.clone())
}

/// Escapes text node content per C14N rules.
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escapes attribute values per C14N rules.
fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}
