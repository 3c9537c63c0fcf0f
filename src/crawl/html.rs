use ego_tree::NodeRef;
use scraper::{Html, Node, Selector};
use url::Url;

/// Containers whose text never reaches the plaintext rendering.
const SKIPPED: &[&str] = &["head", "script", "style", "noscript", "svg", "template"];

/// Renders HTML into the plaintext the indexer tokenizes. Tags and
/// entities disappear; text inside non-content containers is dropped.
/// Element boundaries become whitespace, which the tokenizer collapses.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();
    collect_text(document.tree.root(), &mut text);
    text
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(chunk) => out.push_str(chunk),
            Node::Element(element) => {
                if !SKIPPED.contains(&element.name()) {
                    collect_text(child, out);
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Extracts every `<a href>` target as an absolute http(s) URI resolved
/// against `base`, in document order. Unparseable or non-web targets are
/// skipped.
pub fn extract_links(base: &Url, html: &str) -> Vec<Url> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").expect("valid selector");

    let mut links = Vec::new();
    for anchor in document.select(&anchors) {
        if let Some(href) = anchor.value().attr("href") {
            if let Ok(resolved) = base.join(href) {
                if matches!(resolved.scheme(), "http" | "https") {
                    links.push(resolved);
                }
            }
        }
    }
    links
}
