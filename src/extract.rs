use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use url::Url;

use crate::config::FetchConfig;
use crate::error::ExtractError;
use crate::page::{BlockKind, ExtractedDocument, Page, Segment, TextBlock};

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Keep only the element with id `content_id`. A missing region or title is an
/// error, never a half-filled document.
pub fn extract_document(
    html: &str,
    page_url: &str,
    rules: &FetchConfig,
) -> Result<ExtractedDocument, ExtractError> {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);

    let content = find_element(&dom.document, &|name, handle| {
        name != "html" && attr(handle, "id").as_deref() == Some(rules.content_id.as_str())
    })
    .ok_or_else(|| ExtractError::MissingContent {
        url: page_url.to_string(),
        id: rules.content_id.clone(),
    })?;

    let title = find_element(&content, &|_, handle| has_class(handle, &rules.title_class))
        .or_else(|| find_element(&dom.document, &|_, handle| has_class(handle, &rules.title_class)))
        .or_else(|| find_element(&dom.document, &|name, _| name == "title"))
        .map(|handle| normalize_whitespace(&text_of(&handle)))
        .filter(|title| !title.is_empty())
        .ok_or_else(|| ExtractError::MissingTitle {
            url: page_url.to_string(),
        })?;

    let base = Url::parse(page_url).ok();
    let mut builder = PageBuilder::new(base);
    builder.walk(&content);
    let page = builder.finish();

    log::debug!(
        "🔍 extract: {} -> \"{}\" ({} blocks, {} links)",
        page_url,
        title,
        page.blocks().len(),
        page.links().len()
    );

    Ok(ExtractedDocument::new(title, page))
}

/// Resolve `href` against the page it was found on. Fragment-only links and
/// non-navigational schemes yield `None`.
pub fn resolve_link(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut resolved = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    if !matches!(resolved.scheme(), "http" | "https" | "file") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

fn element_name(handle: &Handle) -> Option<String> {
    match handle.data {
        NodeData::Element { ref name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn attr(handle: &Handle, wanted: &str) -> Option<String> {
    match handle.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attribute| &*attribute.name.local == wanted)
            .map(|attribute| attribute.value.to_string()),
        _ => None,
    }
}

fn has_class(handle: &Handle, class: &str) -> bool {
    attr(handle, "class")
        .map(|classes| classes.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

/// Depth-first search for the first element matching `predicate`.
fn find_element(handle: &Handle, predicate: &dyn Fn(&str, &Handle) -> bool) -> Option<Handle> {
    if let Some(name) = element_name(handle) {
        if predicate(&name, handle) {
            return Some(handle.clone());
        }
    }
    for child in handle.children.borrow().iter() {
        if let Some(found) = find_element(child, predicate) {
            return Some(found);
        }
    }
    None
}

fn text_of(handle: &Handle) -> String {
    let mut text = String::new();
    collect_text(handle, &mut text);
    text
}

fn collect_text(handle: &Handle, out: &mut String) {
    match handle.data {
        NodeData::Text { ref contents } => out.push_str(&contents.borrow()),
        NodeData::Element { ref name, .. } if SKIPPED_TAGS.contains(&&*name.local) => {}
        _ => {
            for child in handle.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn block_kind(tag: &str) -> Option<BlockKind> {
    match tag {
        "h1" => Some(BlockKind::Heading(1)),
        "h2" => Some(BlockKind::Heading(2)),
        "h3" => Some(BlockKind::Heading(3)),
        "h4" | "h5" | "h6" => Some(BlockKind::Heading(4)),
        "li" | "dd" | "dt" => Some(BlockKind::ListItem),
        "pre" => Some(BlockKind::Preformatted),
        "p" | "div" | "section" | "blockquote" | "table" | "tr" | "ul" | "ol" | "dl"
        | "figure" | "figcaption" | "caption" => Some(BlockKind::Paragraph),
        _ => None,
    }
}

struct PageBuilder {
    base: Option<Url>,
    page: Page,
    kind: BlockKind,
    segments: Vec<Segment>,
    pending_space: bool,
    preformatted: bool,
}

impl PageBuilder {
    fn new(base: Option<Url>) -> Self {
        Self {
            base,
            page: Page::new(),
            kind: BlockKind::Paragraph,
            segments: Vec::new(),
            pending_space: false,
            preformatted: false,
        }
    }

    fn finish(mut self) -> Page {
        self.flush();
        self.page
    }

    fn walk(&mut self, handle: &Handle) {
        match handle.data {
            NodeData::Text { ref contents } => {
                let text = contents.borrow();
                self.push_text(&text);
            }
            NodeData::Element { ref name, .. } => {
                let tag: &str = &name.local;
                if SKIPPED_TAGS.contains(&tag) {
                    return;
                }
                if tag == "br" {
                    self.flush();
                    return;
                }
                if tag == "a" {
                    if let Some(href) = attr(handle, "href") {
                        self.push_anchor(handle, &href);
                        return;
                    }
                }

                match block_kind(tag) {
                    Some(kind) => {
                        self.flush();
                        let outer = self.kind;
                        let was_pre = self.preformatted;
                        self.kind = kind;
                        self.preformatted = was_pre || kind == BlockKind::Preformatted;
                        self.walk_children(handle);
                        self.flush();
                        self.kind = outer;
                        self.preformatted = was_pre;
                    }
                    None => self.walk_children(handle),
                }
            }
            _ => self.walk_children(handle),
        }
    }

    fn walk_children(&mut self, handle: &Handle) {
        for child in handle.children.borrow().iter() {
            self.walk(child);
        }
    }

    fn push_anchor(&mut self, handle: &Handle, href: &str) {
        let text = normalize_whitespace(&text_of(handle));
        if text.is_empty() {
            return;
        }
        match resolve_link(self.base.as_ref(), href) {
            Some(resolved) => {
                self.separate();
                let link = self.page.add_link(resolved, text.clone());
                self.segments.push(Segment::Link { text, link });
            }
            None => self.push_text(&text),
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.preformatted {
            for (index, line) in text.split('\n').enumerate() {
                if index > 0 {
                    self.flush();
                }
                self.append(line);
            }
            return;
        }

        if text.starts_with(char::is_whitespace) {
            self.pending_space = true;
        }
        let mut words = text.split_whitespace().peekable();
        while let Some(word) = words.next() {
            self.separate();
            self.append(word);
            if words.peek().is_some() {
                self.pending_space = true;
            }
        }
        if text.ends_with(char::is_whitespace) {
            self.pending_space = true;
        }
    }

    /// Emit a pending inter-word space, never at the start of a block.
    fn separate(&mut self) {
        if self.pending_space && !self.segments.is_empty() {
            self.append(" ");
        }
        self.pending_space = false;
    }

    fn append(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(Segment::Text(existing)) => existing.push_str(text),
            _ => self.segments.push(Segment::Text(text.to_string())),
        }
    }

    fn flush(&mut self) {
        self.pending_space = false;
        if let Some(Segment::Text(last)) = self.segments.last_mut() {
            if !self.preformatted {
                let trimmed = last.trim_end().len();
                last.truncate(trimmed);
            }
        }
        self.segments
            .retain(|segment| !matches!(segment, Segment::Text(text) if text.is_empty()));
        if self.segments.is_empty() {
            return;
        }
        let segments = std::mem::take(&mut self.segments);
        self.page.push_block(TextBlock {
            kind: self.kind,
            segments,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const ARTICLE: &str = r##"<!DOCTYPE html>
<html>
<head><title>Rust - Wiki</title><style>p { color: red; }</style></head>
<body>
  <div id="mw-navigation"><a href="/wiki/Nav">Navigation</a></div>
  <div id="content">
    <h1 class="firstHeading">Rust (programming language)</h1>
    <p>Rust is a <b>general-purpose</b> language.
       See <a href="/wiki/Memory_safety#Types">memory safety</a> and
       <a href="#History">history</a>.</p>
    <script>var x = 1;</script>
    <ul><li><a href="https://other.test/page">Elsewhere</a></li><li>plain item</li></ul>
  </div>
</body>
</html>"##;

    #[test]
    fn test_extracts_title_and_content() {
        let doc =
            extract_document(ARTICLE, "https://wiki.test/wiki/Rust", &FetchConfig::default())
                .unwrap();

        assert_eq!(doc.title, "Rust (programming language)");
        let text = doc.content.plain_text();
        assert!(text.contains("Rust is a general-purpose language. See memory safety and history."));
        assert!(!text.contains("var x"));
        assert!(!text.contains("Navigation"));
    }

    #[test]
    fn test_links_are_resolved_and_fragments_dropped() {
        let doc =
            extract_document(ARTICLE, "https://wiki.test/wiki/Rust", &FetchConfig::default())
                .unwrap();

        let hrefs: Vec<&str> = doc.content.links().iter().map(|l| l.href.as_str()).collect();
        assert_eq!(
            hrefs,
            vec!["https://wiki.test/wiki/Memory_safety", "https://other.test/page"]
        );
        assert_eq!(doc.content.links()[0].text, "memory safety");
    }

    #[test]
    fn test_list_items_become_blocks() {
        let doc =
            extract_document(ARTICLE, "https://wiki.test/wiki/Rust", &FetchConfig::default())
                .unwrap();

        let items: Vec<String> = doc
            .content
            .blocks()
            .iter()
            .filter(|b| b.kind == BlockKind::ListItem)
            .map(|b| b.plain_text())
            .collect();
        assert_eq!(items, vec!["Elsewhere".to_string(), "plain item".to_string()]);
    }

    #[test]
    fn test_missing_content_region() {
        let result = extract_document(
            "<html><body><p>nothing</p></body></html>",
            "https://wiki.test/wiki/X",
            &FetchConfig::default(),
        );
        assert_matches!(result, Err(ExtractError::MissingContent { .. }));
    }

    #[test]
    fn test_title_falls_back_to_title_element() {
        let html = r#"<html><head><title>Fallback</title></head>
            <body><div id="content"><p>body</p></div></body></html>"#;
        let doc = extract_document(html, "https://wiki.test/wiki/X", &FetchConfig::default())
            .unwrap();
        assert_eq!(doc.title, "Fallback");
    }

    #[test]
    fn test_missing_title() {
        let html = r#"<html><body><div id="content"><p>body</p></div></body></html>"#;
        let result = extract_document(html, "https://wiki.test/wiki/X", &FetchConfig::default());
        assert_matches!(result, Err(ExtractError::MissingTitle { .. }));
    }

    #[test]
    fn test_resolve_link() {
        let base = Url::parse("https://wiki.test/wiki/A").ok();
        assert_eq!(
            resolve_link(base.as_ref(), "/wiki/B#x"),
            Some("https://wiki.test/wiki/B".to_string())
        );
        assert_eq!(resolve_link(base.as_ref(), "#top"), None);
        assert_eq!(resolve_link(base.as_ref(), "mailto:someone@wiki.test"), None);
        assert_eq!(resolve_link(None, "/wiki/B"), None);
    }
}
