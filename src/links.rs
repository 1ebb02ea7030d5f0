use url::Url;

use crate::async_task::Task;
use crate::extract::resolve_link;
use crate::frame::FrameSurface;
use crate::page::Page;
use crate::tree::{NavigationTree, SEARCH_ORIGIN};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkActivation {
    pub destination: String,
    pub origin: String,
}

impl LinkActivation {
    pub fn into_task(self) -> Task {
        Task::FetchDocument {
            url: self.destination,
            origin: self.origin,
        }
    }
}

/// The origin to record for a link found in `page`. Content without an
/// origin tag counts as a search.
pub fn link_origin(page: Option<&Page>) -> &str {
    page.and_then(Page::origin).unwrap_or(SEARCH_ORIGIN)
}

/// Activate link `link` of the document shown at `depth`.
pub fn activate_link<S: FrameSurface>(
    tree: &NavigationTree<S>,
    depth: usize,
    link: usize,
) -> Option<LinkActivation> {
    let node = tree.frames().get(depth)?.content()?;
    let page = tree.page(node)?;
    let destination = page.link(link)?.href.clone();
    Some(LinkActivation {
        destination,
        origin: link_origin(Some(page)).to_string(),
    })
}

/// Turn open-url prompt input into an activation. Web urls are taken as they
/// are, `host.tld/path` gets `https://` in front, and anything else is an
/// article title on the wiki `base_url` lives on.
pub fn search_activation(input: &str, base_url: &str) -> Option<LinkActivation> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let destination = match Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https" | "file") => resolve_link(None, input)?,
        _ if looks_like_host(input) => resolve_link(None, &format!("https://{}", input))?,
        _ => article_url(input, base_url)?,
    };

    Some(LinkActivation {
        destination,
        origin: SEARCH_ORIGIN.to_string(),
    })
}

/// `en.wikipedia.org/wiki/Rust`: a dotted first segment followed by a path.
fn looks_like_host(input: &str) -> bool {
    match input.split_once('/') {
        Some((host, _)) => {
            host.contains('.')
                && !host.starts_with('.')
                && !host.ends_with('.')
                && !host.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// `<base origin>/wiki/<Title_with_underscores>`, the title percent-encoded as
/// one path segment.
fn article_url(title: &str, base_url: &str) -> Option<String> {
    let mut url = Url::parse(base_url).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .ok()?
        .clear()
        .push("wiki")
        .push(&title.replace(' ', "_"));
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::ExtractedDocument;

    #[test]
    fn test_link_origin_defaults_to_search() {
        assert_eq!(link_origin(None), SEARCH_ORIGIN);
        let mut page = Page::new();
        assert_eq!(link_origin(Some(&page)), SEARCH_ORIGIN);
        page.mark_origin("https://wiki.test/wiki/A");
        assert_eq!(link_origin(Some(&page)), "https://wiki.test/wiki/A");
    }

    #[test]
    fn test_activate_link_uses_inserted_page_as_origin() {
        let mut page = Page::from_paragraphs(["intro"]);
        page.add_link("https://wiki.test/wiki/B".to_string(), "B".to_string());
        let mut tree = NavigationTree::new();
        tree.insert_root(ExtractedDocument::new("A", page), "https://wiki.test/wiki/A");

        let activation = activate_link(&tree, 0, 0).unwrap();
        assert_eq!(
            activation,
            LinkActivation {
                destination: "https://wiki.test/wiki/B".to_string(),
                origin: "https://wiki.test/wiki/A".to_string(),
            }
        );
        assert_eq!(
            activation.into_task(),
            Task::FetchDocument {
                url: "https://wiki.test/wiki/B".to_string(),
                origin: "https://wiki.test/wiki/A".to_string(),
            }
        );

        assert_eq!(activate_link(&tree, 0, 1), None);
        assert_eq!(activate_link(&tree, 1, 0), None);
    }

    #[test]
    fn test_search_activation() {
        let base = "https://wiki.test/wiki/Main_Page";
        let by_name = search_activation("  Rust language ", base).unwrap();
        assert_eq!(by_name.destination, "https://wiki.test/wiki/Rust_language");
        assert_eq!(by_name.origin, SEARCH_ORIGIN);

        let absolute = search_activation("https://other.test/wiki/X#History", base).unwrap();
        assert_eq!(absolute.destination, "https://other.test/wiki/X");

        assert_eq!(search_activation("   ", base), None);
    }

    #[test]
    fn test_search_activation_namespaced_titles() {
        let base = "https://wiki.test/wiki/Main_Page";
        assert_eq!(
            search_activation("Help:Contents", base).unwrap().destination,
            "https://wiki.test/wiki/Help:Contents"
        );
        assert_eq!(
            search_activation("Category:Programming languages", base).unwrap().destination,
            "https://wiki.test/wiki/Category:Programming_languages"
        );
    }

    #[test]
    fn test_search_activation_escapes_titles() {
        let base = "https://wiki.test/wiki/Main_Page?action=view";
        assert_eq!(
            search_activation("C#", base).unwrap().destination,
            "https://wiki.test/wiki/C%23"
        );
        assert_eq!(
            search_activation("What?", base).unwrap().destination,
            "https://wiki.test/wiki/What%3F"
        );
        assert_eq!(
            search_activation("AC/DC", base).unwrap().destination,
            "https://wiki.test/wiki/AC%2FDC"
        );
        assert_eq!(
            search_activation("Node.js", base).unwrap().destination,
            "https://wiki.test/wiki/Node.js"
        );
    }

    #[test]
    fn test_search_activation_bare_hosts() {
        let base = "https://wiki.test/wiki/Main_Page";
        assert_eq!(
            search_activation("en.wikipedia.org/wiki/Rust", base).unwrap().destination,
            "https://en.wikipedia.org/wiki/Rust"
        );
        assert!(!looks_like_host("Rust"));
        assert!(!looks_like_host("Node.js"));
        assert!(!looks_like_host("AC/DC"));
        assert!(!looks_like_host("Mr. Smith/Intro"));
    }
}
