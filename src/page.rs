use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
    Preformatted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Text(String),
    /// Link text plus its index into `Page::links`.
    Link { text: String, link: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub kind: BlockKind,
    pub segments: Vec<Segment>,
}

impl TextBlock {
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.as_str(),
                Segment::Link { text, .. } => text.as_str(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Absolute destination, fragment stripped.
    pub href: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    blocks: Vec<TextBlock>,
    links: Vec<Link>,
    origin: Option<String>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a page from plain paragraphs, mostly useful for fixtures.
    pub fn from_paragraphs<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut page = Self::new();
        for text in paragraphs {
            page.push_block(TextBlock {
                kind: BlockKind::Paragraph,
                segments: vec![Segment::Text(text.into())],
            });
        }
        page
    }

    pub fn push_block(&mut self, block: TextBlock) {
        if !block.segments.is_empty() {
            self.blocks.push(block);
        }
    }

    /// Register a link and return its index for use in a `Segment::Link`.
    pub fn add_link(&mut self, href: String, text: String) -> usize {
        self.links.push(Link { href, text });
        self.links.len() - 1
    }

    pub fn blocks(&self) -> &[TextBlock] {
        &self.blocks
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, index: usize) -> Option<&Link> {
        self.links.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Index of the block holding the given link, used to scroll it into view.
    pub fn block_of_link(&self, link: usize) -> Option<usize> {
        self.blocks.iter().position(|block| {
            block
                .segments
                .iter()
                .any(|segment| matches!(segment, Segment::Link { link: l, .. } if *l == link))
        })
    }

    /// Tag this content with the URL it was loaded from.
    pub fn mark_origin(&mut self, url: &str) {
        self.origin = Some(url.to_string());
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(TextBlock::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// What the fetch+extract collaborator hands back: both fields are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub title: String,
    pub content: Page,
}

impl ExtractedDocument {
    pub fn new(title: impl Into<String>, content: Page) -> Self {
        Self {
            title: title.into(),
            content,
        }
    }
}
