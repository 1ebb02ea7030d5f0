//! Level frames: the reusable view slots, one per depth of the active path.
//!
//! Frames never own documents. Each reconciliation pass clears a frame and
//! fills it again with node ids and tab descriptors; whatever transient view
//! state the frame carries (content scroll, highlighted link, tab strip
//! offset) survives as long as the frame keeps showing the same node.

use crate::document::NodeId;

pub type FrameId = u64;

/// What a tab does when it is chosen or closed. The app feeds these back
/// into the navigation tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeAction {
    SelectRoot(NodeId),
    SelectChild { parent: NodeId, child: NodeId },
    CloseRoot(NodeId),
    CloseChild { parent: NodeId, child: NodeId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub label: String,
    pub active: bool,
    pub on_select: TreeAction,
    /// `None` means the tab has no close control.
    pub on_close: Option<TreeAction>,
}

impl Tab {
    pub fn closable(&self) -> bool {
        self.on_close.is_some()
    }

    /// The text drawn for this tab in the strip, padding included.
    pub fn cell_text(&self, max_label: usize) -> String {
        let label = truncate_label(&self.label, max_label);
        if self.closable() {
            format!(" {} × ", label)
        } else {
            format!(" {} ", label)
        }
    }
}

/// Shorten `label` to `max` characters followed by an ellipsis.
pub fn truncate_label(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        label.to_string()
    } else {
        let mut short: String = label.chars().take(max).collect();
        short.push('…');
        short
    }
}

/// Whether the tab strip is clipped on either edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabOverflow {
    pub left: bool,
    pub right: bool,
}

/// Clipping of a strip `strip_width` wide, shown through a container
/// `container_width` wide, scrolled `strip_offset` cells to the left.
pub fn tab_overflow(strip_width: u16, container_width: u16, strip_offset: u16) -> TabOverflow {
    TabOverflow {
        left: strip_offset > 0,
        right: strip_width > strip_offset.saturating_add(container_width),
    }
}

/// Separator drawn between two tabs.
pub const TAB_SEPARATOR: &str = "│";

#[derive(Debug, Clone)]
pub struct LevelFrame {
    id: FrameId,
    depth: usize,
    tabs: Vec<Tab>,
    content: Option<NodeId>,
    last_content: Option<NodeId>,
    overflow: TabOverflow,
    pub scroll: u16,
    pub selected_link: Option<usize>,
    /// Bring `selected_link` into view on the next draw, once the wrap width
    /// is known.
    pub reveal_link: bool,
    pub tab_offset: u16,
}

impl LevelFrame {
    fn new(id: FrameId, depth: usize) -> Self {
        Self {
            id,
            depth,
            tabs: Vec::new(),
            content: None,
            last_content: None,
            overflow: TabOverflow::default(),
            scroll: 0,
            selected_link: None,
            reveal_link: false,
            tab_offset: 0,
        }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn content(&self) -> Option<NodeId> {
        self.content
    }

    pub fn overflow(&self) -> TabOverflow {
        self.overflow
    }

    pub fn active_tab(&self) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.active)
    }

    /// Empty the tab strip and the content slot before reuse.
    pub fn clear(&mut self) {
        self.tabs.clear();
        self.content = None;
    }

    pub fn add_tab(
        &mut self,
        label: impl Into<String>,
        is_active: bool,
        on_select: TreeAction,
        on_close: Option<TreeAction>,
    ) {
        self.tabs.push(Tab {
            label: label.into(),
            active: is_active,
            on_select,
            on_close,
        });
    }

    /// Install the node shown in this frame. Only one install is allowed
    /// between two clears.
    pub fn set_content(&mut self, node: NodeId) {
        assert!(
            self.content.is_none(),
            "frame {} at depth {} already holds content",
            self.id,
            self.depth
        );
        if self.last_content != Some(node) {
            self.scroll = 0;
            self.selected_link = None;
            self.reveal_link = false;
        }
        self.content = Some(node);
        self.last_content = Some(node);
    }

    /// Total width of the strip when every tab is drawn.
    pub fn strip_width(&self, max_label: usize) -> u16 {
        let tabs: usize = self
            .tabs
            .iter()
            .map(|tab| tab.cell_text(max_label).chars().count())
            .sum();
        let separators = self.tabs.len().saturating_sub(1) * TAB_SEPARATOR.chars().count();
        u16::try_from(tabs + separators).unwrap_or(u16::MAX)
    }

    /// Column span `[start, end)` of tab `index` within the full strip.
    pub fn tab_span(&self, index: usize, max_label: usize) -> Option<(u16, u16)> {
        let mut start = 0usize;
        for (i, tab) in self.tabs.iter().enumerate() {
            let width = tab.cell_text(max_label).chars().count();
            if i == index {
                let end = start + width;
                return Some((
                    u16::try_from(start).unwrap_or(u16::MAX),
                    u16::try_from(end).unwrap_or(u16::MAX),
                ));
            }
            start += width + TAB_SEPARATOR.chars().count();
        }
        None
    }

    /// Scroll the strip so the active tab is fully visible in a container
    /// `container_width` wide, then recompute the overflow flags.
    pub fn layout_tabs(&mut self, container_width: u16, max_label: usize) -> TabOverflow {
        let strip_width = self.strip_width(max_label);
        if strip_width <= container_width {
            self.tab_offset = 0;
        } else {
            if let Some((start, end)) = self
                .active_tab()
                .and_then(|index| self.tab_span(index, max_label))
            {
                if start < self.tab_offset {
                    self.tab_offset = start;
                } else if end > self.tab_offset.saturating_add(container_width) {
                    self.tab_offset = end.saturating_sub(container_width);
                }
            }
            self.tab_offset = self.tab_offset.min(strip_width - container_width);
        }
        self.overflow = tab_overflow(strip_width, container_width, self.tab_offset);
        self.overflow
    }
}

/// Where frames become visible. Frames are attached when created and
/// detached when the active path no longer reaches their depth.
#[cfg_attr(test, mockall::automock)]
pub trait FrameSurface {
    fn attach(&mut self, frame: FrameId, depth: usize);
    fn detach(&mut self, frame: FrameId);
}

/// The default surface: the ordered list of attached frames.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AttachedFrames {
    order: Vec<FrameId>,
}

impl AttachedFrames {
    pub fn frames(&self) -> &[FrameId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl FrameSurface for AttachedFrames {
    fn attach(&mut self, frame: FrameId, depth: usize) {
        assert!(!self.order.contains(&frame), "frame {} attached twice", frame);
        assert_eq!(depth, self.order.len(), "frames must be attached in depth order");
        self.order.push(frame);
    }

    fn detach(&mut self, frame: FrameId) {
        self.order.retain(|attached| *attached != frame);
    }
}

/// Dense, depth-indexed pool of frames.
#[derive(Debug, Default)]
pub struct FramePool {
    frames: Vec<LevelFrame>,
    next_id: FrameId,
}

impl FramePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[LevelFrame] {
        &self.frames
    }

    pub fn get(&self, depth: usize) -> Option<&LevelFrame> {
        self.frames.get(depth)
    }

    pub fn get_mut(&mut self, depth: usize) -> Option<&mut LevelFrame> {
        self.frames.get_mut(depth)
    }

    /// Reuse the frame at `depth`, or create it and attach it to `surface`.
    /// Depths are acquired in order, so creation always extends the pool.
    pub fn acquire(&mut self, depth: usize, surface: &mut dyn FrameSurface) -> &mut LevelFrame {
        if depth == self.frames.len() {
            let id = self.next_id;
            self.next_id += 1;
            log::debug!("🪟 frames: creating frame {} at depth {}", id, depth);
            self.frames.push(LevelFrame::new(id, depth));
            surface.attach(id, depth);
        }
        assert!(
            depth < self.frames.len(),
            "frame depth {} skips past pool of {}",
            depth,
            self.frames.len()
        );
        &mut self.frames[depth]
    }

    /// Drop every frame at or beyond `len`, detaching them from `surface`.
    pub fn truncate(&mut self, len: usize, surface: &mut dyn FrameSurface) {
        while self.frames.len() > len {
            if let Some(frame) = self.frames.pop() {
                log::debug!("🪟 frames: dropping frame {} at depth {}", frame.id, frame.depth);
                surface.detach(frame.id);
            }
        }
    }
}
