use crate::document::{DocumentArena, DocumentNode, NodeId};
use crate::frame::{AttachedFrames, FramePool, FrameSurface, LevelFrame, TreeAction};
use crate::page::{ExtractedDocument, Page};

/// Origin used for pages opened without a parent page, such as the open-URL
/// prompt.
pub const SEARCH_ORIGIN: &str = "search";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeState {
    Empty,
    Active,
}

/// Where an inserted document ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The url was already open in the active root; nothing was added.
    Existing(NodeId),
    /// Added below the page the link was found on.
    Child(NodeId),
    /// Opened as a new root.
    Root(NodeId),
}

impl InsertOutcome {
    pub fn node(&self) -> NodeId {
        match *self {
            InsertOutcome::Existing(id) | InsertOutcome::Child(id) | InsertOutcome::Root(id) => id,
        }
    }
}

#[derive(Debug)]
pub struct NavigationTree<S: FrameSurface = AttachedFrames> {
    arena: DocumentArena,
    /// Open order.
    roots: Vec<NodeId>,
    active_root: Option<NodeId>,
    /// The first root ever opened. Its tab has no close control.
    primary_root: Option<NodeId>,
    frames: FramePool,
    surface: S,
    scroll_request: Option<usize>,
}

impl Default for NavigationTree<AttachedFrames> {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationTree<AttachedFrames> {
    pub fn new() -> Self {
        Self::with_surface(AttachedFrames::default())
    }
}

impl<S: FrameSurface> NavigationTree<S> {
    pub fn with_surface(surface: S) -> Self {
        Self {
            arena: DocumentArena::new(),
            roots: Vec::new(),
            active_root: None,
            primary_root: None,
            frames: FramePool::new(),
            surface,
            scroll_request: None,
        }
    }

    pub fn state(&self) -> TreeState {
        if self.roots.is_empty() {
            TreeState::Empty
        } else {
            TreeState::Active
        }
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn active_root(&self) -> Option<NodeId> {
        self.active_root
    }

    pub fn arena(&self) -> &DocumentArena {
        &self.arena
    }

    pub fn node(&self, id: NodeId) -> Option<&DocumentNode> {
        self.arena.get(id)
    }

    pub fn page(&self, id: NodeId) -> Option<&Page> {
        self.arena.get(id).map(DocumentNode::content)
    }

    pub fn frames(&self) -> &[LevelFrame] {
        self.frames.frames()
    }

    pub fn frame_mut(&mut self, depth: usize) -> Option<&mut LevelFrame> {
        self.frames.get_mut(depth)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Depth the view should scroll to after the last mutation, if any.
    pub fn take_scroll_request(&mut self) -> Option<usize> {
        self.scroll_request.take()
    }

    /// The active root followed by the chain of selected children. Empty
    /// when no root is open.
    pub fn active_path(&self) -> Vec<NodeId> {
        match (self.active_root, self.roots.is_empty()) {
            (Some(root), false) => self.arena.active_path(root),
            (None, true) => Vec::new(),
            (active, _) => panic!(
                "navigation tree has active root {:?} with {} roots open",
                active,
                self.roots.len()
            ),
        }
    }

    pub fn active_path_urls(&self) -> Vec<String> {
        self.active_path()
            .into_iter()
            .map(|id| self.arena.node(id).url.clone())
            .collect()
    }

    /// Look `url` up anywhere below the active root.
    pub fn find_in_active(&self, url: &str) -> Option<NodeId> {
        self.active_root.and_then(|root| self.arena.find(root, url))
    }

    pub fn root_by_url(&self, url: &str) -> Option<NodeId> {
        self.roots
            .iter()
            .copied()
            .find(|root| self.arena.node(*root).url == url)
    }

    /// Open a document at the top level and make it the active root. A root
    /// with the same url is re-selected instead of duplicated.
    pub fn insert_root(&mut self, document: ExtractedDocument, url: &str) -> NodeId {
        if let Some(existing) = self.root_by_url(url) {
            log::debug!("🌳 tree: root {} already open, selecting it", url);
            self.select_root_id(existing);
            return existing;
        }

        let root = self.arena.create(url, document);
        self.roots.push(root);
        self.primary_root.get_or_insert(root);
        self.active_root = Some(root);
        log::debug!("🌳 tree: opened root {} ({} roots)", url, self.roots.len());

        self.reconcile();
        self.scroll_request = Some(0);
        root
    }

    /// Insert a document reached by following a link on `origin_url`.
    ///
    /// A url already open below the active root is left where it is. A known
    /// origin gets the document as a new, selected child. Anything else,
    /// including `SEARCH_ORIGIN` and origins closed while the fetch was in
    /// flight, opens a new root.
    pub fn insert(
        &mut self,
        document: ExtractedDocument,
        url: &str,
        origin_url: &str,
    ) -> InsertOutcome {
        if let Some(root) = self.active_root {
            if let Some(existing) = self.arena.find(root, url) {
                log::debug!("🌳 tree: {} is already open", url);
                self.reconcile();
                self.request_scroll_to(existing);
                return InsertOutcome::Existing(existing);
            }

            if let Some(parent) = self.arena.find(root, origin_url) {
                let child = self.arena.create(url, document);
                self.arena.add_child(parent, child);
                self.arena.set_selected(parent, child);
                log::debug!("🌳 tree: {} added below {}", url, origin_url);
                self.reconcile();
                self.request_scroll_to(child);
                return InsertOutcome::Child(child);
            }
        }

        if origin_url != SEARCH_ORIGIN {
            log::info!(
                "🌳 tree: origin {} is not open, opening {} as a root",
                origin_url,
                url
            );
        }
        InsertOutcome::Root(self.insert_root(document, url))
    }

    pub fn select_root(&mut self, url: &str) -> bool {
        match self.root_by_url(url) {
            Some(root) => self.select_root_id(root),
            None => false,
        }
    }

    /// Select `child_url` below `parent_url`, both looked up in the active
    /// root.
    pub fn select_child(&mut self, parent_url: &str, child_url: &str) -> bool {
        match self.resolve_pair(parent_url, child_url) {
            Some((parent, child)) => self.select_child_id(parent, child),
            None => false,
        }
    }

    pub fn close_root(&mut self, url: &str) -> bool {
        match self.root_by_url(url) {
            Some(root) => self.close_root_id(root),
            None => false,
        }
    }

    pub fn close_child(&mut self, parent_url: &str, child_url: &str) -> bool {
        match self.resolve_pair(parent_url, child_url) {
            Some((parent, child)) => self.close_child_id(parent, child),
            None => false,
        }
    }

    /// Run a tab action. Actions naming nodes that are gone are ignored.
    pub fn apply(&mut self, action: TreeAction) -> bool {
        match action {
            TreeAction::SelectRoot(root) => self.select_root_id(root),
            TreeAction::SelectChild { parent, child } => self.select_child_id(parent, child),
            TreeAction::CloseRoot(root) => self.close_root_id(root),
            TreeAction::CloseChild { parent, child } => self.close_child_id(parent, child),
        }
    }

    fn resolve_pair(&self, parent_url: &str, child_url: &str) -> Option<(NodeId, NodeId)> {
        let parent = self.find_in_active(parent_url)?;
        let child = self.arena.child_by_url(parent, child_url)?;
        Some((parent, child))
    }

    fn is_child(&self, parent: NodeId, child: NodeId) -> bool {
        self.arena
            .get(parent)
            .map(|node| node.children().contains(&child))
            .unwrap_or(false)
    }

    fn select_root_id(&mut self, root: NodeId) -> bool {
        if !self.roots.contains(&root) {
            log::warn!("🌳 tree: ignoring selection of unknown root {:?}", root);
            return false;
        }
        self.active_root = Some(root);
        self.reconcile();
        self.scroll_request = Some(0);
        true
    }

    fn select_child_id(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.is_child(parent, child) {
            log::warn!("🌳 tree: ignoring selection of {:?} below {:?}", child, parent);
            return false;
        }
        self.arena.set_selected(parent, child);
        self.reconcile();
        self.request_scroll_to(child);
        true
    }

    fn close_root_id(&mut self, root: NodeId) -> bool {
        let Some(position) = self.roots.iter().position(|r| *r == root) else {
            return false;
        };
        self.roots.remove(position);
        let freed = self.arena.free_subtree(root);
        if self.active_root == Some(root) {
            self.active_root = self.roots.last().copied();
        }
        log::debug!(
            "🌳 tree: closed root {:?} ({} documents released, {} roots left)",
            root,
            freed,
            self.roots.len()
        );
        self.reconcile();
        true
    }

    fn close_child_id(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.is_child(parent, child) {
            return false;
        }
        let released = self.arena.subtree_size(child);
        self.arena.remove_child(parent, child);
        log::debug!(
            "🌳 tree: closed {:?} below {:?} ({} documents released)",
            child,
            parent,
            released
        );
        self.reconcile();
        true
    }

    fn request_scroll_to(&mut self, id: NodeId) {
        if let Some(depth) = self.active_path().iter().position(|node| *node == id) {
            self.scroll_request = Some(depth);
        }
    }

    /// Bring the frame pool in line with the active path.
    pub fn reconcile(&mut self) {
        let path = self.active_path();

        if let Some(&top) = path.first() {
            let frame = self.frames.acquire(0, &mut self.surface);
            frame.clear();
            for &root in &self.roots {
                let on_close = (Some(root) != self.primary_root).then_some(TreeAction::CloseRoot(root));
                frame.add_tab(
                    self.arena.node(root).title.clone(),
                    root == top,
                    TreeAction::SelectRoot(root),
                    on_close,
                );
            }
            frame.set_content(top);
        }

        for depth in 1..path.len() {
            let parent = path[depth - 1];
            let frame = self.frames.acquire(depth, &mut self.surface);
            frame.clear();
            for &child in self.arena.node(parent).children() {
                let action = TreeAction::SelectChild { parent, child };
                frame.add_tab(
                    self.arena.node(child).title.clone(),
                    child == path[depth],
                    action,
                    Some(TreeAction::CloseChild { parent, child }),
                );
            }
            frame.set_content(path[depth]);
        }

        self.frames.truncate(path.len(), &mut self.surface);
        log::debug!(
            "🌳 tree: reconciled {} frames for {} documents",
            path.len(),
            self.arena.len()
        );
    }
}
