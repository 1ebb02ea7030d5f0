use slotmap::{new_key_type, SlotMap};

use crate::page::{ExtractedDocument, Page};

new_key_type! {
    /// Stable handle to a document node inside a `DocumentArena`.
    pub struct NodeId;
}

#[derive(Debug, Clone)]
pub struct DocumentNode {
    pub url: String,
    pub title: String,
    content: Page,
    parent: Option<NodeId>,
    /// Discovery order.
    children: Vec<NodeId>,
    selected_child: Option<NodeId>,
}

impl DocumentNode {
    pub fn content(&self) -> &Page {
        &self.content
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn selected_child(&self) -> Option<NodeId> {
        self.selected_child
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct DocumentArena {
    nodes: SlotMap<NodeId, DocumentNode>,
}

impl DocumentArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fetched document into a detached node. The content is tagged
    /// with `url` so links followed from it can find their way back here.
    pub fn create(&mut self, url: &str, document: ExtractedDocument) -> NodeId {
        let ExtractedDocument { title, mut content } = document;
        content.mark_origin(url);
        self.nodes.insert(DocumentNode {
            url: url.to_string(),
            title,
            content,
            parent: None,
            children: Vec::new(),
            selected_child: None,
        })
    }

    pub fn get(&self, id: NodeId) -> Option<&DocumentNode> {
        self.nodes.get(id)
    }

    /// Access a node that must exist. A dangling id is a logic error.
    pub fn node(&self, id: NodeId) -> &DocumentNode {
        match self.nodes.get(id) {
            Some(node) => node,
            None => panic!("document node {:?} is not in the arena", id),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut DocumentNode {
        match self.nodes.get_mut(id) {
            Some(node) => node,
            None => panic!("document node {:?} is not in the arena", id),
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first, pre-order search of `from` and its descendants.
    pub fn find(&self, from: NodeId, url: &str) -> Option<NodeId> {
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.url == url {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// The direct child of `parent` with the given url.
    pub fn child_by_url(&self, parent: NodeId, url: &str) -> Option<NodeId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|child| self.node(*child).url == url)
    }

    /// Attach `child` below `parent`. The selection is left alone.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        assert!(
            self.node(child).parent.is_none(),
            "node {:?} already has a parent",
            child
        );
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    pub fn set_selected(&mut self, parent: NodeId, child: NodeId) {
        let node = self.node_mut(parent);
        assert!(
            node.children.contains(&child),
            "selected node {:?} is not a child of {:?}",
            child,
            parent
        );
        node.selected_child = Some(child);
    }

    /// Detach `child` from `parent` and free its whole subtree. When the
    /// removed child was selected, the most recently added remaining child
    /// takes over, or nothing when none remain. Returns false when `child`
    /// was not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let node = self.node_mut(parent);
        let Some(position) = node.children.iter().position(|c| *c == child) else {
            return false;
        };
        node.children.remove(position);
        if node.selected_child == Some(child) {
            node.selected_child = node.children.last().copied();
        }
        self.free_subtree(child);
        true
    }

    /// Free a node and all of its descendants. Returns how many were freed.
    pub fn free_subtree(&mut self, id: NodeId) -> usize {
        let mut freed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(next) {
                stack.extend(node.children);
                freed += 1;
            }
        }
        freed
    }

    /// `from` followed by the chain of selected children.
    pub fn active_path(&self, from: NodeId) -> Vec<NodeId> {
        let mut path = vec![from];
        let mut current = self.node(from);
        while let Some(next) = current.selected_child {
            path.push(next);
            current = self.node(next);
        }
        path
    }

    /// Number of nodes in the subtree rooted at `id`, itself included.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        let mut count = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            count += 1;
            stack.extend(self.node(next).children.iter().copied());
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: &str) -> ExtractedDocument {
        ExtractedDocument::new(title, Page::from_paragraphs([format!("{} body", title)]))
    }

    #[test]
    fn test_create_marks_origin() {
        let mut arena = DocumentArena::new();
        let id = arena.create("/A", doc("A"));
        assert_eq!(arena.node(id).content().origin(), Some("/A"));
        assert_eq!(arena.node(id).selected_child(), None);
    }

    #[test]
    fn test_find_searches_descendants_in_order() {
        let mut arena = DocumentArena::new();
        let a = arena.create("/A", doc("A"));
        let b = arena.create("/B", doc("B"));
        let c = arena.create("/C", doc("C"));
        arena.add_child(a, b);
        arena.add_child(b, c);

        assert_eq!(arena.find(a, "/C"), Some(c));
        assert_eq!(arena.find(a, "/A"), Some(a));
        assert_eq!(arena.find(b, "/A"), None);
    }

    #[test]
    fn test_add_child_keeps_selection() {
        let mut arena = DocumentArena::new();
        let a = arena.create("/A", doc("A"));
        let b = arena.create("/B", doc("B"));
        arena.add_child(a, b);
        assert_eq!(arena.node(a).selected_child(), None);
        assert_eq!(arena.active_path(a), vec![a]);

        arena.set_selected(a, b);
        assert_eq!(arena.active_path(a), vec![a, b]);
    }

    #[test]
    #[should_panic(expected = "is not a child")]
    fn test_selecting_a_stranger_panics() {
        let mut arena = DocumentArena::new();
        let a = arena.create("/A", doc("A"));
        let b = arena.create("/B", doc("B"));
        arena.set_selected(a, b);
    }

    #[test]
    fn test_remove_selected_falls_back_to_most_recent() {
        let mut arena = DocumentArena::new();
        let a = arena.create("/A", doc("A"));
        let b = arena.create("/B", doc("B"));
        let c = arena.create("/C", doc("C"));
        let d = arena.create("/D", doc("D"));
        arena.add_child(a, b);
        arena.add_child(a, c);
        arena.add_child(a, d);
        arena.set_selected(a, b);

        // Removing an unselected child leaves the selection alone
        assert!(arena.remove_child(a, c));
        assert_eq!(arena.node(a).selected_child(), Some(b));

        let e = arena.create_for_test("/E");
        arena.add_child(a, e);
        assert!(arena.remove_child(a, b));
        assert_eq!(arena.child_by_url(a, "/E"), Some(e));
        assert_eq!(arena.node(a).selected_child(), Some(e));
        assert_eq!(arena.node(a).children(), &[d, e]);
    }

    #[test]
    fn test_remove_only_child_clears_selection() {
        let mut arena = DocumentArena::new();
        let a = arena.create("/A", doc("A"));
        let b = arena.create("/B", doc("B"));
        arena.add_child(a, b);
        arena.set_selected(a, b);

        assert!(arena.remove_child(a, b));
        assert_eq!(arena.node(a).selected_child(), None);
        assert!(!arena.node(a).has_children());
        assert!(!arena.remove_child(a, b));
    }

    #[test]
    fn test_removal_frees_subtree() {
        let mut arena = DocumentArena::new();
        let a = arena.create("/A", doc("A"));
        let b = arena.create("/B", doc("B"));
        let c = arena.create("/C", doc("C"));
        arena.add_child(a, b);
        arena.add_child(b, c);
        assert_eq!(arena.subtree_size(a), 3);

        arena.remove_child(a, b);
        assert_eq!(arena.len(), 1);
        assert!(!arena.contains(c));
    }

    impl DocumentArena {
        fn create_for_test(&mut self, url: &str) -> NodeId {
            self.create(url, doc(url))
        }
    }
}
