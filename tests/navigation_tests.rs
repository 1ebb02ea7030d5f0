use infinite_wiki::frame::{FrameSurface, TreeAction};
use infinite_wiki::page::{ExtractedDocument, Page};
use infinite_wiki::tree::{InsertOutcome, NavigationTree, TreeState, SEARCH_ORIGIN};
use proptest::prelude::*;

const URLS: &[&str] = &["/P0", "/P1", "/P2", "/P3", "/P4", "/P5", "/P6", "/P7"];

fn doc(url: &str) -> ExtractedDocument {
    ExtractedDocument::new(
        format!("Title of {}", url),
        Page::from_paragraphs([format!("Body of {}", url)]),
    )
}

#[derive(Debug, Clone)]
enum Op {
    /// Insert `URLS[url]` as if found on `URLS[origin]`, or from search.
    Insert { url: usize, origin: Option<usize> },
    InsertRoot { url: usize },
    /// Choose tab `tab` in the frame at `depth`.
    SelectTab { depth: usize, tab: usize },
    /// Close tab `tab` in the frame at `depth`, when it can be closed.
    CloseTab { depth: usize, tab: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let url = 0..URLS.len();
    prop_oneof![
        4 => (url.clone(), proptest::option::weighted(0.8, 0..URLS.len()))
            .prop_map(|(url, origin)| Op::Insert { url, origin }),
        1 => url.prop_map(|url| Op::InsertRoot { url }),
        2 => (0..6usize, 0..6usize).prop_map(|(depth, tab)| Op::SelectTab { depth, tab }),
        2 => (0..6usize, 0..6usize).prop_map(|(depth, tab)| Op::CloseTab { depth, tab }),
    ]
}

fn tab_action(tree: &NavigationTree, depth: usize, tab: usize, close: bool) -> Option<TreeAction> {
    let frames = tree.frames();
    if frames.is_empty() {
        return None;
    }
    let frame = &frames[depth % frames.len()];
    let tab = frame.tabs().get(tab % frame.tabs().len().max(1))?;
    if close {
        tab.on_close
    } else {
        Some(tab.on_select)
    }
}

fn apply(tree: &mut NavigationTree, op: &Op) {
    match *op {
        Op::Insert { url, origin } => {
            let origin = origin.map(|o| URLS[o]).unwrap_or(SEARCH_ORIGIN);
            tree.insert(doc(URLS[url]), URLS[url], origin);
        }
        Op::InsertRoot { url } => {
            tree.insert_root(doc(URLS[url]), URLS[url]);
        }
        Op::SelectTab { depth, tab } => {
            if let Some(action) = tab_action(tree, depth, tab, false) {
                assert!(tree.apply(action));
            }
        }
        Op::CloseTab { depth, tab } => {
            if let Some(action) = tab_action(tree, depth, tab, true) {
                assert!(tree.apply(action));
            }
        }
    }
}

fn check_invariants<S: FrameSurface>(tree: &NavigationTree<S>) {
    let path = tree.active_path();

    // Roots and active root agree
    assert_eq!(tree.roots().is_empty(), tree.active_root().is_none());
    assert_eq!(tree.state() == TreeState::Empty, path.is_empty());

    // Path consistency
    if let Some(&first) = path.first() {
        assert_eq!(Some(first), tree.active_root());
    }
    for pair in path.windows(2) {
        let parent = tree.node(pair[0]).unwrap();
        assert_eq!(parent.selected_child(), Some(pair[1]));
        assert!(parent.children().contains(&pair[1]));
    }
    if let Some(&last) = path.last() {
        assert_eq!(tree.node(last).unwrap().selected_child(), None);
    }

    // Frame-count invariant and frame contents
    assert_eq!(tree.frames().len(), path.len());
    for (depth, frame) in tree.frames().iter().enumerate() {
        assert_eq!(frame.depth(), depth);
        assert_eq!(frame.content(), Some(path[depth]));
        let active = frame.active_tab().expect("every frame has an active tab");
        assert_eq!(frame.tabs().iter().filter(|tab| tab.active).count(), 1);
        let expected = if depth == 0 {
            TreeAction::SelectRoot(path[0])
        } else {
            TreeAction::SelectChild {
                parent: path[depth - 1],
                child: path[depth],
            }
        };
        assert_eq!(frame.tabs()[active].on_select, expected);
    }

    // Every node has a selection that is one of its children
    for &root in tree.roots() {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = tree.node(id).unwrap();
            if let Some(selected) = node.selected_child() {
                assert!(node.children().contains(&selected));
            }
            if !node.has_children() {
                assert_eq!(node.selected_child(), None);
            }
            stack.extend(node.children().iter().copied());
        }
    }
}

proptest! {
    #[test]
    fn prop_tree_stays_consistent(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let mut tree = NavigationTree::new();
        for op in &ops {
            apply(&mut tree, op);
            check_invariants(&tree);
            prop_assert_eq!(tree.surface().len(), tree.frames().len());
        }
    }

    #[test]
    fn prop_insert_is_idempotent(ops in proptest::collection::vec(op_strategy(), 1..30), url in 0..URLS.len()) {
        let mut tree = NavigationTree::new();
        for op in &ops {
            apply(&mut tree, op);
        }
        let Some(root) = tree.active_root() else {
            return Ok(());
        };
        let origin = tree.node(root).unwrap().url.clone();

        let first = tree.insert(doc(URLS[url]), URLS[url], &origin);
        let size = tree.arena().len();
        let path = tree.active_path();
        let second = tree.insert(doc(URLS[url]), URLS[url], &origin);

        prop_assert_eq!(second, InsertOutcome::Existing(first.node()));
        prop_assert_eq!(tree.arena().len(), size);
        prop_assert_eq!(tree.active_path(), path);
    }
}

#[test]
fn test_scenario_branch_and_close() {
    let mut tree = NavigationTree::new();
    tree.insert_root(doc("/A"), "/A");
    tree.insert(doc("/B"), "/B", "/A");
    tree.insert(doc("/C"), "/C", "/B");
    assert_eq!(tree.active_path_urls(), vec!["/A", "/B", "/C"]);

    tree.select_child("/A", "/B");
    assert_eq!(tree.active_path_urls(), vec!["/A", "/B", "/C"]);

    tree.close_child("/B", "/C");
    assert_eq!(tree.active_path_urls(), vec!["/A", "/B"]);
    tree.close_child("/A", "/B");
    assert_eq!(tree.active_path_urls(), vec!["/A"]);
    check_invariants(&tree);
}

#[test]
fn test_scenario_roots_from_search() {
    let mut tree = NavigationTree::new();
    tree.insert_root(doc("/R1"), "/R1");
    tree.insert(doc("/R2"), "/R2", SEARCH_ORIGIN);
    assert_eq!(tree.active_path_urls(), vec!["/R2"]);

    tree.close_root("/R2");
    assert_eq!(tree.active_path_urls(), vec!["/R1"]);
    check_invariants(&tree);
}

#[test]
fn test_closure_fallback_picks_most_recent_sibling() {
    let mut tree = NavigationTree::new();
    tree.insert_root(doc("/A"), "/A");
    tree.insert(doc("/B"), "/B", "/A");
    tree.insert(doc("/C"), "/C", "/A");
    tree.insert(doc("/D"), "/D", "/A");
    tree.select_child("/A", "/B");

    tree.close_child("/A", "/B");
    assert_eq!(tree.active_path_urls(), vec!["/A", "/D"]);
    tree.close_child("/A", "/D");
    assert_eq!(tree.active_path_urls(), vec!["/A", "/C"]);
    tree.close_child("/A", "/C");
    assert_eq!(tree.active_path_urls(), vec!["/A"]);
}

#[test]
fn test_urls_are_unique_per_root_only() {
    let mut tree = NavigationTree::new();
    tree.insert_root(doc("/R1"), "/R1");
    tree.insert(doc("/X"), "/X", "/R1");
    tree.insert_root(doc("/R2"), "/R2");

    // /X is open under R1, not under the active R2
    let outcome = tree.insert(doc("/X"), "/X", "/R2");
    assert!(matches!(outcome, InsertOutcome::Child(_)));
    assert_eq!(tree.arena().len(), 4);
}
