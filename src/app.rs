use tokio::sync::mpsc;

use crate::async_task::Task;
use crate::config::Config;
use crate::frame::LevelFrame;
use crate::links::{self, LinkActivation};
use crate::page::{ExtractedDocument, Page};
use crate::tree::{InsertOutcome, NavigationTree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub status_message: String,
    pub force_redraw: bool,
    /// Depth of the frame keyboard input goes to.
    pub focused_depth: usize,
    /// Input of the open-url prompt while it is shown.
    pub prompt: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            status_message: "Ready".to_string(),
            force_redraw: false,
            focused_depth: 0,
            prompt: None,
        }
    }
}

pub struct App {
    pub tree: NavigationTree,
    pub ui: UiState,
    pub config: Config,
    pub should_quit: bool,
    pending_fetches: usize,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            tree: NavigationTree::new(),
            ui: UiState::default(),
            config,
            should_quit: false,
            pending_fetches: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending_fetches > 0
    }

    pub fn pending_fetches(&self) -> usize {
        self.pending_fetches
    }

    /// Queue a fetch for `activation`. Returns false when the worker is gone
    /// or its queue is full.
    pub fn start_fetch(&mut self, activation: LinkActivation, sender: &mpsc::Sender<Task>) -> bool {
        let destination = activation.destination.clone();
        log::debug!("📤 app: requesting {} (from {})", destination, activation.origin);
        match sender.try_send(activation.into_task()) {
            Ok(()) => {
                self.pending_fetches += 1;
                self.ui.status_message = format!("Loading {}", destination);
                true
            }
            Err(e) => {
                log::error!("📤 app: failed to queue {}: {}", destination, e);
                self.ui.status_message = format!("Failed to load {}: {}", destination, e);
                false
            }
        }
    }

    pub fn finish_fetch(&mut self) {
        self.pending_fetches = self.pending_fetches.saturating_sub(1);
    }

    /// Insert a fetched document below the page it was found on.
    pub fn insert_document(&mut self, url: &str, origin: &str, document: ExtractedDocument) {
        let title = document.title.clone();
        let outcome = self.tree.insert(document, url, origin);
        self.ui.status_message = match outcome {
            InsertOutcome::Existing(id) => {
                let title = self.tree.node(id).map(|node| node.title.as_str()).unwrap_or(url);
                format!("Already open: {}", title)
            }
            InsertOutcome::Child(_) | InsertOutcome::Root(_) => format!("Opened {}", title),
        };
        self.sync_focus();
    }

    /// Follow the tree's scroll request and keep focus on a live frame.
    pub fn sync_focus(&mut self) {
        if let Some(depth) = self.tree.take_scroll_request() {
            self.ui.focused_depth = depth;
        }
        let frames = self.tree.frames().len();
        self.ui.focused_depth = self.ui.focused_depth.min(frames.saturating_sub(1));
    }

    pub fn focused_frame(&self) -> Option<&LevelFrame> {
        self.tree.frames().get(self.ui.focused_depth)
    }

    fn focused_frame_mut(&mut self) -> Option<&mut LevelFrame> {
        self.tree.frame_mut(self.ui.focused_depth)
    }

    /// The page shown in the focused frame.
    pub fn focused_page(&self) -> Option<&Page> {
        let node = self.focused_frame()?.content()?;
        self.tree.page(node)
    }

    pub fn focus_up(&mut self) -> bool {
        if self.ui.focused_depth == 0 {
            return false;
        }
        self.ui.focused_depth -= 1;
        true
    }

    pub fn focus_down(&mut self) -> bool {
        if self.ui.focused_depth + 1 >= self.tree.frames().len() {
            return false;
        }
        self.ui.focused_depth += 1;
        true
    }

    /// Move the focused frame's selection `delta` tabs over.
    pub fn switch_tab(&mut self, delta: isize) -> bool {
        let Some(frame) = self.focused_frame() else {
            return false;
        };
        let Some(active) = frame.active_tab() else {
            return false;
        };
        let target = active as isize + delta;
        if target < 0 || target as usize >= frame.tabs().len() {
            return false;
        }

        let action = frame.tabs()[target as usize].on_select;
        let switched = self.tree.apply(action);
        if switched {
            let label = &self.tree.frames()[self.ui.focused_depth].tabs()[target as usize].label;
            self.ui.status_message = format!("Switched to {}", label);
        }
        self.sync_focus();
        switched
    }

    /// Close the focused frame's active tab.
    pub fn close_active_tab(&mut self) -> bool {
        let Some(tab) = self
            .focused_frame()
            .and_then(|frame| frame.active_tab().map(|index| frame.tabs()[index].clone()))
        else {
            return false;
        };

        let Some(action) = tab.on_close else {
            self.ui.status_message = format!("{} cannot be closed", tab.label);
            return false;
        };

        let closed = self.tree.apply(action);
        if closed {
            self.ui.status_message = format!("Closed {}", tab.label);
        }
        self.sync_focus();
        closed
    }

    /// Move the link highlight in the focused frame, wrapping around.
    pub fn select_link(&mut self, forward: bool) -> bool {
        let Some(count) = self.focused_page().map(|page| page.links().len()) else {
            return false;
        };
        if count == 0 {
            self.ui.status_message = "No links on this page".to_string();
            return false;
        }

        let next = match self.focused_frame().and_then(|frame| frame.selected_link) {
            None if forward => 0,
            None => count - 1,
            Some(current) if forward => (current + 1) % count,
            Some(current) => (current + count - 1) % count,
        };
        let href = self
            .focused_page()
            .and_then(|page| page.link(next))
            .map(|link| link.href.clone());

        if let Some(frame) = self.focused_frame_mut() {
            frame.selected_link = Some(next);
            frame.reveal_link = true;
        }
        if let Some(href) = href {
            self.ui.status_message = href;
        }
        true
    }

    /// Fetch the highlighted link of the focused frame.
    pub fn follow_link(&mut self, sender: &mpsc::Sender<Task>) -> bool {
        let Some(link) = self.focused_frame().and_then(|frame| frame.selected_link) else {
            self.ui.status_message = "No link selected".to_string();
            return false;
        };
        match links::activate_link(&self.tree, self.ui.focused_depth, link) {
            Some(activation) => self.start_fetch(activation, sender),
            None => false,
        }
    }

    pub fn scroll(&mut self, delta: i32) -> bool {
        let Some(frame) = self.focused_frame_mut() else {
            return false;
        };
        let before = frame.scroll;
        let target = (i32::from(frame.scroll) + delta).clamp(0, i32::from(u16::MAX));
        frame.scroll = u16::try_from(target).unwrap_or(u16::MAX);
        frame.scroll != before
    }

    pub fn open_prompt(&mut self) {
        self.ui.prompt = Some(String::new());
        self.ui.status_message = "Enter a page name or url".to_string();
    }

    pub fn cancel_prompt(&mut self) {
        self.ui.prompt = None;
        self.ui.status_message = "Ready".to_string();
    }

    /// Submit the open-url prompt. The page opens as a new root once fetched.
    pub fn submit_prompt(&mut self, sender: &mpsc::Sender<Task>) -> bool {
        let Some(input) = self.ui.prompt.take() else {
            return false;
        };
        match links::search_activation(&input, &self.config.start_url) {
            Some(activation) => self.start_fetch(activation, sender),
            None => {
                self.ui.status_message = format!("Cannot open \"{}\"", input.trim());
                false
            }
        }
    }
}
