use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use crate::app::App;
use crate::async_task::Task;
use crate::error::Result;

const PAGE_SCROLL: i32 = 10;

/// Keys acting on the level frames: focus, tabs, links and scrolling.
pub fn handle_frame_event(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    async_sender: &mpsc::Sender<Task>,
) -> Result<bool> {
    let keys = app.config.keybindings.clone();

    let changed = match code {
        KeyCode::Up => app.focus_up(),
        KeyCode::Down => app.focus_down(),
        KeyCode::Left => app.switch_tab(-1),
        KeyCode::Right => app.switch_tab(1),
        KeyCode::Tab if modifiers.contains(KeyModifiers::SHIFT) => app.select_link(false),
        KeyCode::Tab => app.select_link(true),
        KeyCode::BackTab => app.select_link(false),
        KeyCode::Enter => {
            app.follow_link(async_sender);
            true
        }
        KeyCode::PageDown => app.scroll(PAGE_SCROLL),
        KeyCode::PageUp => app.scroll(-PAGE_SCROLL),
        KeyCode::Home => app.scroll(-i32::from(u16::MAX)),
        KeyCode::Char(c) if c == keys.scroll_down => app.scroll(1),
        KeyCode::Char(c) if c == keys.scroll_up => app.scroll(-1),
        KeyCode::Char(c) if c == keys.close_tab => {
            app.close_active_tab();
            true
        }
        _ => false,
    };

    Ok(changed)
}
