use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

use crate::app::App;
use crate::async_task::Task;
use crate::error::Result;

pub mod frames;
pub mod prompt;

pub use frames::*;
pub use prompt::*;

pub fn handle_event(
    event: Event,
    app: &mut App,
    async_sender: &mpsc::Sender<Task>,
) -> Result<bool> { // Returns true if UI needs update
    match event {
        Event::Key(key) => {
            if key.kind == KeyEventKind::Release {
                return Ok(false);
            }

            if app.ui.prompt.is_some() {
                return handle_prompt_event(app, key.code, async_sender);
            }

            let keys = &app.config.keybindings;
            match key.code {
                // Ctrl+L to force screen redraw
                KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    app.ui.force_redraw = true;
                    app.ui.status_message = "Screen refreshed".to_string();
                    return Ok(true);
                }
                KeyCode::Char(c) if c == keys.quit => {
                    app.should_quit = true;
                    return Ok(false); // No render needed when quitting
                }
                KeyCode::Esc => {
                    app.should_quit = true;
                    return Ok(false);
                }
                KeyCode::Char(c) if c == keys.open_url => {
                    app.open_prompt();
                    return Ok(true);
                }
                _ => {}
            }

            handle_frame_event(app, key.code, key.modifiers, async_sender)
        }
        Event::Resize(_, _) => Ok(true),
        _ => Ok(false),
    }
}
