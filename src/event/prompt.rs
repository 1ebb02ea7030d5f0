use crossterm::event::KeyCode;
use tokio::sync::mpsc;

use crate::app::App;
use crate::async_task::Task;
use crate::error::Result;

/// Keys while the open-url prompt is shown. Everything typed goes into the
/// prompt.
pub fn handle_prompt_event(
    app: &mut App,
    code: KeyCode,
    async_sender: &mpsc::Sender<Task>,
) -> Result<bool> {
    match code {
        KeyCode::Char(c) => {
            if let Some(input) = app.ui.prompt.as_mut() {
                input.push(c);
            }
        }
        KeyCode::Backspace => {
            if let Some(input) = app.ui.prompt.as_mut() {
                input.pop();
            }
        }
        KeyCode::Enter => {
            app.submit_prompt(async_sender);
        }
        KeyCode::Esc => app.cancel_prompt(),
        _ => return Ok(false),
    }
    Ok(true)
}
