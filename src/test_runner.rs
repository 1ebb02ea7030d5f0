use crate::app::App;
use crate::async_task::{run_worker, Task, TaskResult};
use crate::error::{Result, WikiError};
use crate::event::handle_event;
use crate::fetch::DocumentSource;
use crate::main_lib::{handle_task_result, open_start_page};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Test file format for headless testing
///
/// Format is a simple text file where each line represents a command:
/// - `key:<keyname>` - Send a key event (e.g., `key:tab`, `key:enter`, `key:shift+tab`)
/// - `char:<c>` - Send a character (e.g., `char:o`, `char:x`)
/// - `open:<url>` - Open a page as a new root, like the open-url prompt
/// - `wait` - Wait for all fetches to settle
/// - `wait:<ms>` - Wait for specific duration in milliseconds
/// - `assert:<property>:<value>` - Assert application state
/// - `screenshot:<file>` - Compare the rendered screen with a file
/// - `# comment` - Comments (ignored)
/// - `immediate` - Set immediate mode (don't wait between commands)
/// - `settle_mode` - Set settle mode (wait between commands)
///
/// Examples:
/// ```text
/// open:https://wiki.test/wiki/A
/// key:tab
/// key:enter
/// assert:path:https://wiki.test/wiki/A,https://wiki.test/wiki/B
/// char:x
/// assert:frames:1
/// ```

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCommand {
    pub command_type: CommandType,
    pub value: String,
    pub immediate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandType {
    Key,
    Char,
    Open,
    Wait,
    Assert,
    Screenshot,
}

#[derive(Debug, Clone)]
pub struct TestScript {
    pub commands: Vec<TestCommand>,
}

#[derive(Debug, Clone)]
pub struct TestRunner {
    pub script: TestScript,
    pub current_command: usize,
    pub max_settle_time: Duration,
    pub overwrite_mode: bool,
    pub screenshot_base_dir: Option<PathBuf>,
    pub screen_size: (u16, u16),
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunner {
    pub fn new() -> Self {
        TestRunner {
            script: TestScript {
                commands: Vec::new(),
            },
            current_command: 0,
            max_settle_time: Duration::from_secs(5),
            overwrite_mode: false,
            screenshot_base_dir: None,
            screen_size: (100, 30),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_string(&content)
    }

    pub fn from_string(content: &str) -> Result<Self> {
        let mut commands = Vec::new();
        let mut immediate_mode = false;

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Parse special directives
            if line == "immediate" {
                immediate_mode = true;
                continue;
            }
            if line == "settle_mode" {
                immediate_mode = false;
                continue;
            }

            let (command_type, value) = if line == "wait" || line == "settle" {
                (CommandType::Wait, "")
            } else {
                match line.split_once(':') {
                    Some(("key", value)) => (CommandType::Key, value),
                    Some(("char", value)) => (CommandType::Char, value),
                    Some(("open", value)) => (CommandType::Open, value),
                    Some(("wait", value)) => (CommandType::Wait, value),
                    Some(("assert", value)) => (CommandType::Assert, value),
                    Some(("screenshot", value)) => (CommandType::Screenshot, value),
                    _ => {
                        return Err(WikiError::Script(format!(
                            "Invalid command on line {}: {}",
                            line_num + 1,
                            line
                        )))
                    }
                }
            };

            commands.push(TestCommand {
                // Wait commands always wait
                immediate: immediate_mode && command_type != CommandType::Wait,
                command_type,
                value: value.to_string(),
            });
        }

        Ok(TestRunner {
            script: TestScript { commands },
            ..TestRunner::new()
        })
    }

    /// Run the script against a worker serving pages from `source`.
    pub async fn run_with_source<S: DocumentSource>(
        &mut self,
        app: &mut App,
        source: Arc<S>,
    ) -> Result<TestResult> {
        let (task_sender, task_receiver) = mpsc::channel::<Task>(32);
        let (result_sender, result_receiver) = mpsc::channel::<TaskResult>(32);
        let cancel = CancellationToken::new();
        let worker_handle = tokio::spawn(run_worker(
            task_receiver,
            result_sender,
            source,
            cancel.clone(),
        ));

        let result = self.run(app, &task_sender, result_receiver).await;

        cancel.cancel();
        if let Err(e) = worker_handle.await {
            log::warn!("🧪 Worker did not shut down cleanly: {}", e);
        }
        result
    }

    pub async fn run(
        &mut self,
        app: &mut App,
        task_sender: &mpsc::Sender<Task>,
        mut task_receiver: mpsc::Receiver<TaskResult>,
    ) -> Result<TestResult> {
        let start_time = Instant::now();
        let mut events_processed = 0;
        let mut assertions_passed = 0;
        let mut assertions_failed = 0;
        let mut errors = Vec::new();

        log::info!(
            "🧪 Starting test run with {} commands",
            self.script.commands.len()
        );

        let commands = self.script.commands.clone();
        for (index, command) in commands.iter().enumerate() {
            self.current_command = index;
            log::debug!("🧪 Executing command {}: {:?}", index, command);

            match &command.command_type {
                CommandType::Key => {
                    let event = parse_key_event(&command.value)?;
                    match handle_event(event, app, task_sender) {
                        Ok(_) => events_processed += 1,
                        Err(e) => errors.push(format!("Key event failed: {}", e)),
                    }
                }
                CommandType::Char => {
                    let char_val = command
                        .value
                        .chars()
                        .next()
                        .ok_or_else(|| WikiError::Script("Empty character command".to_string()))?;
                    let event =
                        Event::Key(KeyEvent::new(KeyCode::Char(char_val), KeyModifiers::NONE));
                    match handle_event(event, app, task_sender) {
                        Ok(_) => events_processed += 1,
                        Err(e) => errors.push(format!("Character event failed: {}", e)),
                    }
                }
                CommandType::Open => {
                    if !open_start_page(app, task_sender, &command.value) {
                        errors.push(format!("Could not open {}", command.value));
                    }
                }
                CommandType::Wait => {
                    if command.value.is_empty() {
                        if let Err(e) = self.wait_for_settlement(app, &mut task_receiver).await {
                            errors.push(format!("Settlement wait failed: {}", e));
                        }
                    } else {
                        let ms: u64 = command.value.parse().map_err(|_| {
                            WikiError::Script(format!("Invalid wait duration: {}", command.value))
                        })?;
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        drain_results(app, &mut task_receiver);
                    }
                }
                CommandType::Assert => match self.evaluate_assertion(app, &command.value) {
                    Ok(true) => {
                        assertions_passed += 1;
                        log::debug!("🧪 Assertion passed: {}", command.value);
                    }
                    Ok(false) => {
                        assertions_failed += 1;
                        errors.push(format!("Assertion failed: {}", command.value));
                    }
                    Err(e) => {
                        assertions_failed += 1;
                        errors.push(format!("Assertion error: {}", e));
                    }
                },
                CommandType::Screenshot => {
                    if let Err(e) = self.take_screenshot(app, &command.value) {
                        errors.push(format!("Screenshot failed: {}", e));
                    }
                }
            }

            // Wait for settlement unless in immediate mode or this is a wait command
            if !command.immediate && command.command_type != CommandType::Wait {
                if let Err(e) = self.wait_for_settlement(app, &mut task_receiver).await {
                    errors.push(format!("Post-command settlement failed: {}", e));
                }
            }
        }

        let duration = start_time.elapsed();
        log::info!("🧪 Test run completed in {:?}", duration);

        let success = assertions_failed == 0 && errors.is_empty();
        Ok(TestResult {
            duration,
            events_processed,
            assertions_passed,
            assertions_failed,
            errors,
            success,
        })
    }

    async fn wait_for_settlement(
        &self,
        app: &mut App,
        task_receiver: &mut mpsc::Receiver<TaskResult>,
    ) -> Result<()> {
        let start = Instant::now();

        // Wait for in-flight fetches and apply their results
        while app.is_loading() && start.elapsed() < self.max_settle_time {
            match timeout(Duration::from_millis(10), task_receiver.recv()).await {
                Ok(Some(task_result)) => {
                    log::debug!("🧪 Processing result during settlement: {}", task_result.url());
                    handle_task_result(app, task_result);
                }
                Ok(None) => break, // Channel closed
                Err(_) => {}
            }
        }

        drain_results(app, task_receiver);

        if app.is_loading() {
            return Err(WikiError::Script(format!(
                "Settlement timeout: {} fetches still pending",
                app.pending_fetches()
            )));
        }

        Ok(())
    }

    pub fn evaluate_assertion(&self, app: &mut App, assertion: &str) -> Result<bool> {
        // Values may contain ':' (urls), so only the first one separates
        let (property, expected) = assertion.split_once(':').ok_or_else(|| {
            WikiError::Script("Assertion must be in format 'property:value'".to_string())
        })?;

        match property {
            "should_quit" => Ok(app.should_quit == parse_value::<bool>(property, expected)?),
            "is_loading" => Ok(app.is_loading() == parse_value::<bool>(property, expected)?),
            "status_contains" => Ok(app.ui.status_message.contains(expected)),
            "frames" => Ok(app.tree.frames().len() == parse_value::<usize>(property, expected)?),
            "roots" => Ok(app.tree.roots().len() == parse_value::<usize>(property, expected)?),
            "focused_depth" => {
                Ok(app.ui.focused_depth == parse_value::<usize>(property, expected)?)
            }
            "path" => {
                let actual = app.tree.active_path_urls().join(",");
                Ok(actual == expected)
            }
            "path_titles" => {
                let actual: Vec<String> = app
                    .tree
                    .active_path()
                    .into_iter()
                    .filter_map(|id| app.tree.node(id).map(|node| node.title.clone()))
                    .collect();
                Ok(actual.join(" > ") == expected)
            }
            "active_root" => {
                let actual = app
                    .tree
                    .active_root()
                    .and_then(|id| app.tree.node(id))
                    .map(|node| node.url.clone());
                match actual {
                    Some(url) => Ok(url == expected),
                    None => Ok(expected == "none" || expected.is_empty()),
                }
            }
            "tabs" => {
                let (depth, labels) = expected.split_once(':').ok_or_else(|| {
                    WikiError::Script("tabs expects '<depth>:<label>,<label>'".to_string())
                })?;
                let depth = parse_value::<usize>(property, depth)?;
                let actual = app
                    .tree
                    .frames()
                    .get(depth)
                    .map(|frame| {
                        frame
                            .tabs()
                            .iter()
                            .map(|tab| tab.label.as_str())
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .unwrap_or_default();
                Ok(actual == labels)
            }
            "screen_contains" => {
                let (width, height) = self.screen_size;
                let screen = crate::screenshot::render_to_string(app, width, height)?;
                Ok(screen.contains(expected))
            }
            _ => Err(WikiError::Script(format!(
                "Unknown assertion property: {}",
                property
            ))),
        }
    }

    fn take_screenshot(&self, app: &mut App, filename: &str) -> Result<()> {
        let (width, height) = self.screen_size;
        let content = crate::screenshot::render_to_string(app, width, height)?;

        // Resolve the final screenshot path
        let final_path = match &self.screenshot_base_dir {
            Some(base_dir) => base_dir.join(filename),
            None => PathBuf::from(filename),
        };
        let final_filename = final_path.to_string_lossy();

        if self.overwrite_mode {
            std::fs::write(&final_path, content)?;
            println!("📸 Screenshot saved to: {}", final_filename);
            return Ok(());
        }

        match std::fs::read_to_string(&final_path) {
            Ok(existing_content) if existing_content == content => {
                println!("✅ Screenshot verification passed: {}", final_filename);
                Ok(())
            }
            Ok(_) => Err(WikiError::Script(format!(
                "❌ Screenshot verification failed: {}. Content differs from expected. Use --overwrite to update.",
                final_filename
            ))),
            Err(_) => Err(WikiError::Script(format!(
                "❌ Screenshot verification failed: {} does not exist. Use --overwrite to create.",
                final_filename
            ))),
        }
    }
}

fn drain_results(app: &mut App, task_receiver: &mut mpsc::Receiver<TaskResult>) {
    while let Ok(task_result) = task_receiver.try_recv() {
        log::debug!("🧪 Processing remaining result: {}", task_result.url());
        handle_task_result(app, task_result);
    }
}

fn parse_value<T: std::str::FromStr>(property: &str, value: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| {
        WikiError::Script(format!("{} does not accept the value \"{}\"", property, value))
    })
}

pub fn parse_key_event(key_str: &str) -> Result<Event> {
    let lower = key_str.to_lowercase();
    let (modifiers, name) = if let Some(rest) = lower.strip_prefix("ctrl+") {
        (KeyModifiers::CONTROL, rest)
    } else if let Some(rest) = lower.strip_prefix("shift+") {
        (KeyModifiers::SHIFT, rest)
    } else {
        (KeyModifiers::NONE, lower.as_str())
    };

    let key_code = match name {
        "tab" if modifiers == KeyModifiers::SHIFT => KeyCode::BackTab,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "enter" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "space" => KeyCode::Char(' '),
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        single_char => {
            let mut chars = single_char.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return Err(WikiError::Script(format!("Unknown key: {}", key_str))),
            }
        }
    };

    Ok(Event::Key(KeyEvent::new(key_code, modifiers)))
}

#[derive(Debug, Clone)]
pub struct TestResult {
    pub duration: Duration,
    pub events_processed: usize,
    pub assertions_passed: usize,
    pub assertions_failed: usize,
    pub errors: Vec<String>,
    pub success: bool,
}

impl TestResult {
    pub fn print_summary(&self) {
        println!("🧪 Test Results:");
        println!("   Duration: {:?}", self.duration);
        println!("   Events processed: {}", self.events_processed);
        println!("   Assertions passed: {}", self.assertions_passed);
        println!("   Assertions failed: {}", self.assertions_failed);

        if !self.errors.is_empty() {
            println!("   Errors:");
            for error in &self.errors {
                println!("     - {}", error);
            }
        }

        if self.success {
            println!("   Status: ✅ PASSED");
        } else {
            println!("   Status: ❌ FAILED");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::page::{ExtractedDocument, Page};

    #[test]
    fn test_parse_simple_script() {
        let content = r#"
# Test script
open:https://wiki.test/wiki/A
key:down
char:x
wait:100
assert:path:https://wiki.test/wiki/A
"#;

        let runner = TestRunner::from_string(content).unwrap();
        assert_eq!(runner.script.commands.len(), 5);

        assert_eq!(runner.script.commands[0].command_type, CommandType::Open);
        assert_eq!(runner.script.commands[0].value, "https://wiki.test/wiki/A");

        assert_eq!(runner.script.commands[1].command_type, CommandType::Key);
        assert_eq!(runner.script.commands[1].value, "down");

        assert_eq!(runner.script.commands[2].command_type, CommandType::Char);
        assert_eq!(runner.script.commands[3].command_type, CommandType::Wait);
        assert_eq!(runner.script.commands[3].value, "100");

        assert_eq!(runner.script.commands[4].command_type, CommandType::Assert);
        assert_eq!(runner.script.commands[4].value, "path:https://wiki.test/wiki/A");
    }

    #[test]
    fn test_parse_immediate_mode() {
        let content = r#"
key:down
immediate
key:up
wait
key:down
settle_mode
key:enter
"#;

        let runner = TestRunner::from_string(content).unwrap();
        assert_eq!(runner.script.commands.len(), 5);

        assert!(!runner.script.commands[0].immediate);
        assert!(runner.script.commands[1].immediate);
        assert!(!runner.script.commands[2].immediate); // Wait always waits
        assert!(runner.script.commands[3].immediate);
        assert!(!runner.script.commands[4].immediate);
    }

    #[test]
    fn test_invalid_command_is_rejected() {
        let result = TestRunner::from_string("jump:somewhere");
        assert!(matches!(result, Err(WikiError::Script(_))));
    }

    #[test]
    fn test_parse_key_events() {
        let tab_event = parse_key_event("tab").unwrap();
        assert!(matches!(tab_event, Event::Key(KeyEvent { code: KeyCode::Tab, .. })));

        let back_tab = parse_key_event("shift+tab").unwrap();
        assert!(matches!(back_tab, Event::Key(KeyEvent { code: KeyCode::BackTab, .. })));

        let ctrl_l = parse_key_event("ctrl+l").unwrap();
        assert!(matches!(
            ctrl_l,
            Event::Key(KeyEvent { code: KeyCode::Char('l'), modifiers: KeyModifiers::CONTROL, .. })
        ));

        assert!(parse_key_event("hyperspace").is_err());
    }

    #[test]
    fn test_assertion_evaluation() {
        let mut app = App::new(Config::default());
        app.insert_document(
            "https://wiki.test/wiki/A",
            "search",
            ExtractedDocument::new("A", Page::from_paragraphs(["a"])),
        );
        app.insert_document(
            "https://wiki.test/wiki/B",
            "https://wiki.test/wiki/A",
            ExtractedDocument::new("B", Page::from_paragraphs(["b"])),
        );

        let runner = TestRunner::new();
        assert!(runner
            .evaluate_assertion(&mut app, "path:https://wiki.test/wiki/A,https://wiki.test/wiki/B")
            .unwrap());
        assert!(runner.evaluate_assertion(&mut app, "path_titles:A > B").unwrap());
        assert!(runner.evaluate_assertion(&mut app, "frames:2").unwrap());
        assert!(!runner.evaluate_assertion(&mut app, "frames:3").unwrap());
        assert!(runner.evaluate_assertion(&mut app, "tabs:1:B").unwrap());
        assert!(runner.evaluate_assertion(&mut app, "focused_depth:1").unwrap());
        assert!(runner.evaluate_assertion(&mut app, "active_root:https://wiki.test/wiki/A").unwrap());
        assert!(runner.evaluate_assertion(&mut app, "should_quit:false").unwrap());
        assert!(runner.evaluate_assertion(&mut app, "screen_contains:Infinite Wiki").unwrap());

        assert!(runner.evaluate_assertion(&mut app, "frames:many").is_err());
        assert!(runner.evaluate_assertion(&mut app, "colour:blue").is_err());
    }
}
