use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use infinite_wiki::app::App;
use infinite_wiki::async_task::{self, Task, TaskResult};
use infinite_wiki::cli::{Cli, Commands};
use infinite_wiki::config::Config;
use infinite_wiki::error::{Result, WikiError};
use infinite_wiki::fetch::{FixtureSource, HttpSource};
use infinite_wiki::test_runner::TestRunner;
use infinite_wiki::{event, main_lib, ui};

/// Environment variable naming the log file.
const LOG_ENV: &str = "INFINITE_WIKI_LOG";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger only if INFINITE_WIKI_LOG environment variable is set
    if let Ok(log_file) = std::env::var(LOG_ENV) {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        env_logger::Builder::new()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .filter_level(log::LevelFilter::Debug)
            .init();

        log::info!("Infinite Wiki starting up");
    }

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run { url: None }) {
        Commands::Run { url } => run_interactive(url).await,
        Commands::Test {
            script,
            fixtures,
            settle_timeout,
            verbose,
            overwrite,
        } => {
            run_headless_test(&script, fixtures.as_deref(), settle_timeout, verbose, overwrite)
                .await
        }
        Commands::Extract { target } => {
            let config = Config::load()?;
            let summary = main_lib::extract_summary(&target, &config.fetch).await?;
            print!("{}", summary);
            Ok(())
        }
    }
}

async fn run_headless_test(
    script_path: &str,
    fixtures: Option<&str>,
    settle_timeout: u64,
    verbose: bool,
    overwrite: bool,
) -> Result<()> {
    // Set up logging if verbose or if environment variable is set
    if verbose && std::env::var(LOG_ENV).is_err() {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    log::info!("🧪 Starting headless test run");
    log::info!("🧪 Script: {}", script_path);

    let config = Config::load()?;
    let mut app = App::new(config.clone());

    let mut test_runner = TestRunner::from_file(script_path)?;
    test_runner.max_settle_time = Duration::from_secs(settle_timeout);
    test_runner.overwrite_mode = overwrite;
    test_runner.screenshot_base_dir = std::path::Path::new(script_path)
        .parent()
        .map(|dir| dir.to_path_buf());

    log::info!("🧪 Running test script with {} commands", test_runner.script.commands.len());

    let test_result = match fixtures {
        Some(dir) => {
            log::info!("🧪 Fixtures: {}", dir);
            let source = FixtureSource::new(dir).with_rules(config.fetch.clone());
            test_runner.run_with_source(&mut app, Arc::new(source)).await?
        }
        None => {
            let source = HttpSource::new(config.fetch.clone())?;
            test_runner.run_with_source(&mut app, Arc::new(source)).await?
        }
    };

    test_result.print_summary();

    if test_result.success {
        log::info!("🧪 Test completed successfully");
        Ok(())
    } else {
        log::error!("🧪 Test failed");
        Err(WikiError::Script("Test failed".to_string()))
    }
}

async fn run_interactive(url: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let source = Arc::new(HttpSource::new(config.fetch.clone())?);
    let start_url = url.unwrap_or_else(|| config.start_url.clone());
    let mut app = App::new(config);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup async task channels
    let (task_sender, task_receiver) = mpsc::channel::<Task>(32);
    let (result_sender, result_receiver) = mpsc::channel::<TaskResult>(32);

    // Start background worker
    let cancel = CancellationToken::new();
    let worker_handle = tokio::spawn(async_task::run_worker(
        task_receiver,
        result_sender,
        source,
        cancel.clone(),
    ));

    log::info!("📤 main: Opening start page {}", start_url);
    main_lib::open_start_page(&mut app, &task_sender, &start_url);

    let outcome = event_loop(&mut terminal, &mut app, &task_sender, result_receiver);

    // Cleanup
    cancel.cancel();
    if let Err(e) = worker_handle.await {
        log::warn!("🛑 main: worker ended abnormally: {}", e);
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    outcome
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    task_sender: &mpsc::Sender<Task>,
    mut result_receiver: mpsc::Receiver<TaskResult>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    loop {
        // Handle forced screen redraw
        if app.ui.force_redraw {
            terminal.clear()?;
            app.ui.force_redraw = false;
        }

        terminal.draw(|f| ui::draw(f, app))?;

        if crossterm::event::poll(tick_rate)? {
            let event = crossterm::event::read()?;
            if let Err(e) = event::handle_event(event, app, task_sender) {
                app.ui.status_message = format!("Error handling event: {}", e);
            }
        }

        // Handle async task results
        while let Ok(result) = result_receiver.try_recv() {
            log::debug!("📨 main: Received result for {}", result.url());
            main_lib::handle_task_result(app, result);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
