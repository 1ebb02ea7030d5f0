// Library module containing testable functions from main.rs

use tokio::sync::mpsc;

use crate::app::App;
use crate::async_task::{Task, TaskResult};
use crate::config::FetchConfig;
use crate::error::Result;
use crate::extract::extract_document;
use crate::fetch::{DocumentSource, HttpSource};
use crate::links::search_activation;

pub fn handle_task_result(app: &mut App, result: TaskResult) {
    app.finish_fetch();

    match result {
        TaskResult::DocumentFetched {
            url,
            origin,
            document,
        } => {
            log::debug!("📨 main: inserting {} from {}", url, origin);
            app.insert_document(&url, &origin, document);
        }
        TaskResult::FetchFailed { url, message } => {
            // The tree stays as it was
            log::warn!("📨 main: could not open {}: {}", url, message);
            app.ui.status_message = format!("Error: {}", message);
        }
    }
}

/// Queue the first page, opened like a search.
pub fn open_start_page(app: &mut App, sender: &mpsc::Sender<Task>, url: &str) -> bool {
    match search_activation(url, &app.config.start_url) {
        Some(activation) => app.start_fetch(activation, sender),
        None => {
            app.ui.status_message = format!("Cannot open \"{}\"", url);
            false
        }
    }
}

/// Title and text of a page, as the reader would get them. `target` is a url
/// or a local HTML file.
pub async fn extract_summary(target: &str, rules: &FetchConfig) -> Result<String> {
    let path = std::path::Path::new(target);
    let document = if path.exists() {
        let html = std::fs::read_to_string(path)?;
        let page_url = std::fs::canonicalize(path)
            .ok()
            .and_then(|absolute| url::Url::from_file_path(absolute).ok())
            .map(|url| url.to_string())
            .unwrap_or_else(|| target.to_string());
        extract_document(&html, &page_url, rules)?
    } else {
        HttpSource::new(rules.clone())?.fetch(target).await?
    };

    let mut summary = format!("# {}\n\n{}\n", document.title, document.content.plain_text());
    if !document.content.links().is_empty() {
        summary.push_str("\nLinks:\n");
        for (index, link) in document.content.links().iter().enumerate() {
            summary.push_str(&format!("  [{}] {} -> {}\n", index, link.text, link.href));
        }
    }
    Ok(summary)
}
