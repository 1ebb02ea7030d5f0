use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::fetch::DocumentSource;
use crate::page::ExtractedDocument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Fetch `url`, found on the page at `origin`.
    FetchDocument { url: String, origin: String },
}

#[derive(Debug, Clone)]
pub enum TaskResult {
    DocumentFetched {
        url: String,
        origin: String,
        document: ExtractedDocument,
    },
    FetchFailed { url: String, message: String },
}

impl TaskResult {
    pub fn url(&self) -> &str {
        match self {
            TaskResult::DocumentFetched { url, .. } | TaskResult::FetchFailed { url, .. } => url,
        }
    }
}

/// Receive tasks until the channel closes or `cancel` fires. Every fetch runs
/// as its own task, so results come back in completion order.
pub async fn run_worker<S: DocumentSource>(
    mut task_receiver: mpsc::Receiver<Task>,
    result_sender: mpsc::Sender<TaskResult>,
    source: Arc<S>,
    cancel: CancellationToken,
) {
    loop {
        let task = tokio::select! {
            _ = cancel.cancelled() => {
                log::info!("🛑 worker: cancelled, shutting down");
                break;
            }
            task = task_receiver.recv() => match task {
                Some(task) => task,
                None => {
                    log::debug!("🛑 worker: task channel closed");
                    break;
                }
            },
        };

        match task {
            Task::FetchDocument { url, origin } => {
                let source = Arc::clone(&source);
                let sender = result_sender.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    log::info!("🌐 worker: fetching {} (from {})", url, origin);
                    let fetched = tokio::select! {
                        _ = cancel.cancelled() => return,
                        fetched = source.fetch(&url) => fetched,
                    };

                    let result = match fetched {
                        Ok(document) => {
                            log::info!("🌐 worker: fetched {} \"{}\"", url, document.title);
                            TaskResult::DocumentFetched {
                                url,
                                origin,
                                document,
                            }
                        }
                        Err(e) => {
                            if e.is_page_failure() {
                                log::warn!("🌐 worker: {} failed: {}", url, e);
                            } else {
                                log::error!("🌐 worker: {} failed: {}", url, e);
                            }
                            TaskResult::FetchFailed {
                                url,
                                message: e.to_string(),
                            }
                        }
                    };

                    if sender.send(result).await.is_err() {
                        // Main thread has dropped the receiver
                        log::debug!("🌐 worker: result dropped, receiver gone");
                    }
                });
            }
        }
    }
}
