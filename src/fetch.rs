use std::collections::HashMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::extract::extract_document;
use crate::page::ExtractedDocument;

pub trait DocumentSource: Send + Sync + 'static {
    /// Fetch `url` and extract its title and article content.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<ExtractedDocument>> + Send;
}

pub struct HttpSource {
    client: reqwest::Client,
    rules: FetchConfig,
}

impl HttpSource {
    pub fn new(rules: FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(rules.user_agent.clone())
            .timeout(Duration::from_secs(rules.timeout_secs))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;
        Ok(Self { client, rules })
    }

    /// The page body plus the url it was finally served from.
    async fn fetch_html(&self, url: &str) -> std::result::Result<(String, String), FetchError> {
        if url.starts_with("file://") {
            return Ok((url.to_string(), read_local_file(url).await?));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            if !content_type.contains("html") {
                return Err(FetchError::NotHtml {
                    url: url.to_string(),
                    content_type: content_type.to_string(),
                });
            }
        }

        let final_url = response.url().to_string();
        if final_url != url {
            log::debug!("🌐 fetch: {} redirected to {}", url, final_url);
        }
        let html = response.text().await.map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;
        Ok((final_url, html))
    }
}

impl DocumentSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<ExtractedDocument> {
        // Links resolve against where the page ended up; the tree keys on `url`
        let (final_url, html) = self.fetch_html(url).await?;
        Ok(extract_document(&html, &final_url, &self.rules)?)
    }
}

async fn read_local_file(url: &str) -> std::result::Result<String, FetchError> {
    let path = Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.to_file_path().ok())
        .ok_or_else(|| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "not a local file path".to_string(),
        })?;
    read_html(&path).await
}

async fn read_html(path: &Path) -> std::result::Result<String, FetchError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FetchError::Io {
            path: path.display().to_string(),
            source,
        })
}

/// In-memory pages keyed by url.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pages: HashMap<String, String>,
    rules: FetchConfig,
}

impl StaticSource {
    pub fn new(pages: HashMap<String, String>) -> Self {
        Self {
            pages,
            rules: FetchConfig::default(),
        }
    }

    pub fn insert(&mut self, url: impl Into<String>, html: impl Into<String>) {
        self.pages.insert(url.into(), html.into());
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl DocumentSource for StaticSource {
    async fn fetch(&self, url: &str) -> Result<ExtractedDocument> {
        let html = self.pages.get(url).ok_or_else(|| FetchError::NotFound {
            url: url.to_string(),
        })?;
        Ok(extract_document(html, url, &self.rules)?)
    }
}

/// HTML files on disk, one per url path: `https://host/wiki/Rust` is read
/// from `<dir>/wiki/Rust.html`.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    dir: PathBuf,
    rules: FetchConfig,
}

impl FixtureSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            rules: FetchConfig::default(),
        }
    }

    pub fn with_rules(mut self, rules: FetchConfig) -> Self {
        self.rules = rules;
        self
    }

    /// File backing `url`. Urls whose path climbs out of the fixture
    /// directory are rejected.
    pub fn path_for(&self, url: &str) -> std::result::Result<PathBuf, FetchError> {
        let url_path = match Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => url.to_string(),
        };
        let relative = url_path.trim_start_matches('/');
        let relative = if relative.is_empty() { "index" } else { relative };

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: "path leaves the fixture directory".to_string(),
            });
        }

        let mut path = self.dir.join(relative);
        if path.extension().map_or(true, |ext| ext != "html") {
            let mut name = path.as_os_str().to_os_string();
            name.push(".html");
            path = PathBuf::from(name);
        }
        Ok(path)
    }
}

impl DocumentSource for FixtureSource {
    async fn fetch(&self, url: &str) -> Result<ExtractedDocument> {
        let path = self.path_for(url)?;
        let html = match read_html(&path).await {
            Ok(html) => html,
            Err(FetchError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NotFound {
                    url: url.to_string(),
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        };
        Ok(extract_document(&html, url, &self.rules)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WikiError;
    use assert_matches::assert_matches;
    use maplit::hashmap;
    use tempfile::TempDir;

    fn article(title: &str, body: &str) -> String {
        format!(
            r#"<html><body><div id="content"><h1 class="firstHeading">{}</h1><p>{}</p></div></body></html>"#,
            title, body
        )
    }

    #[tokio::test]
    async fn test_static_source_serves_known_pages() {
        let source = StaticSource::new(hashmap! {
            "https://wiki.test/wiki/A".to_string() => article("A", r#"See <a href="/wiki/B">B</a>"#),
        });

        let doc = source.fetch("https://wiki.test/wiki/A").await.unwrap();
        assert_eq!(doc.title, "A");
        assert_eq!(doc.content.links()[0].href, "https://wiki.test/wiki/B");

        let missing = source.fetch("https://wiki.test/wiki/Z").await;
        assert_matches!(missing, Err(WikiError::Fetch(FetchError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_static_source_reports_extract_failures() {
        let mut source = StaticSource::default();
        source.insert("https://wiki.test/wiki/Bare", "<html><body><p>no article</p></body></html>");

        let result = source.fetch("https://wiki.test/wiki/Bare").await;
        assert_matches!(result, Err(WikiError::Extract(_)));
    }

    #[test]
    fn test_fixture_paths() {
        let source = FixtureSource::new("/fixtures");
        assert_eq!(
            source.path_for("https://wiki.test/wiki/Rust").unwrap(),
            PathBuf::from("/fixtures/wiki/Rust.html")
        );
        assert_eq!(
            source.path_for("https://wiki.test/").unwrap(),
            PathBuf::from("/fixtures/index.html")
        );
        assert_eq!(
            source.path_for("/wiki/Page.html").unwrap(),
            PathBuf::from("/fixtures/wiki/Page.html")
        );
        assert_matches!(
            source.path_for("/wiki/../../etc/passwd"),
            Err(FetchError::InvalidUrl { .. })
        );
    }

    #[tokio::test]
    async fn test_fixture_source_reads_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("wiki")).unwrap();
        std::fs::write(temp_dir.path().join("wiki/A.html"), article("Fixture A", "body")).unwrap();

        let source = FixtureSource::new(temp_dir.path());
        let doc = source.fetch("https://wiki.test/wiki/A").await.unwrap();
        assert_eq!(doc.title, "Fixture A");

        let missing = source.fetch("https://wiki.test/wiki/B").await;
        assert_matches!(missing, Err(WikiError::Fetch(FetchError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_http_source_reads_file_urls() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("page.html");
        std::fs::write(&path, article("Local", "from disk")).unwrap();
        let url = Url::from_file_path(&path).unwrap().to_string();

        let source = HttpSource::new(FetchConfig::default()).unwrap();
        let doc = source.fetch(&url).await.unwrap();
        assert_eq!(doc.title, "Local");
        assert!(doc.content.plain_text().contains("from disk"));
    }

    /// Answer `/old/Page` with a redirect to `/new/Page`, which serves an
    /// article with a relative link.
    async fn serve_redirecting_wiki(listener: tokio::net::TcpListener) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buffer = vec![0u8; 4096];
                let read = socket.read(&mut buffer).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buffer[..read]).to_string();
                let response = if request.starts_with("GET /old/Page ") {
                    "HTTP/1.1 301 Moved Permanently\r\nLocation: /new/Page\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_string()
                } else {
                    let body = article("Moved", r#"See <a href="Other">the other page</a>."#);
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    )
                };
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    }

    #[tokio::test]
    async fn test_http_links_resolve_against_redirect_target() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(serve_redirecting_wiki(listener));

        let source = HttpSource {
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
            rules: FetchConfig::default(),
        };
        let doc = source
            .fetch(&format!("http://{}/old/Page", address))
            .await
            .unwrap();

        assert_eq!(doc.title, "Moved");
        assert_eq!(
            doc.content.links()[0].href,
            format!("http://{}/new/Other", address)
        );
    }
}
