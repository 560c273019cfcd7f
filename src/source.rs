use crate::error::SourceError;
use crate::models::{Config, DataSourceMode};
use std::fs;
use std::time::Duration;
use tracing::{debug, info};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the raw enrollment table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    Local(String),
    Remote(String),
}

impl TableSource {
    pub fn from_config(config: &Config) -> Option<Self> {
        match config.data_source_mode {
            DataSourceMode::Local => config.data_file.clone().map(TableSource::Local),
            DataSourceMode::Internet => config.data_url.clone().map(TableSource::Remote),
        }
    }

    pub fn location(&self) -> &str {
        match self {
            TableSource::Local(path) => path,
            TableSource::Remote(url) => url,
        }
    }

    /// Fetch the raw table text. One attempt, no retry.
    pub async fn fetch(&self) -> Result<String, SourceError> {
        let content = match self {
            TableSource::Local(path) => read_file(path)?,
            TableSource::Remote(url) => fetch_url(url).await?,
        };
        check_table_text(self.location(), content)
    }
}

fn read_file(path: &str) -> Result<String, SourceError> {
    debug!(path, "reading enrollment table");
    fs::read_to_string(path).map_err(|source| SourceError::Io {
        location: path.to_string(),
        source,
    })
}

async fn fetch_url(url: &str) -> Result<String, SourceError> {
    info!(url, "fetching enrollment table");
    let http_error = |details: String| SourceError::Http {
        location: url.to_string(),
        details,
    };

    let response = reqwest::Client::new()
        .get(url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| http_error(e.to_string()))?;

    if !response.status().is_success() {
        return Err(http_error(format!("HTTP request failed with status: {}", response.status())));
    }

    response.text().await.map_err(|e| http_error(e.to_string()))
}

/// Static hosts answer a missing file with their index page; that is not a table.
fn check_table_text(location: &str, content: String) -> Result<String, SourceError> {
    let head: String = content.trim_start().chars().take(9).collect::<String>().to_ascii_lowercase();
    if head.starts_with("<!doctype") || head.starts_with("<html") {
        return Err(SourceError::HtmlInsteadOfTable {
            location: location.to_string(),
        });
    }
    if content.trim().is_empty() {
        return Err(SourceError::Empty {
            location: location.to_string(),
        });
    }
    debug!(location, bytes = content.len(), "enrollment table loaded");
    Ok(content)
}
