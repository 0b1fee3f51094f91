//! Read-only anchor registry view.
//!
//! The registry is fetched once on request. A failed fetch leaves the view
//! empty and flagged; nothing retries it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::protocol::AnchorRecord;
use tracing::{info, warn};

#[async_trait]
pub trait AnchorSource: Send + Sync {
    async fn fetch_anchors(&self) -> Result<Vec<AnchorRecord>>;
}

pub struct HttpAnchorRegistry {
    http: Client,
    url: String,
}

impl HttpAnchorRegistry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl AnchorSource for HttpAnchorRegistry {
    async fn fetch_anchors(&self) -> Result<Vec<AnchorRecord>> {
        let anchors = self
            .http
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("failed to reach anchor registry: {}", self.url))?
            .error_for_status()?
            .json::<Vec<AnchorRecord>>()
            .await
            .context("anchor registry returned an unexpected body")?;
        Ok(anchors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryStatus {
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone)]
pub struct RegistryView {
    status: RegistryStatus,
    anchors: Vec<AnchorRecord>,
}

impl Default for RegistryView {
    fn default() -> Self {
        Self {
            status: RegistryStatus::Loading,
            anchors: Vec::new(),
        }
    }
}

impl RegistryView {
    pub async fn load(source: &dyn AnchorSource) -> Self {
        match source.fetch_anchors().await {
            Ok(anchors) => {
                info!(count = anchors.len(), "registry: loaded anchors");
                Self {
                    status: RegistryStatus::Ready,
                    anchors,
                }
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "registry: fetch failed");
                Self {
                    status: RegistryStatus::Failed,
                    anchors: Vec::new(),
                }
            }
        }
    }

    pub fn status(&self) -> RegistryStatus {
        self.status
    }

    pub fn anchors(&self) -> &[AnchorRecord] {
        &self.anchors
    }

    /// Case-insensitive substring match on mnemonic or definition.
    pub fn filter(&self, query: &str) -> Vec<&AnchorRecord> {
        let needle = query.trim().to_lowercase();
        self.anchors
            .iter()
            .filter(|anchor| {
                needle.is_empty()
                    || anchor.mnemonic.to_lowercase().contains(&needle)
                    || anchor.definition.to_lowercase().contains(&needle)
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
