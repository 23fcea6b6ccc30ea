//! Remote copy of the save-slot directory

use crate::domain::repositories::{PersistenceError, SlotDirectory, SlotDirectoryMirror};
use async_trait::async_trait;
use std::time::Duration;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts the full slot directory as JSON to an HTTP endpoint
pub struct HttpSlotDirectoryMirror {
    client: reqwest::Client,
    url: String,
}

impl HttpSlotDirectoryMirror {
    /// Fails when the HTTP client cannot be initialised
    pub fn new(url: impl Into<String>) -> Result<Self, PersistenceError> {
        let client = reqwest::Client::builder()
            .timeout(PUBLISH_TIMEOUT)
            .build()
            .map_err(|e| PersistenceError::Network {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SlotDirectoryMirror for HttpSlotDirectoryMirror {
    async fn publish(&self, directory: &SlotDirectory) -> Result<(), PersistenceError> {
        let response = self
            .client
            .post(&self.url)
            .json(directory)
            .send()
            .await
            .map_err(|e| PersistenceError::Network {
                message: format!("POST {} failed: {e}", self.url),
            })?;

        response
            .error_for_status()
            .map(|_| ())
            .map_err(|e| PersistenceError::Network {
                message: format!("POST {} rejected: {e}", self.url),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::SlotEntry;

    #[test]
    fn builds_with_the_given_url() {
        let mirror = HttpSlotDirectoryMirror::new("http://localhost:3000/save").unwrap();
        assert_eq!(mirror.url(), "http://localhost:3000/save");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let mirror = HttpSlotDirectoryMirror::new("http://127.0.0.1:9/save").unwrap();
        let mut directory = SlotDirectory::new();
        directory.insert(
            "quick".to_string(),
            SlotEntry {
                timestamp: "2024-05-01T09:30:00.000Z".to_string(),
            },
        );

        let err = mirror.publish(&directory).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Network { .. }));
    }
}
