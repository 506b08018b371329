use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request to origin failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("origin answered with status {0}")]
    Status(u16),
}

/// Checks that an origin is worth storing before a code is allocated for it.
#[async_trait]
pub trait OriginProbe: Send + Sync + 'static {
    async fn check(&self, origin: &str) -> Result<(), ProbeError>;
}

/// Fetches the origin and accepts only a 2xx answer.
///
/// The request carries a timeout so a slow origin can never hold a request
/// handler for long.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl OriginProbe for HttpProbe {
    async fn check(&self, origin: &str) -> Result<(), ProbeError> {
        let status = self.client.get(origin).send().await?.status();

        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeError::Status(status.as_u16()))
        }
    }
}

/// Accepts every origin without a network round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipProbe;

#[async_trait]
impl OriginProbe for SkipProbe {
    async fn check(&self, _origin: &str) -> Result<(), ProbeError> {
        Ok(())
    }
}
