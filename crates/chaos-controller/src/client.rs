//! HTTP transport from the controller to agent inject endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use chaos_core::{AgentClient, AgentEndpoint, DispatchError, FaultSpecification, StatusResponse};

/// [`AgentClient`] that POSTs the fault specification as JSON.
#[derive(Debug, Clone)]
pub struct HttpAgentClient {
    client: Client,
}

impl HttpAgentClient {
    /// Build a client whose every request gives up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpAgentClient { client })
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn inject(
        &self,
        endpoint: &AgentEndpoint,
        spec: &FaultSpecification,
    ) -> Result<StatusResponse, DispatchError> {
        let resp = self
            .client
            .post(endpoint.as_str())
            .json(spec)
            .send()
            .await
            .map_err(|e| DispatchError::Transport {
                endpoint: endpoint.to_string(),
                source: Box::new(e),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DispatchError::Rejected {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        // Any 2xx counts as accepted, even when the body is not the usual {status, message}.
        Ok(resp
            .json::<StatusResponse>()
            .await
            .unwrap_or_else(|_| StatusResponse::new(status.as_str(), "")))
    }
}
