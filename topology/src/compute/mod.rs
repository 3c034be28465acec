//! Client side of the compute's cloud node endpoints.

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use tracing::debug;
use uuid::Uuid;

use crate::error::ComputeError;
use crate::types::{CreateNodeRequest, NodeSyncResponse, SettingsPatch};

/// Operations a compute exposes for cloud nodes. Device models talk to this
/// trait, so tests can substitute a recording double for the HTTP client.
#[async_trait]
pub trait ComputeClient: Send + Sync {
    /// Register a node on the compute.
    async fn create_node(
        &self,
        project_id: Uuid,
        request: &CreateNodeRequest,
    ) -> Result<NodeSyncResponse, ComputeError>;

    /// Push changed settings for an existing node.
    async fn update_node(
        &self,
        project_id: Uuid,
        node_id: Uuid,
        patch: &SettingsPatch,
    ) -> Result<NodeSyncResponse, ComputeError>;

    /// Remove a node from the compute.
    async fn delete_node(&self, project_id: Uuid, node_id: Uuid) -> Result<(), ComputeError>;
}

/// HTTP client for a compute's REST API.
#[derive(Debug)]
pub struct HttpComputeClient {
    base_url: String,
    client: Client,
}

impl HttpComputeClient {
    pub fn new(base_url: &str) -> Result<Self, ComputeError> {
        Url::parse(base_url).map_err(|e| ComputeError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn nodes_url(&self, project_id: Uuid) -> String {
        format!("{}/v1/projects/{}/cloud/nodes", self.base_url, project_id)
    }

    fn node_url(&self, project_id: Uuid, node_id: Uuid) -> String {
        format!(
            "{}/v1/projects/{}/cloud/nodes/{}",
            self.base_url, project_id, node_id
        )
    }
}

/// Turn a non-success response into a `ComputeError::Api`.
async fn check(resp: Response) -> Result<Response, ComputeError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(ComputeError::from_error_body(status, &body))
}

#[async_trait]
impl ComputeClient for HttpComputeClient {
    async fn create_node(
        &self,
        project_id: Uuid,
        request: &CreateNodeRequest,
    ) -> Result<NodeSyncResponse, ComputeError> {
        let url = self.nodes_url(project_id);
        debug!("POST {}", url);

        let resp = self.client.post(&url).json(request).send().await?;
        let resp = check(resp).await?;
        Ok(resp.json::<NodeSyncResponse>().await?)
    }

    async fn update_node(
        &self,
        project_id: Uuid,
        node_id: Uuid,
        patch: &SettingsPatch,
    ) -> Result<NodeSyncResponse, ComputeError> {
        let url = self.node_url(project_id, node_id);
        debug!("PUT {}", url);

        let resp = self.client.put(&url).json(patch).send().await?;
        let resp = check(resp).await?;
        Ok(resp.json::<NodeSyncResponse>().await?)
    }

    async fn delete_node(&self, project_id: Uuid, node_id: Uuid) -> Result<(), ComputeError> {
        let url = self.node_url(project_id, node_id);
        debug!("DELETE {}", url);

        let resp = self.client.delete(&url).send().await?;
        check(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_url() {
        let err = HttpComputeClient::new("not a url").unwrap_err();
        match err {
            ComputeError::InvalidUrl { url, .. } => assert_eq!(url, "not a url"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_strips_trailing_slash() {
        let client = HttpComputeClient::new("http://127.0.0.1:3080/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:3080");

        let project_id = Uuid::nil();
        assert_eq!(
            client.nodes_url(project_id),
            format!("http://127.0.0.1:3080/v1/projects/{}/cloud/nodes", project_id)
        );
    }
}
