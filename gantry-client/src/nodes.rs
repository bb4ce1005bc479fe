//! Node-related API endpoints

use crate::ClusterClient;
use crate::error::Result;
use gantry_core::domain::node::{Node, NodeOperation};
use gantry_core::rest::RestObject;
use serde::Serialize;
use tracing::debug;

/// Request body for the node state operation endpoints
#[derive(Debug, Serialize)]
struct OperateNodesRequest<'a> {
    #[serde(rename = "Names")]
    names: &'a [String],
}

impl ClusterClient {
    // =============================================================================
    // Node Queries
    // =============================================================================

    /// List every node in the cluster
    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        self.fetch_nodes(&[]).await
    }

    /// List the nodes with the given names
    ///
    /// This is the query the convergence watchers narrow: each call carries
    /// only the names still being tracked.
    pub async fn list_nodes_by_name(&self, names: &[String]) -> Result<Vec<Node>> {
        self.fetch_nodes(&[("names", names.join(","))]).await
    }

    /// List the nodes in a node group
    pub async fn list_nodes_in_group(&self, group: &str) -> Result<Vec<Node>> {
        self.fetch_nodes(&[("group", group.to_string())]).await
    }

    async fn fetch_nodes(&self, query: &[(&str, String)]) -> Result<Vec<Node>> {
        let url = format!("{}/api/nodes", self.base_url);
        let response = self.client.get(&url).query(query).send().await?;

        let objects: Vec<RestObject> = self.handle_response(response).await?;
        objects
            .iter()
            .map(|obj| Node::from_properties(obj).map_err(Into::into))
            .collect()
    }

    // =============================================================================
    // Node Operations
    // =============================================================================

    /// Request a state change for a set of nodes
    ///
    /// The call returns as soon as the backend has accepted the request; the
    /// nodes transition asynchronously. Watch them with the convergence
    /// watchers if you need to know when the transition completes.
    pub async fn operate_nodes(&self, operation: NodeOperation, names: &[String]) -> Result<()> {
        debug!(
            "Requesting {} for {} node(s)",
            operation.verb(),
            names.len()
        );

        let url = format!("{}/api/nodes/{}", self.base_url, operation.verb());
        let response = self
            .client
            .post(&url)
            .json(&OperateNodesRequest { names })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::domain::node::NodeState;
    use mockito::Matcher;

    fn node_body(name: &str, state: &str) -> String {
        format!(
            r#"{{"Properties":[{{"Name":"Name","Value":"{name}"}},{{"Name":"State","Value":"{state}"}}]}}"#
        )
    }

    #[tokio::test]
    async fn test_list_nodes_decodes_property_bags() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/nodes")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                "[{},{}]",
                node_body("CN-01", "Online"),
                node_body("CN-02", "Draining")
            ))
            .create_async()
            .await;

        let client = ClusterClient::new(server.url());
        let nodes = client.list_nodes().await.unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].name, "CN-01");
        assert_eq!(nodes[0].state, NodeState::Online);
        assert_eq!(nodes[1].state, NodeState::Draining);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_nodes_by_name_sends_names_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/nodes")
            .match_query(Matcher::UrlEncoded(
                "names".into(),
                "CN-01,CN-02".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!("[{}]", node_body("CN-01", "Online")))
            .create_async()
            .await;

        let client = ClusterClient::new(server.url());
        let nodes = client
            .list_nodes_by_name(&["CN-01".to_string(), "CN-02".to_string()])
            .await
            .unwrap();

        assert_eq!(nodes.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_operate_nodes_posts_verb_and_names() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/nodes/online")
            .match_body(Matcher::Json(serde_json::json!({
                "Names": ["CN-01", "CN-02"]
            })))
            .with_status(204)
            .create_async()
            .await;

        let client = ClusterClient::new(server.url());
        client
            .operate_nodes(
                NodeOperation::Online,
                &["CN-01".to_string(), "CN-02".to_string()],
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_maps_to_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/nodes")
            .with_status(503)
            .with_body("scheduler unavailable")
            .create_async()
            .await;

        let client = ClusterClient::new(server.url());
        let err = client.list_nodes().await.unwrap_err();

        assert!(err.is_server_error());
        assert!(err.to_string().contains("503"));
    }
}
