use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;

use crate::clustermap::{ClusterMapJson, CollectionManifestJson};
use crate::httpx::client::Client;
use crate::httpx::request::{Auth, BasicAuth, Request};
use crate::httpx::response::Response;
use crate::mgmtx::error::{Error, Result, ServerErrorKind};
use crate::mgmtx::options::{
    CreateBucketOptions, CreateCollectionOptions, CreateScopeOptions, DeleteBucketOptions,
    DeleteCollectionOptions, DeleteScopeOptions, GetCollectionManifestOptions,
    GetTerseBucketConfigOptions, GetTerseClusterConfigOptions,
};

/// The thin request-encode / response-decode pairs over the management REST
/// interface that the core needs for bootstrap, polling and collection CRUD.
pub struct Management<C: Client> {
    pub http_client: Arc<C>,
    pub user_agent: String,
    pub endpoint: String,
    pub auth: Auth,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestUidResponse {
    #[serde(rename = "uid")]
    pub manifest_uid: String,
}

impl<C: Client> Management<C> {
    fn new_request(&self, method: http::Method, path: impl Into<String>) -> Request {
        Request::new(method, format!("{}{}", self.endpoint, path.into()))
            .auth(self.auth.clone())
            .user_agent(self.user_agent.clone())
    }

    async fn check_status(
        &self,
        response: Response,
        not_found: ServerErrorKind,
        exists: Option<ServerErrorKind>,
    ) -> Result<Response> {
        let status = response.status();
        if status < 300 {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();

        let kind = match status {
            401 | 403 => ServerErrorKind::AccessDenied,
            404 => not_found,
            400 => {
                let body_str = String::from_utf8_lossy(&body);
                if let Some(exists) = exists {
                    if body_str.contains("already exists") {
                        exists
                    } else {
                        ServerErrorKind::Unexpected
                    }
                } else {
                    ServerErrorKind::Unexpected
                }
            }
            _ => ServerErrorKind::Unexpected,
        };

        Err(Error::new_server_error(kind, status, &body))
    }

    pub async fn get_terse_bucket_config(
        &self,
        opts: &GetTerseBucketConfigOptions<'_>,
    ) -> Result<ClusterMapJson> {
        let request = self.new_request(
            http::Method::GET,
            format!("/pools/default/b/{}", opts.bucket_name),
        );

        let response = self.http_client.execute(request).await?;
        let response = self
            .check_status(response, ServerErrorKind::BucketNotFound, None)
            .await?;

        response
            .json()
            .await
            .map_err(|e| Error::new_message_error(format!("failed to parse bucket config: {e}")))
    }

    pub async fn get_terse_cluster_config(
        &self,
        _opts: &GetTerseClusterConfigOptions,
    ) -> Result<ClusterMapJson> {
        let request = self.new_request(http::Method::GET, "/pools/default/nodeServices");

        let response = self.http_client.execute(request).await?;
        let response = self
            .check_status(response, ServerErrorKind::Unexpected, None)
            .await?;

        response
            .json()
            .await
            .map_err(|e| Error::new_message_error(format!("failed to parse cluster config: {e}")))
    }

    pub async fn create_bucket(&self, opts: &CreateBucketOptions<'_>) -> Result<()> {
        let mut form = form_pairs(vec![("name", Some(opts.bucket_name.to_string()))]);

        let settings = &opts.settings;
        form.extend(form_pairs(vec![
            ("ramQuota", settings.ram_quota_mb.map(|v| v.to_string())),
            (
                "flushEnabled",
                settings.flush_enabled.map(|v| if v { "1" } else { "0" }.to_string()),
            ),
            ("replicaNumber", settings.num_replicas.map(|v| v.to_string())),
            ("bucketType", settings.bucket_type.clone()),
            ("evictionPolicy", settings.eviction_policy.clone()),
            ("maxTTL", settings.max_expiry_secs.map(|v| v.to_string())),
            ("compressionMode", settings.compression_mode.clone()),
            (
                "durabilityMinLevel",
                settings.durability_min_level.clone(),
            ),
            ("storageBackend", settings.storage_backend.clone()),
            ("numVBuckets", settings.num_vbuckets.map(|v| v.to_string())),
        ]));

        let body = encode_form(&form);

        let request = self
            .new_request(http::Method::POST, "/pools/default/buckets")
            .content_type("application/x-www-form-urlencoded".to_string())
            .body(Bytes::from(body));

        let response = self.http_client.execute(request).await?;
        self.check_status(
            response,
            ServerErrorKind::Unexpected,
            Some(ServerErrorKind::BucketExists),
        )
        .await?;

        Ok(())
    }

    pub async fn delete_bucket(&self, opts: &DeleteBucketOptions<'_>) -> Result<()> {
        let request = self.new_request(
            http::Method::DELETE,
            format!("/pools/default/buckets/{}", opts.bucket_name),
        );

        let response = self.http_client.execute(request).await?;
        self.check_status(response, ServerErrorKind::BucketNotFound, None)
            .await?;

        Ok(())
    }

    pub async fn create_scope(
        &self,
        opts: &CreateScopeOptions<'_>,
    ) -> Result<ManifestUidResponse> {
        let body = encode_form(&form_pairs(vec![(
            "name",
            Some(opts.scope_name.to_string()),
        )]));

        let request = self
            .new_request(
                http::Method::POST,
                format!("/pools/default/buckets/{}/scopes", opts.bucket_name),
            )
            .content_type("application/x-www-form-urlencoded".to_string())
            .body(Bytes::from(body));

        let response = self.http_client.execute(request).await?;
        let response = self
            .check_status(
                response,
                ServerErrorKind::BucketNotFound,
                Some(ServerErrorKind::ScopeExists),
            )
            .await?;

        response
            .json()
            .await
            .map_err(|e| Error::new_message_error(format!("failed to parse response: {e}")))
    }

    pub async fn delete_scope(
        &self,
        opts: &DeleteScopeOptions<'_>,
    ) -> Result<ManifestUidResponse> {
        let request = self.new_request(
            http::Method::DELETE,
            format!(
                "/pools/default/buckets/{}/scopes/{}",
                opts.bucket_name, opts.scope_name
            ),
        );

        let response = self.http_client.execute(request).await?;
        let response = self
            .check_status(response, ServerErrorKind::ScopeNotFound, None)
            .await?;

        response
            .json()
            .await
            .map_err(|e| Error::new_message_error(format!("failed to parse response: {e}")))
    }

    pub async fn create_collection(
        &self,
        opts: &CreateCollectionOptions<'_>,
    ) -> Result<ManifestUidResponse> {
        let mut form = form_pairs(vec![("name", Some(opts.collection_name.to_string()))]);
        form.extend(form_pairs(vec![
            ("maxTTL", opts.max_expiry_secs.map(|v| v.to_string())),
            ("history", opts.history.map(|v| v.to_string())),
        ]));

        let body = encode_form(&form);

        let request = self
            .new_request(
                http::Method::POST,
                format!(
                    "/pools/default/buckets/{}/scopes/{}/collections",
                    opts.bucket_name, opts.scope_name
                ),
            )
            .content_type("application/x-www-form-urlencoded".to_string())
            .body(Bytes::from(body));

        let response = self.http_client.execute(request).await?;
        let response = self
            .check_status(
                response,
                ServerErrorKind::ScopeNotFound,
                Some(ServerErrorKind::CollectionExists),
            )
            .await?;

        response
            .json()
            .await
            .map_err(|e| Error::new_message_error(format!("failed to parse response: {e}")))
    }

    pub async fn delete_collection(
        &self,
        opts: &DeleteCollectionOptions<'_>,
    ) -> Result<ManifestUidResponse> {
        let request = self.new_request(
            http::Method::DELETE,
            format!(
                "/pools/default/buckets/{}/scopes/{}/collections/{}",
                opts.bucket_name, opts.scope_name, opts.collection_name
            ),
        );

        let response = self.http_client.execute(request).await?;
        let response = self
            .check_status(response, ServerErrorKind::CollectionNotFound, None)
            .await?;

        response
            .json()
            .await
            .map_err(|e| Error::new_message_error(format!("failed to parse response: {e}")))
    }

    pub async fn get_collection_manifest(
        &self,
        opts: &GetCollectionManifestOptions<'_>,
    ) -> Result<CollectionManifestJson> {
        let request = self.new_request(
            http::Method::GET,
            format!("/pools/default/buckets/{}/scopes", opts.bucket_name),
        );

        let response = self.http_client.execute(request).await?;
        let response = self
            .check_status(response, ServerErrorKind::BucketNotFound, None)
            .await?;

        response
            .json()
            .await
            .map_err(|e| Error::new_message_error(format!("failed to parse manifest: {e}")))
    }
}

fn form_pairs(pairs: Vec<(&'static str, Option<String>)>) -> Vec<(&'static str, String)> {
    pairs
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect()
}

fn encode_form(pairs: &[(&'static str, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_encoding_includes_only_set_fields() {
        let form = form_pairs(vec![
            ("name", Some("default".to_string())),
            ("ramQuota", Some("256".to_string())),
            ("bucketType", None),
        ]);

        assert_eq!(encode_form(&form), "name=default&ramQuota=256");
    }

    #[test]
    fn form_encoding_escapes_values() {
        let form = form_pairs(vec![("name", Some("my bucket".to_string()))]);
        assert_eq!(encode_form(&form), "name=my%20bucket");
    }
}
