//! HTTP client for the depot API.
//!
//! `UploadApi` and `SignedUrlApi` are the seams the orchestrator and the URL
//! cache depend on; `ApiClient` implements both over `reqwest`.

use crate::error::ClientError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use depot_core::models::{
    BatchSignedUrlRequest, BatchSignedUrlResponse, FinalizeRequest, IngestSummary,
    IssuePutRequest, IssuePutResponse, ObjectRecord, RepositoryFile, SignedUrlRequest,
    SignedUrlResponse,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

/// Issuance and finalization calls made for every uploaded file.
#[async_trait]
pub trait UploadApi: Send + Sync {
    async fn issue_put_url(&self, request: &IssuePutRequest)
        -> Result<IssuePutResponse, ClientError>;

    async fn finalize(&self, request: &FinalizeRequest) -> Result<ObjectRecord, ClientError>;
}

/// Batch resolution of signed GET URLs.
#[async_trait]
pub trait SignedUrlApi: Send + Sync {
    async fn signed_urls(&self, object_keys: &[String])
        -> Result<BatchSignedUrlResponse, ClientError>;
}

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// No credentials, for servers running without `API_TOKENS`.
    Anonymous,
}

/// API version prefix (e.g. "/api/v0"). Set DEPOT_API_VERSION to match the server.
pub fn api_prefix() -> String {
    let version = std::env::var("DEPOT_API_VERSION").unwrap_or_else(|_| "v0".to_string());
    format!("/api/{}", version)
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

/// Turn a non-success response into `ClientError::Api`, keeping the server's
/// message and machine code when the body has the usual error shape.
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.code.unwrap_or_else(|| "UNKNOWN".to_string()), body.error),
        Err(_) if text.is_empty() => ("UNKNOWN".to_string(), status.to_string()),
        Err(_) => ("UNKNOWN".to_string(), text),
    };

    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let response = check_status(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}

/// HTTP client for the depot API with configurable auth.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: String, auth: Auth) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Create client from environment: DEPOT_API_URL, DEPOT_API_TOKEN (optional).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("DEPOT_API_URL")
            .unwrap_or_else(|_| "http://localhost:4000".to_string());

        let auth = match std::env::var("DEPOT_API_TOKEN") {
            Ok(token) if !token.trim().is_empty() => Auth::Bearer(token),
            _ => Auth::Anonymous,
        };

        Self::new(base_url, auth)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Anonymous => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        Ok(self.apply_auth(request).send().await?)
    }

    /// GET and deserialize a JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(self.client.get(self.build_url(path))).await?;
        decode(response).await
    }

    /// POST a JSON body and deserialize the response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .send(self.client.post(self.build_url(path)).json(body))
            .await?;
        decode(response).await
    }

    /// DELETE request. Returns Ok(()) on success.
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let response = self.send(self.client.delete(self.build_url(path))).await?;
        check_status(response).await?;
        Ok(())
    }

    /// Raw client for custom requests, e.g. direct transfers to object storage.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Resolve one signed GET URL.
    pub async fn signed_url(&self, object_key: &str) -> Result<SignedUrlResponse, ClientError> {
        self.post_json(
            &format!("{}/urls/signed", api_prefix()),
            &SignedUrlRequest {
                object_key: object_key.to_string(),
            },
        )
        .await
    }

    /// Records registered for a group.
    pub async fn list_records(&self, group_id: &str) -> Result<Vec<ObjectRecord>, ClientError> {
        self.get(&format!(
            "{}/groups/{}/records",
            api_prefix(),
            urlencoding::encode(group_id)
        ))
        .await
    }

    /// Delete a record and its stored object.
    pub async fn delete_record(&self, id: Uuid) -> Result<(), ClientError> {
        self.delete(&format!("{}/records/{}", api_prefix(), id)).await
    }

    /// Upload an archive for server-side ingestion into `repository_id`.
    pub async fn ingest_archive(
        &self,
        repository_id: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<IngestSummary, ClientError> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str("application/zip")
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("repositoryId", repository_id.to_string())
            .part("file", part);

        let response = self
            .send(
                self.client
                    .post(self.build_url(&format!("{}/archives/ingest", api_prefix())))
                    .multipart(form),
            )
            .await?;
        decode(response).await
    }

    /// Files registered in a repository by archive ingestion.
    pub async fn list_repository_files(
        &self,
        repository_id: &str,
    ) -> Result<Vec<RepositoryFile>, ClientError> {
        self.get(&format!(
            "{}/repositories/{}/files",
            api_prefix(),
            urlencoding::encode(repository_id)
        ))
        .await
    }
}

#[async_trait]
impl UploadApi for ApiClient {
    async fn issue_put_url(
        &self,
        request: &IssuePutRequest,
    ) -> Result<IssuePutResponse, ClientError> {
        self.post_json(&format!("{}/uploads/presigned", api_prefix()), request)
            .await
    }

    async fn finalize(&self, request: &FinalizeRequest) -> Result<ObjectRecord, ClientError> {
        self.post_json(&format!("{}/uploads/finalize", api_prefix()), request)
            .await
    }
}

#[async_trait]
impl SignedUrlApi for ApiClient {
    async fn signed_urls(
        &self,
        object_keys: &[String],
    ) -> Result<BatchSignedUrlResponse, ClientError> {
        self.post_json(
            &format!("{}/urls/signed/batch", api_prefix()),
            &BatchSignedUrlRequest {
                object_keys: object_keys.to_vec(),
            },
        )
        .await
    }
}
