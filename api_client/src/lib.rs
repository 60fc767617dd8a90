//! HTTP client for the AssetDesk asset-management backend.
//!
//! Everything the desktop client knows about assets, thumbnails and metadata
//! fields comes through [`DamBackend`]. [`ApiClient`] is the reqwest-backed
//! implementation; tests substitute their own.

mod error;
mod models;

pub use error::{ActionFailure, ApiClientError};
pub use models::*;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const CSRF_HEADER: &str = "X-CSRF-TOKEN";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials attached to every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_token: String,
    pub csrf_token: Option<String>,
}

impl Credentials {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            csrf_token: None,
        }
    }

    pub fn with_csrf(mut self, csrf_token: impl Into<String>) -> Self {
        self.csrf_token = Some(csrf_token.into());
        self
    }
}

/// Operations the client needs from the backend.
#[async_trait]
pub trait DamBackend: Send + Sync {
    async fn list_assets(&self, page: u32, per_page: u32) -> Result<AssetPage, ApiClientError>;
    async fn get_asset(&self, asset_id: &str) -> Result<Asset, ApiClientError>;
    async fn asset_activity(&self, asset_id: &str) -> Result<Vec<ActivityEvent>, ApiClientError>;
    async fn asset_metrics(&self, asset_id: &str) -> Result<AssetMetrics, ApiClientError>;
    async fn thumbnail_bytes(&self, asset_id: &str, size: ThumbnailSize) -> Result<Vec<u8>, ApiClientError>;
    async fn retry_thumbnail(&self, asset_id: &str) -> Result<ActionResponse, ApiClientError>;
    async fn generate_thumbnail(&self, asset_id: &str) -> Result<ActionResponse, ApiClientError>;
    async fn regenerate_styles(
        &self,
        asset_id: &str,
        request: &RegenerateStylesRequest,
    ) -> Result<ActionResponse, ApiClientError>;
    async fn get_metadata_field(&self, field_id: u64) -> Result<MetadataField, ApiClientError>;
    async fn update_metadata_field(&self, field: &MetadataField) -> Result<MetadataField, ApiClientError>;
    async fn field_categories(&self, field_id: u64) -> Result<FieldCategories, ApiClientError>;
    async fn suppress_category(&self, field_id: u64, category_id: u64) -> Result<(), ApiClientError>;
    async fn unsuppress_category(&self, field_id: u64, category_id: u64) -> Result<(), ApiClientError>;
    async fn set_field_visibility(&self, field_id: u64, visibility: &FieldVisibility) -> Result<(), ApiClientError>;
    async fn set_ai_eligible(&self, field_id: u64, eligible: bool) -> Result<(), ApiClientError>;
    async fn autocomplete_tags(&self, query: &str) -> Result<Vec<TagSuggestion>, ApiClientError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    credentials: Credentials,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(client, base_url, credentials)
    }

    /// Create a client around a preconfigured reqwest client (custom timeouts, proxies).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, credentials: Credentials) -> Self {
        ApiClient {
            client,
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_timeout(base_url: impl Into<String>, credentials: Credentials, timeout: Duration) -> Result<Self, ApiClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiClientError::Other(e.to_string()))?;
        Ok(Self::with_client(client, base_url, credentials))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = credentials;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mutating = method != Method::GET;
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, format!("Bearer {}", self.credentials.api_token))
            .header(ACCEPT, "application/json");
        if mutating {
            if let Some(csrf) = &self.credentials.csrf_token {
                req = req.header(CSRF_HEADER, csrf);
            }
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ApiClientError> {
        let response = req
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.or(b.message))
                .unwrap_or(body);
            tracing::debug!(status = status.as_u16(), %message, "backend returned an error");
            return Err(ApiClientError::ApiError {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiClientError> {
        self.send(req)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiClientError::DecodeError(e.to_string()))
    }
}

#[async_trait]
impl DamBackend for ApiClient {
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    async fn list_assets(&self, page: u32, per_page: u32) -> Result<AssetPage, ApiClientError> {
        let req = self
            .request(Method::GET, "/assets")
            .query(&[("page", page), ("per_page", per_page)]);
        self.json(req).await
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    async fn get_asset(&self, asset_id: &str) -> Result<Asset, ApiClientError> {
        let req = self.request(Method::GET, &format!("/assets/{}", asset_id));
        self.json(req).await
    }

    async fn asset_activity(&self, asset_id: &str) -> Result<Vec<ActivityEvent>, ApiClientError> {
        let req = self.request(Method::GET, &format!("/assets/{}/activity", asset_id));
        self.json(req).await
    }

    async fn asset_metrics(&self, asset_id: &str) -> Result<AssetMetrics, ApiClientError> {
        let req = self.request(Method::GET, &format!("/assets/{}/metrics", asset_id));
        self.json(req).await
    }

    async fn thumbnail_bytes(&self, asset_id: &str, size: ThumbnailSize) -> Result<Vec<u8>, ApiClientError> {
        let req = self
            .request(Method::GET, &format!("/assets/{}/thumbnail/{}", asset_id, size.as_str()))
            .header(ACCEPT, "image/*");
        let bytes = self
            .send(req)
            .await?
            .bytes()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    async fn retry_thumbnail(&self, asset_id: &str) -> Result<ActionResponse, ApiClientError> {
        let req = self.request(Method::POST, &format!("/assets/{}/thumbnails/retry", asset_id));
        self.json(req).await
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    async fn generate_thumbnail(&self, asset_id: &str) -> Result<ActionResponse, ApiClientError> {
        let req = self.request(Method::POST, &format!("/assets/{}/thumbnails/generate", asset_id));
        self.json(req).await
    }

    async fn regenerate_styles(
        &self,
        asset_id: &str,
        request: &RegenerateStylesRequest,
    ) -> Result<ActionResponse, ApiClientError> {
        let req = self
            .request(Method::POST, &format!("/assets/{}/thumbnails/regenerate-styles", asset_id))
            .json(request);
        self.json(req).await
    }

    async fn get_metadata_field(&self, field_id: u64) -> Result<MetadataField, ApiClientError> {
        let req = self.request(Method::GET, &format!("/metadata/fields/{}", field_id));
        self.json(req).await
    }

    async fn update_metadata_field(&self, field: &MetadataField) -> Result<MetadataField, ApiClientError> {
        let req = self
            .request(Method::PUT, &format!("/metadata/fields/{}", field.id))
            .json(field);
        self.json(req).await
    }

    async fn field_categories(&self, field_id: u64) -> Result<FieldCategories, ApiClientError> {
        let req = self.request(Method::GET, &format!("/metadata/fields/{}/categories", field_id));
        self.json(req).await
    }

    async fn suppress_category(&self, field_id: u64, category_id: u64) -> Result<(), ApiClientError> {
        let req = self.request(
            Method::POST,
            &format!("/metadata/fields/{}/categories/{}/suppress", field_id, category_id),
        );
        self.send(req).await.map(|_| ())
    }

    async fn unsuppress_category(&self, field_id: u64, category_id: u64) -> Result<(), ApiClientError> {
        let req = self.request(
            Method::DELETE,
            &format!("/metadata/fields/{}/categories/{}/suppress", field_id, category_id),
        );
        self.send(req).await.map(|_| ())
    }

    async fn set_field_visibility(&self, field_id: u64, visibility: &FieldVisibility) -> Result<(), ApiClientError> {
        let req = self
            .request(Method::POST, &format!("/metadata/fields/{}/visibility", field_id))
            .json(visibility);
        self.send(req).await.map(|_| ())
    }

    async fn set_ai_eligible(&self, field_id: u64, eligible: bool) -> Result<(), ApiClientError> {
        let req = self
            .request(Method::POST, &format!("/metadata/fields/{}/ai-eligible", field_id))
            .json(&serde_json::json!({ "is_ai_eligible": eligible }));
        self.send(req).await.map(|_| ())
    }

    async fn autocomplete_tags(&self, query: &str) -> Result<Vec<TagSuggestion>, ApiClientError> {
        let req = self
            .request(Method::GET, "/tags/autocomplete")
            .query(&[("q", query)]);
        self.json(req).await
    }
}
