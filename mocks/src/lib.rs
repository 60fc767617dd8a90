//! Test doubles for the asset-management backend.
//!
//! [`ScriptedBackend`] is an in-memory [`DamBackend`] for driving pollers and
//! editors step by step; the `httptest` helpers stand up a real HTTP server
//! for exercising the binaries end to end.

use api_client::{
    ActionResponse, ActivityEvent, ApiClientError, Asset, AssetMetrics, AssetPage, Category,
    DamBackend, FieldCategories, FieldVisibility, MetadataField, RegenerateStylesRequest,
    TagSuggestion, ThumbnailSize, ThumbnailStatus,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use httptest::{matchers::*, responders::*, Expectation, Server};
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Build an asset snapshot; `tick` offsets `updated_at` in seconds.
pub fn sample_asset(id: &str, mime_type: &str, status: ThumbnailStatus, tick: i64) -> Asset {
    let extension = match mime_type {
        "application/pdf" => "pdf",
        m if m.starts_with("image/") => "jpg",
        m if m.starts_with("video/") => "mp4",
        _ => "bin",
    };
    let completed = status == ThumbnailStatus::Completed;
    Asset {
        id: id.to_string(),
        filename: format!("asset-{}.{}", id, extension),
        mime_type: mime_type.to_string(),
        file_extension: None,
        size_bytes: Some(2048),
        thumbnail_status: status,
        thumbnail_url: completed.then(|| format!("https://cdn.test/{}/thumb.jpg", id)),
        thumbnail_url_large: None,
        thumbnail_error: (status == ThumbnailStatus::Failed).then(|| "decoder crashed".to_string()),
        thumbnail_retry_count: 0,
        updated_at: Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
            + chrono::Duration::seconds(tick),
    }
}

fn api_error(status: u16, message: &str) -> ApiClientError {
    ApiClientError::ApiError {
        status,
        message: message.to_string(),
    }
}

#[derive(Default)]
struct State {
    asset_scripts: HashMap<String, VecDeque<Result<Asset, u16>>>,
    last_asset: HashMap<String, Asset>,
    listed: Vec<Asset>,
    calls: Vec<String>,
    action_errors: HashMap<String, u16>,
    failing: HashSet<String>,
    fields: HashMap<u64, MetadataField>,
    categories: HashMap<u64, FieldCategories>,
    metrics: HashMap<String, AssetMetrics>,
    activity: HashMap<String, Vec<ActivityEvent>>,
    tags: Vec<TagSuggestion>,
}

/// Scripted in-memory backend.
///
/// `get_asset` pops the next scripted response for an id and keeps
/// answering with the last successful snapshot once the script runs dry.
#[derive(Default)]
pub struct ScriptedBackend {
    state: Mutex<State>,
    gate: Option<Arc<Notify>>,
    fetch_started: Arc<Notify>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every `get_asset` until `gate` is notified.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Notified each time a `get_asset` call starts.
    pub fn fetch_started(&self) -> Arc<Notify> {
        self.fetch_started.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: String) -> bool {
        let mut state = self.lock();
        let fails = state.failing.contains(&call);
        state.calls.push(call);
        fails
    }

    pub fn push_asset(&self, asset: Asset) {
        let mut state = self.lock();
        state
            .asset_scripts
            .entry(asset.id.clone())
            .or_default()
            .push_back(Ok(asset));
    }

    /// Script a failed fetch with the given HTTP status.
    pub fn push_asset_error(&self, asset_id: &str, status: u16) {
        self.lock()
            .asset_scripts
            .entry(asset_id.to_string())
            .or_default()
            .push_back(Err(status));
    }

    pub fn set_listed(&self, assets: Vec<Asset>) {
        self.lock().listed = assets;
    }

    pub fn fail_action(&self, action: &str, status: u16) {
        self.lock().action_errors.insert(action.to_string(), status);
    }

    /// Make a recorded call (e.g. `suppress:3:1`) fail with a 500.
    pub fn fail_call(&self, call: &str) {
        self.lock().failing.insert(call.to_string());
    }

    pub fn set_field(&self, field: MetadataField, categories: FieldCategories) {
        let mut state = self.lock();
        state.categories.insert(field.id, categories);
        state.fields.insert(field.id, field);
    }

    pub fn set_metrics(&self, asset_id: &str, metrics: AssetMetrics) {
        self.lock().metrics.insert(asset_id.to_string(), metrics);
    }

    pub fn set_activity(&self, asset_id: &str, events: Vec<ActivityEvent>) {
        self.lock().activity.insert(asset_id.to_string(), events);
    }

    pub fn set_tags(&self, tags: Vec<TagSuggestion>) {
        self.lock().tags = tags;
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn action(&self, name: &str, asset_id: &str) -> Result<ActionResponse, ApiClientError> {
        let mut state = self.lock();
        state.calls.push(format!("{}:{}", name, asset_id));
        match state.action_errors.get(name) {
            Some(status) => Err(api_error(*status, name)),
            None => Ok(ActionResponse {
                success: true,
                error: None,
                message: None,
            }),
        }
    }

    fn check(&self, call: String) -> Result<(), ApiClientError> {
        if self.record(call.clone()) {
            Err(api_error(500, &format!("{} failed", call)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DamBackend for ScriptedBackend {
    async fn list_assets(&self, page: u32, per_page: u32) -> Result<AssetPage, ApiClientError> {
        let mut state = self.lock();
        state.calls.push(format!("list:{}", page));
        let per_page = per_page.max(1) as usize;
        let total = state.listed.len();
        let last_page = total.div_ceil(per_page).max(1) as u32;
        let data = state
            .listed
            .iter()
            .skip((page.saturating_sub(1) as usize) * per_page)
            .take(per_page)
            .cloned()
            .collect();
        Ok(AssetPage {
            data,
            current_page: page,
            last_page,
            total: total as u64,
        })
    }

    async fn get_asset(&self, asset_id: &str) -> Result<Asset, ApiClientError> {
        self.fetch_started.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let mut state = self.lock();
        state.calls.push(format!("get:{}", asset_id));
        let next = state
            .asset_scripts
            .get_mut(asset_id)
            .and_then(|script| script.pop_front());
        match next {
            Some(Ok(asset)) => {
                state.last_asset.insert(asset_id.to_string(), asset.clone());
                Ok(asset)
            }
            Some(Err(status)) => Err(api_error(status, "scripted failure")),
            None => state
                .last_asset
                .get(asset_id)
                .cloned()
                .ok_or_else(|| api_error(404, "Not Found")),
        }
    }

    async fn asset_activity(&self, asset_id: &str) -> Result<Vec<ActivityEvent>, ApiClientError> {
        self.record(format!("activity:{}", asset_id));
        Ok(self.lock().activity.get(asset_id).cloned().unwrap_or_default())
    }

    async fn asset_metrics(&self, asset_id: &str) -> Result<AssetMetrics, ApiClientError> {
        self.check(format!("metrics:{}", asset_id))?;
        Ok(self.lock().metrics.get(asset_id).copied().unwrap_or_default())
    }

    async fn thumbnail_bytes(&self, asset_id: &str, size: ThumbnailSize) -> Result<Vec<u8>, ApiClientError> {
        self.check(format!("thumbnail:{}:{}", asset_id, size))?;
        Ok(format!("{}-{}", asset_id, size).into_bytes())
    }

    async fn retry_thumbnail(&self, asset_id: &str) -> Result<ActionResponse, ApiClientError> {
        self.action("retry", asset_id)
    }

    async fn generate_thumbnail(&self, asset_id: &str) -> Result<ActionResponse, ApiClientError> {
        self.action("generate", asset_id)
    }

    async fn regenerate_styles(
        &self,
        asset_id: &str,
        request: &RegenerateStylesRequest,
    ) -> Result<ActionResponse, ApiClientError> {
        let result = self.action("regenerate", asset_id);
        self.lock()
            .calls
            .push(format!("styles:{}:{}", request.styles.join(","), request.force_imagick));
        result
    }

    async fn get_metadata_field(&self, field_id: u64) -> Result<MetadataField, ApiClientError> {
        self.check(format!("field:{}", field_id))?;
        self.lock()
            .fields
            .get(&field_id)
            .cloned()
            .ok_or_else(|| api_error(404, "Not Found"))
    }

    async fn update_metadata_field(&self, field: &MetadataField) -> Result<MetadataField, ApiClientError> {
        self.check(format!("update:{}", field.id))?;
        self.lock().fields.insert(field.id, field.clone());
        Ok(field.clone())
    }

    async fn field_categories(&self, field_id: u64) -> Result<FieldCategories, ApiClientError> {
        self.check(format!("categories:{}", field_id))?;
        self.lock()
            .categories
            .get(&field_id)
            .cloned()
            .ok_or_else(|| api_error(404, "Not Found"))
    }

    async fn suppress_category(&self, field_id: u64, category_id: u64) -> Result<(), ApiClientError> {
        self.check(format!("suppress:{}:{}", field_id, category_id))
    }

    async fn unsuppress_category(&self, field_id: u64, category_id: u64) -> Result<(), ApiClientError> {
        self.check(format!("unsuppress:{}:{}", field_id, category_id))
    }

    async fn set_field_visibility(&self, field_id: u64, visibility: &FieldVisibility) -> Result<(), ApiClientError> {
        self.check(format!(
            "visibility:{}:{}:{}:{}",
            field_id, visibility.category_id, visibility.is_primary, visibility.is_required
        ))
    }

    async fn set_ai_eligible(&self, field_id: u64, eligible: bool) -> Result<(), ApiClientError> {
        self.check(format!("ai:{}:{}", field_id, eligible))
    }

    async fn autocomplete_tags(&self, query: &str) -> Result<Vec<TagSuggestion>, ApiClientError> {
        self.record(format!("tags:{}", query));
        let tags = self.lock().tags.clone();
        Ok(tags
            .into_iter()
            .filter(|t| t.name.starts_with(query))
            .collect())
    }
}

/// A field with two options and three categories, the middle one suppressed.
pub fn sample_field(field_id: u64) -> (MetadataField, FieldCategories) {
    let field = MetadataField {
        id: field_id,
        name: "usage_rights".into(),
        label: "Usage rights".into(),
        field_type: "select".into(),
        options: vec![
            api_client::FieldOption {
                id: Some(1),
                label: "Internal".into(),
                value: "internal".into(),
            },
            api_client::FieldOption {
                id: Some(2),
                label: "Public".into(),
                value: "public".into(),
            },
        ],
        is_ai_eligible: false,
    };
    let categories = FieldCategories {
        categories: vec![
            Category { id: 1, name: "Photos".into() },
            Category { id: 2, name: "Logos".into() },
            Category { id: 3, name: "Documents".into() },
        ],
        suppressed: vec![2],
        visibility: vec![FieldVisibility {
            category_id: 1,
            is_primary: true,
            is_required: false,
        }],
    };
    (field, categories)
}

/// Create an empty mock server for the asset API.
pub fn dam_server() -> Server {
    Server::run()
}

pub fn asset_json(id: &str, mime_type: &str, status: &str) -> serde_json::Value {
    let completed = status == "completed";
    json!({
        "id": id,
        "filename": format!("asset-{}", id),
        "mime_type": mime_type,
        "thumbnail_status": status,
        "thumbnail_url": if completed { json!(format!("https://cdn.test/{}/thumb.jpg", id)) } else { json!(null) },
        "thumbnail_retry_count": 0,
        "updated_at": "2024-05-01T12:00:00Z"
    })
}

/// Expect any number of GET `/assets/{id}` requests answered with `body`.
pub fn expect_asset(server: &Server, id: &str, body: serde_json::Value) {
    server.expect(
        Expectation::matching(request::method_path("GET", format!("/assets/{}", id)))
            .times(..)
            .respond_with(json_encoded(body)),
    );
}

/// Expect GET `/assets/{id}` to answer with each body in turn.
pub fn expect_asset_sequence(server: &Server, id: &str, bodies: Vec<serde_json::Value>) {
    let responders: Vec<Box<dyn Responder>> = bodies
        .into_iter()
        .map(|b| Box::new(json_encoded(b)) as Box<dyn Responder>)
        .collect();
    let count = responders.len();
    server.expect(
        Expectation::matching(request::method_path("GET", format!("/assets/{}", id)))
            .times(count)
            .respond_with(cycle(responders)),
    );
}

pub fn expect_list(server: &Server, assets: Vec<serde_json::Value>) {
    let total = assets.len();
    server.expect(
        Expectation::matching(request::method_path("GET", "/assets"))
            .times(..)
            .respond_with(json_encoded(json!({
                "data": assets,
                "current_page": 1,
                "last_page": 1,
                "total": total
            }))),
    );
}

/// Expect a POST to a thumbnail action (`retry`, `generate`) answering `status`.
pub fn expect_thumbnail_action(server: &Server, id: &str, action: &str, status: u16) {
    let body = if (200..300).contains(&status) {
        json!({ "success": true })
    } else {
        json!({ "success": false, "error": format!("{} rejected", action) })
    };
    server.expect(
        Expectation::matching(request::method_path(
            "POST",
            format!("/assets/{}/thumbnails/{}", id, action),
        ))
        .respond_with(status_code(status).body(body.to_string())),
    );
}

pub fn expect_metrics(server: &Server, id: &str, views: u64, downloads: u64) {
    server.expect(
        Expectation::matching(request::method_path("GET", format!("/assets/{}/metrics", id)))
            .respond_with(json_encoded(json!({ "views": views, "downloads": downloads }))),
    );
}

pub fn expect_field(server: &Server, field_id: u64) {
    let (field, categories) = sample_field(field_id);
    server.expect(
        Expectation::matching(request::method_path("GET", format!("/metadata/fields/{}", field_id)))
            .times(..)
            .respond_with(json_encoded(serde_json::to_value(field).unwrap_or_default())),
    );
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            format!("/metadata/fields/{}/categories", field_id),
        ))
        .times(..)
        .respond_with(json_encoded(serde_json::to_value(categories).unwrap_or_default())),
    );
}
