//! Loading and saving a metadata field together with its category settings.

use crate::TaskError;
use api_client::{ApiClientError, Category, DamBackend, FieldVisibility, MetadataField};
use futures::future::join_all;
use preview::{diff_categories, enabled_categories};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Field as loaded from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEditorData {
    pub field: MetadataField,
    pub categories: Vec<Category>,
    pub enabled: BTreeSet<u64>,
    pub visibility: BTreeMap<u64, FieldVisibility>,
}

impl FieldEditorData {
    /// Start an edit from the loaded values.
    pub fn edit(&self) -> FieldEdit {
        FieldEdit {
            field: self.field.clone(),
            enabled: self.enabled.clone(),
            visibility: self.visibility.clone(),
        }
    }
}

/// Working copy the editor mutates.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEdit {
    pub field: MetadataField,
    pub enabled: BTreeSet<u64>,
    pub visibility: BTreeMap<u64, FieldVisibility>,
}

impl FieldEdit {
    pub fn visibility_for(&self, category_id: u64) -> FieldVisibility {
        self.visibility
            .get(&category_id)
            .copied()
            .unwrap_or(FieldVisibility {
                category_id,
                is_primary: false,
                is_required: false,
            })
    }

    pub fn toggle_category(&mut self, category_id: u64) {
        if !self.enabled.remove(&category_id) {
            self.enabled.insert(category_id);
        }
    }

    pub fn set_primary(&mut self, category_id: u64, is_primary: bool) {
        let mut vis = self.visibility_for(category_id);
        vis.is_primary = is_primary;
        self.visibility.insert(category_id, vis);
    }

    pub fn set_required(&mut self, category_id: u64, is_required: bool) {
        let mut vis = self.visibility_for(category_id);
        vis.is_required = is_required;
        self.visibility.insert(category_id, vis);
    }
}

/// One request of a save batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchCall {
    UpdateField,
    Suppress(u64),
    Unsuppress(u64),
    Visibility(u64),
    AiEligible(bool),
}

impl std::fmt::Display for BatchCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchCall::UpdateField => write!(f, "update field"),
            BatchCall::Suppress(id) => write!(f, "suppress category {}", id),
            BatchCall::Unsuppress(id) => write!(f, "enable category {}", id),
            BatchCall::Visibility(id) => write!(f, "visibility of category {}", id),
            BatchCall::AiEligible(flag) => write!(f, "set AI eligible to {}", flag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub call: BatchCall,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub attempted: Vec<BatchCall>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// First failure in issue order.
    pub fn first_error(&self) -> Option<&BatchFailure> {
        self.failures.first()
    }
}

#[cfg_attr(feature = "trace-spans", tracing::instrument(skip(backend)))]
pub async fn load_field_editor(backend: Arc<dyn DamBackend>, field_id: u64) -> Result<FieldEditorData, TaskError> {
    let (field, categories) = tokio::join!(
        backend.get_metadata_field(field_id),
        backend.field_categories(field_id)
    );
    let field = field?;
    let categories = categories?;
    let enabled = enabled_categories(&categories.categories, &categories.suppressed);
    let visibility = categories
        .visibility
        .iter()
        .map(|v| (v.category_id, *v))
        .collect();
    tracing::debug!(field = field_id, enabled = enabled.len(), "loaded metadata field");
    Ok(FieldEditorData {
        field,
        categories: categories.categories,
        enabled,
        visibility,
    })
}

/// Requests needed to save `edited`, in issue order.
pub fn plan_batch(original: &FieldEditorData, edited: &FieldEdit) -> Vec<BatchCall> {
    let diff = diff_categories(&original.enabled, &edited.enabled);
    let mut calls = vec![BatchCall::UpdateField];
    calls.extend(diff.suppress.iter().map(|id| BatchCall::Suppress(*id)));
    calls.extend(diff.unsuppress.iter().map(|id| BatchCall::Unsuppress(*id)));
    calls.extend(edited.enabled.iter().map(|id| BatchCall::Visibility(*id)));
    if edited.field.is_ai_eligible != original.field.is_ai_eligible {
        calls.push(BatchCall::AiEligible(edited.field.is_ai_eligible));
    }
    calls
}

async fn issue(backend: &dyn DamBackend, edited: &FieldEdit, call: BatchCall) -> Result<(), ApiClientError> {
    let field_id = edited.field.id;
    match call {
        BatchCall::UpdateField => backend.update_metadata_field(&edited.field).await.map(|_| ()),
        BatchCall::Suppress(id) => backend.suppress_category(field_id, id).await,
        BatchCall::Unsuppress(id) => backend.unsuppress_category(field_id, id).await,
        BatchCall::Visibility(id) => backend.set_field_visibility(field_id, &edited.visibility_for(id)).await,
        BatchCall::AiEligible(flag) => backend.set_ai_eligible(field_id, flag).await,
    }
}

/// Save the edit as one concurrent batch.
///
/// Every request is issued at once and all are awaited; a failure neither
/// cancels the others nor rolls back the ones that went through.
#[cfg_attr(feature = "trace-spans", tracing::instrument(skip_all, fields(field = edited.field.id)))]
pub async fn submit_field_editor(
    backend: Arc<dyn DamBackend>,
    original: FieldEditorData,
    edited: FieldEdit,
) -> BatchReport {
    let calls = plan_batch(&original, &edited);
    let results = join_all(calls.iter().map(|call| issue(backend.as_ref(), &edited, *call))).await;

    let failures: Vec<BatchFailure> = calls
        .iter()
        .zip(results)
        .filter_map(|(call, result)| {
            result.err().map(|e| BatchFailure {
                call: *call,
                message: e.to_string(),
            })
        })
        .collect();

    if failures.is_empty() {
        tracing::info!(field = edited.field.id, calls = calls.len(), "metadata field saved");
    } else {
        for failure in &failures {
            tracing::warn!(field = edited.field.id, call = %failure.call, error = %failure.message, "metadata save call failed");
        }
    }
    BatchReport {
        attempted: calls,
        failures,
    }
}
