//! Object storage and record datastore clients.
//!
//! Both concerns are traits so the webhook state machine takes injected
//! dependencies rather than process-wide singletons: each request can be
//! tested in isolation with fakes, and two concurrent requests share nothing
//! mutable but the remote backends themselves.
//!
//! The production implementation is a single [`SupabaseClient`] speaking the
//! storage REST API and PostgREST. Uploads use a fresh v4 UUID per report,
//! so concurrent invocations can never overwrite each other's artifacts, and
//! `x-upsert: false` makes the backend reject a collision outright instead
//! of racing.

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::model::RecordStatus;
use async_trait::async_trait;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Uploads a rendered report and resolves its public URL.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Upload the file at `path` under a collision-resistant generated name
    /// and return the publicly resolvable URL. A backend that cannot produce
    /// one fails with [`PipelineError::StorageUploadFailed`].
    async fn store_report(&self, path: &Path) -> Result<String, PipelineError>;
}

/// Keyed status updates on the report record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Perform exactly one update on the record: terminal `status`, plus the
    /// report URL when one exists.
    async fn update_record(
        &self,
        record_id: &str,
        status: RecordStatus,
        report_url: Option<&str>,
    ) -> Result<(), PipelineError>;
}

/// Supabase-backed implementation of both stores.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: String,
    records_table: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.supabase_url.clone(),
            api_key: config.supabase_key.clone(),
            bucket: config.bucket.clone(),
            records_table: config.records_table.clone(),
        }
    }

    /// Fresh object name for an upload. Never reused.
    fn object_name() -> String {
        format!("pl_reports/{}.pdf", Uuid::new_v4())
    }

    fn public_url(&self, object: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, object
        )
    }
}

#[async_trait]
impl ReportStore for SupabaseClient {
    async fn store_report(&self, path: &Path) -> Result<String, PipelineError> {
        let bytes =
            tokio::fs::read(path)
                .await
                .map_err(|e| PipelineError::StorageUploadFailed {
                    detail: format!("reading '{}': {e}", path.display()),
                })?;

        let object = Self::object_name();
        let endpoint = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, object);

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("content-type", "application/pdf")
            .header("cache-control", "3600")
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| PipelineError::StorageUploadFailed {
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::StorageUploadFailed {
                detail: format!("HTTP {status}: {body}"),
            });
        }

        info!("Uploaded P&L report as {}", object);
        Ok(self.public_url(&object))
    }
}

#[async_trait]
impl RecordStore for SupabaseClient {
    async fn update_record(
        &self,
        record_id: &str,
        status: RecordStatus,
        report_url: Option<&str>,
    ) -> Result<(), PipelineError> {
        let mut update = serde_json::json!({ "status": status.as_str() });
        if let Some(url) = report_url {
            update["pl_report"] = url.into();
        }

        let endpoint = format!(
            "{}/rest/v1/{}?id=eq.{}",
            self.base_url, self.records_table, record_id
        );

        let response = self
            .http
            .patch(&endpoint)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .json(&update)
            .send()
            .await
            .map_err(|e| PipelineError::RecordUpdateFailed {
                record_id: record_id.to_string(),
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(PipelineError::RecordUpdateFailed {
                record_id: record_id.to_string(),
                detail: format!("HTTP {}", response.status()),
            });
        }

        info!("Record {} updated to '{}'", record_id, status.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        let vars = [
            ("SUPABASE_URL", "https://proj.supabase.co"),
            ("SUPABASE_KEY", "service-key"),
            ("BUCKET_NAME", "reports"),
        ];
        AppConfig::from_vars(|name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    #[test]
    fn object_names_are_unique_per_upload() {
        let a = SupabaseClient::object_name();
        let b = SupabaseClient::object_name();
        assert_ne!(a, b);
        assert!(a.starts_with("pl_reports/"));
        assert!(a.ends_with(".pdf"));
    }

    #[test]
    fn public_url_points_at_the_bucket_object() {
        let client = SupabaseClient::new(&test_config());
        let url = client.public_url("pl_reports/abc.pdf");
        assert_eq!(
            url,
            "https://proj.supabase.co/storage/v1/object/public/reports/pl_reports/abc.pdf"
        );
    }
}
