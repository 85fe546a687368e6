//! Service configuration.
//!
//! Everything the pipeline needs at runtime lives in [`AppConfig`], built
//! once at startup from the process environment. Required values (storage
//! credentials, bucket) missing at startup are a fatal condition; the
//! webhook must never discover a broken configuration one request at a time.
//!
//! The LLM credential itself is owned by `edgequake-llm`'s provider factory
//! (`OPENAI_API_KEY` et al.); this module only decides *which* provider and
//! model to ask for.

use crate::error::PipelineError;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Runtime configuration for the extraction service.
#[derive(Clone)]
pub struct AppConfig {
    /// Bind host for the webhook server. Default: 127.0.0.1.
    pub host: String,

    /// Bind port for the webhook server. Default: 5000.
    pub port: u16,

    /// Base URL of the Supabase project (required, `SUPABASE_URL`).
    pub supabase_url: String,

    /// Service key for storage and record updates (required, `SUPABASE_KEY`).
    pub supabase_key: String,

    /// Storage bucket receiving rendered reports (required, `BUCKET_NAME`).
    pub bucket: String,

    /// Record datastore table holding report rows. Default: "table".
    pub records_table: String,

    /// Rasterisation DPI for page snapshots. Default: 800.
    ///
    /// The financial extractor reads dense numeric tables from these images;
    /// fine print lost at screen DPI is unrecoverable downstream.
    pub snapshot_dpi: u32,

    /// Cap on the longest rendered edge in pixels. Default: 8000.
    ///
    /// 800 DPI on an A4 page is ~6,600 px wide; the cap keeps an oversized
    /// page (posters, fold-outs) from exhausting memory.
    pub max_rendered_pixels: u32,

    /// Timeout for each PDF download in seconds. Default: 30.
    pub download_timeout_secs: u64,

    /// Optional directory for diagnostic copies of the page snapshots.
    /// Never required for correctness.
    pub snapshot_dir: Option<PathBuf>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Named provider (e.g. "openai"), `LLM_PROVIDER`. If unset along with
    /// `provider`, the factory auto-detects from environment keys.
    pub provider_name: Option<String>,

    /// Model identifier, `LLM_MODEL`. Default when a provider is named:
    /// "gpt-4o".
    pub model: Option<String>,

    /// Sampling temperature for both LLM stages. Default: 0.1. Extraction
    /// wants faithfulness, not creativity.
    pub temperature: f32,

    /// Token budget per LLM response. Default: 4096.
    pub max_tokens: usize,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("supabase_url", &self.supabase_url)
            .field("bucket", &self.bucket)
            .field("records_table", &self.records_table)
            .field("snapshot_dpi", &self.snapshot_dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("snapshot_dir", &self.snapshot_dir)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .finish()
    }
}

impl AppConfig {
    /// Build the configuration from the process environment.
    ///
    /// Missing required variables return `Err(InvalidConfig)`; callers are
    /// expected to treat that as fatal at startup.
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. `from_env` in disguise;
    /// split out so configuration parsing is testable without mutating
    /// process-global environment state.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, PipelineError> {
        let required = |name: &str| {
            get(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    PipelineError::InvalidConfig(format!(
                        "Missing required environment variable: {name}"
                    ))
                })
        };

        let parsed = |name: &str, default: u64| -> Result<u64, PipelineError> {
            match get(name) {
                None => Ok(default),
                Some(raw) => raw.parse().map_err(|_| {
                    PipelineError::InvalidConfig(format!("{name} must be a number, got '{raw}'"))
                }),
            }
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parsed("PORT", 5000)? as u16,
            supabase_url: required("SUPABASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            supabase_key: required("SUPABASE_KEY")?,
            bucket: required("BUCKET_NAME")?,
            records_table: get("RECORDS_TABLE").unwrap_or_else(|| "table".to_string()),
            snapshot_dpi: parsed("SNAPSHOT_DPI", 800)? as u32,
            max_rendered_pixels: parsed("MAX_RENDERED_PIXELS", 8000)? as u32,
            download_timeout_secs: parsed("DOWNLOAD_TIMEOUT_SECS", 30)?,
            snapshot_dir: get("SNAPSHOT_DIR").map(PathBuf::from),
            provider: None,
            provider_name: get("LLM_PROVIDER").filter(|v| !v.is_empty()),
            model: get("LLM_MODEL").filter(|v| !v.is_empty()),
            temperature: 0.1,
            max_tokens: 4096,
        })
    }

    /// Socket address string for the HTTP server.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve the LLM provider, from most-specific to least-specific:
    /// a pre-built provider, then a named provider + model, then full
    /// auto-detection from environment API keys.
    pub fn resolve_provider(&self) -> Result<Arc<dyn LLMProvider>, PipelineError> {
        if let Some(ref provider) = self.provider {
            return Ok(Arc::clone(provider));
        }

        if let Some(ref name) = self.provider_name {
            let model = self.model.as_deref().unwrap_or("gpt-4o");
            return ProviderFactory::create_llm_provider(name, model).map_err(|e| {
                PipelineError::ProviderNotConfigured {
                    hint: format!("provider '{name}': {e}"),
                }
            });
        }

        let (provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| PipelineError::ProviderNotConfigured {
                hint: format!(
                    "No LLM provider could be auto-detected from environment. \
                     Set OPENAI_API_KEY or LLM_PROVIDER/LLM_MODEL. Error: {e}"
                ),
            })?;

        Ok(provider)
    }
}
