//! Configuration for building a case package.
//!
//! All behaviour is controlled through [`CasePackConfig`], built via its
//! [`CasePackConfigBuilder`]. One struct covers every variant of the flow:
//! with or without a form template, with or without an archive, with any
//! provider.

use crate::error::CasePackError;
use crate::pipeline::normalize::NormalizeOptions;
use crate::pipeline::render::PageLayout;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default location of the reference I-130 template.
pub const DEFAULT_FORM_TEMPLATE: &str = "forms/i-130_form.pdf";

/// Configuration for one case-package build.
///
/// # Example
/// ```rust
/// use casepack::CasePackConfig;
///
/// let config = CasePackConfig::builder()
///     .output_dir("out")
///     .model("gpt-4.1-nano")
///     .archive(false)
///     .build()
///     .unwrap();
/// assert!(!config.archive);
/// ```
#[derive(Clone)]
pub struct CasePackConfig {
    /// LLM model identifier, e.g. "gpt-4.1-nano".
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.4.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 2048.
    pub max_tokens: usize,

    /// Retry attempts on a failed model call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call model timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for a template URL in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Directory every artifact is written to. Default: `generated`.
    pub output_dir: PathBuf,

    /// Reference form (local path or HTTP(S) URL). None skips form filling.
    pub form_template: Option<String>,

    /// Schema id used to build the field map. Default: `i-130`.
    pub form_id: String,

    /// Bundle the PDFs into a `.tar.gz`. Default: true.
    pub archive: bool,

    pub normalize: NormalizeOptions,

    pub layout: PageLayout,
}

impl Default for CasePackConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.4,
            max_tokens: 2048,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            system_prompt: None,
            output_dir: PathBuf::from("generated"),
            form_template: Some(DEFAULT_FORM_TEMPLATE.to_string()),
            form_id: crate::forms::I130.id.to_string(),
            archive: true,
            normalize: NormalizeOptions::default(),
            layout: PageLayout::default(),
        }
    }
}

impl fmt::Debug for CasePackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CasePackConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("output_dir", &self.output_dir)
            .field("form_template", &self.form_template)
            .field("form_id", &self.form_id)
            .field("archive", &self.archive)
            .field("normalize", &self.normalize)
            .finish()
    }
}

impl CasePackConfig {
    /// Create a new builder for `CasePackConfig`.
    pub fn builder() -> CasePackConfigBuilder {
        CasePackConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CasePackConfig`].
#[derive(Debug)]
pub struct CasePackConfigBuilder {
    config: CasePackConfig,
}

impl CasePackConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn form_template(mut self, template: impl Into<String>) -> Self {
        self.config.form_template = Some(template.into());
        self
    }

    /// Skip form filling entirely.
    pub fn no_form(mut self) -> Self {
        self.config.form_template = None;
        self
    }

    pub fn form_id(mut self, id: impl Into<String>) -> Self {
        self.config.form_id = id.into();
        self
    }

    pub fn archive(mut self, v: bool) -> Self {
        self.config.archive = v;
        self
    }

    pub fn repair_split_words(mut self, v: bool) -> Self {
        self.config.normalize.repair_split_words = v;
        self
    }

    pub fn layout(mut self, layout: PageLayout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CasePackConfig, CasePackError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(CasePackError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(CasePackError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(CasePackError::InvalidConfig(
                "output_dir must not be empty".into(),
            ));
        }
        if c.form_template.is_some() && crate::forms::FormSchema::lookup(&c.form_id).is_none() {
            return Err(CasePackError::InvalidConfig(format!(
                "unknown form id '{}'",
                c.form_id
            )));
        }
        c.layout.validate()?;
        Ok(self.config)
    }
}
