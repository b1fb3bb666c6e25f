//! Source configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use nomenq_core::manager::{ManagerConfig, QuestionManager};
use nomenq_core::traits::QuestionSource;

use crate::gemini::GeminiSource;
use crate::mock::MockSource;
use crate::ollama::OllamaSource;

/// Configuration for a single question source.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in
/// logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Gemini {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default)]
        model: Option<String>,
    },
    Mock,
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceConfig::Gemini {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            SourceConfig::Ollama { base_url, model } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            SourceConfig::Mock => f.debug_struct("Mock").finish(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Buffer and history tunables, the `[buffers]` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferSettings {
    /// Per-level buffer capacity target.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Questions per background refill batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Prompt history window capacity.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Recent prompts forwarded to the source as an avoid-list.
    #[serde(default = "default_avoid_limit")]
    pub avoid_limit: usize,
    /// Pause between refill dispatches, in milliseconds.
    #[serde(default = "default_refill_stagger_ms")]
    pub refill_stagger_ms: u64,
}

fn default_buffer_size() -> usize {
    40
}
fn default_batch_size() -> usize {
    5
}
fn default_max_history() -> usize {
    200
}
fn default_avoid_limit() -> usize {
    50
}
fn default_refill_stagger_ms() -> u64 {
    100
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            batch_size: default_batch_size(),
            max_history: default_max_history(),
            avoid_limit: default_avoid_limit(),
            refill_stagger_ms: default_refill_stagger_ms(),
        }
    }
}

impl From<BufferSettings> for ManagerConfig {
    fn from(settings: BufferSettings) -> Self {
        ManagerConfig {
            buffer_size: settings.buffer_size,
            batch_size: settings.batch_size,
            max_history: settings.max_history,
            avoid_limit: settings.avoid_limit,
            refill_stagger: Duration::from_millis(settings.refill_stagger_ms),
        }
    }
}

/// Top-level nomenq configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NomenqConfig {
    /// Source configurations keyed by name.
    #[serde(default)]
    pub sources: HashMap<String, SourceConfig>,
    /// Source the manager is built against.
    #[serde(default = "default_source")]
    pub default_source: String,
    /// Buffer and history tunables.
    #[serde(default)]
    pub buffers: BufferSettings,
}

fn default_source() -> String {
    "gemini".to_string()
}

impl Default for NomenqConfig {
    fn default() -> Self {
        Self {
            sources: HashMap::new(),
            default_source: default_source(),
            buffers: BufferSettings::default(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Resolve env vars in a source config.
fn resolve_source_config(config: &SourceConfig) -> SourceConfig {
    match config {
        SourceConfig::Gemini {
            api_key,
            base_url,
            model,
        } => SourceConfig::Gemini {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            model: model.clone(),
        },
        SourceConfig::Ollama { base_url, model } => SourceConfig::Ollama {
            base_url: resolve_env_vars(base_url),
            model: model.clone(),
        },
        SourceConfig::Mock => SourceConfig::Mock,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `nomenq.toml` in the current directory
/// 2. `~/.config/nomenq/config.toml`
///
/// Environment variable override: `NOMENQ_GEMINI_KEY`.
pub fn load_config() -> Result<NomenqConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<NomenqConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("nomenq.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<NomenqConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => NomenqConfig::default(),
    };

    // Apply env var overrides
    if let Ok(key) = std::env::var("NOMENQ_GEMINI_KEY") {
        config
            .sources
            .entry("gemini".into())
            .or_insert(SourceConfig::Gemini {
                api_key: String::new(),
                base_url: None,
                model: None,
            });
        if let Some(SourceConfig::Gemini { api_key, .. }) = config.sources.get_mut("gemini") {
            *api_key = key;
        }
    }

    // Resolve env vars in all source configs
    let resolved: HashMap<String, SourceConfig> = config
        .sources
        .iter()
        .map(|(k, v)| (k.clone(), resolve_source_config(v)))
        .collect();
    config.sources = resolved;

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("nomenq"))
}

/// Create a source instance from its configuration.
pub fn create_source(config: &SourceConfig) -> Result<Arc<dyn QuestionSource>> {
    match config {
        SourceConfig::Gemini {
            api_key,
            base_url,
            model,
        } => {
            let mut source = GeminiSource::new(api_key, base_url.clone());
            if let Some(model) = model {
                source = source.with_model(model);
            }
            Ok(Arc::new(source))
        }
        SourceConfig::Ollama { base_url, model } => {
            let mut source = OllamaSource::new(base_url);
            if let Some(model) = model {
                source = source.with_model(model);
            }
            Ok(Arc::new(source))
        }
        SourceConfig::Mock => Ok(Arc::new(MockSource::new())),
    }
}

/// Build a question manager from the configured default source.
pub fn build_manager(config: &NomenqConfig) -> Result<QuestionManager> {
    let source_config = config
        .sources
        .get(&config.default_source)
        .with_context(|| format!("default source '{}' not configured", config.default_source))?;
    let source = create_source(source_config)?;
    Ok(QuestionManager::new(source, config.buffers.clone().into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_NOMENQ_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_NOMENQ_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_NOMENQ_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_NOMENQ_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = NomenqConfig::default();
        assert_eq!(config.default_source, "gemini");
        assert_eq!(config.buffers.buffer_size, 40);
        assert_eq!(config.buffers.batch_size, 5);
        assert_eq!(config.buffers.max_history, 200);
        assert_eq!(config.buffers.avoid_limit, 50);
    }

    #[test]
    fn parse_source_configs() {
        let toml_str = r#"
default_source = "gemini"

[sources.gemini]
type = "gemini"
api_key = "sk-test"

[sources.ollama]
type = "ollama"
base_url = "http://localhost:11434"
model = "qwen2.5"

[sources.mock]
type = "mock"

[buffers]
buffer_size = 10
refill_stagger_ms = 50
"#;
        let config: NomenqConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sources.len(), 3);
        assert!(matches!(
            config.sources.get("gemini"),
            Some(SourceConfig::Gemini { .. })
        ));
        assert_eq!(config.buffers.buffer_size, 10);
        assert_eq!(config.buffers.refill_stagger_ms, 50);
        // Unset fields keep their defaults.
        assert_eq!(config.buffers.batch_size, 5);
    }

    #[test]
    fn debug_masks_api_keys() {
        let config = SourceConfig::Gemini {
            api_key: "sk-secret".into(),
            base_url: None,
            model: None,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn create_source_covers_every_variant() {
        let gemini = create_source(&SourceConfig::Gemini {
            api_key: "k".into(),
            base_url: None,
            model: Some("gemini-2.0-flash".into()),
        })
        .unwrap();
        assert_eq!(gemini.name(), "gemini");

        let ollama = create_source(&SourceConfig::Ollama {
            base_url: default_ollama_url(),
            model: None,
        })
        .unwrap();
        assert_eq!(ollama.name(), "ollama");

        let mock = create_source(&SourceConfig::Mock).unwrap();
        assert_eq!(mock.name(), "mock");
    }

    #[test]
    fn build_manager_requires_a_configured_default() {
        let config = NomenqConfig::default();
        assert!(build_manager(&config).is_err());

        let mut config = NomenqConfig::default();
        config.sources.insert("mock".into(), SourceConfig::Mock);
        config.default_source = "mock".into();
        assert!(build_manager(&config).is_ok());
    }
}
