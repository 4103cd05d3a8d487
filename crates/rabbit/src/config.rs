use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rabbit::core::AgentSettings;
use rabbit_openai_model::{OpenAIConfig, OpenAIConfigBuilder};
use serde::{Deserialize, Serialize};

/// The hosted model service to talk to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Ollama,
    #[default]
    Gemini,
}

impl Provider {
    pub const ALL: [Provider; 3] =
        [Provider::Gemini, Provider::Ollama, Provider::OpenAI];

    pub fn name(self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Ollama => "ollama",
            Provider::Gemini => "gemini",
        }
    }

    pub fn needs_api_key(self) -> bool {
        self != Provider::Ollama
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Ollama => "http://localhost:11434/v1",
            Provider::Gemini => {
                "https://generativelanguage.googleapis.com/v1beta/openai"
            }
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-4o-mini",
            Provider::Ollama => "llama3",
            Provider::Gemini => "gemini-pro",
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|provider| provider.name().eq_ignore_ascii_case(s.trim()))
            .with_context(|| format!("unknown provider `{}`", s.trim()))
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            base_url: None,
            api_key: None,
            timeout_seconds: 30,
            temperature: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub require_confirmation: bool,
    pub timeout_seconds: u64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            require_confirmation: true,
            timeout_seconds: 30,
        }
    }
}

/// Settings of the CLI, read from `~/.rabbitai/config.yaml`.
///
/// Missing keys take their defaults and unknown keys are ignored.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub safety: SafetyConfig,
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".rabbitai").join("config.yaml"))
    }

    /// Loads the config from `path`, or from the default location.
    ///
    /// An explicitly given file must exist. A missing file at the default
    /// location yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_owned(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("no config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Writes the config to `path` as YAML, creating missing directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!("saved config to {}", path.display());
        Ok(())
    }

    fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies the `RABBIT_*` overrides from the environment.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(api_key) = var("RABBIT_API_KEY").or_else(|| var("OPENAI_API_KEY"))
        {
            self.llm.api_key = Some(api_key);
        }
        if let Some(base_url) = var("RABBIT_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Some(model) = var("RABBIT_MODEL") {
            self.llm.model = Some(model);
        }
    }

    pub fn model(&self) -> &str {
        self.llm
            .model
            .as_deref()
            .unwrap_or(self.llm.provider.default_model())
    }

    pub fn base_url(&self) -> &str {
        self.llm
            .base_url
            .as_deref()
            .unwrap_or(self.llm.provider.default_base_url())
    }

    pub fn agent_settings(&self) -> AgentSettings {
        AgentSettings {
            max_iterations: self.agent.max_iterations,
            llm_timeout: Duration::from_secs(self.llm.timeout_seconds),
        }
        .sanitized()
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.safety.timeout_seconds.max(1))
    }

    pub fn openai_config(&self) -> Result<OpenAIConfig> {
        let builder = match (&self.llm.api_key, self.llm.provider) {
            (Some(api_key), _) => OpenAIConfigBuilder::with_api_key(api_key),
            (None, Provider::Ollama) => OpenAIConfigBuilder::without_api_key(),
            (None, provider) => bail!(
                "no API key configured for {provider:?}, run `rabbit setup` \
                or set the RABBIT_API_KEY environment variable"
            ),
        };
        Ok(builder
            .with_model(self.model())
            .with_base_url(self.base_url())
            .with_temperature(self.llm.temperature)
            .build())
    }

    /// Returns what the user may try when the provider can't be reached.
    pub fn unavailable_hints(&self) -> Vec<String> {
        match self.llm.provider {
            Provider::Ollama => vec![
                "Make sure Ollama is running: ollama serve".to_owned(),
                format!(
                    "And the model '{0}' is installed: ollama pull {0}",
                    self.model()
                ),
            ],
            _ => vec![format!(
                "Check the API key and the endpoint {}, or run `rabbit setup`",
                self.base_url()
            )],
        }
    }
}
