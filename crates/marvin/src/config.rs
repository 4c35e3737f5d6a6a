// crates/marvin/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::completion::{CompletionOptions, DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL};
use crate::prompts::MARVIN_SYSTEM_PROMPT;

/// Where sessions, profiles and documents live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Supabase,
    /// Process-local store with static dev tokens; nothing persists.
    Memory,
}

impl FromStr for BackendMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "supabase" => Ok(Self::Supabase),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!(
                "Unknown MARVIN_BACKEND '{}'. Expected 'supabase' or 'memory'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub backend: BackendMode,
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub completion: CompletionOptions,
    pub embedding_model: String,
    pub system_prompt: String,
    pub request_timeout_seconds: u64,
    pub upstream_timeout_seconds: u64,
    pub rag_enabled: bool,
    pub rag_top_k: usize,
    pub rag_min_similarity: f32,
    pub admin_user_ids: Vec<String>,
    /// `(token, user_id)` pairs accepted in memory mode.
    pub dev_tokens: Vec<(String, String)>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }

        Self::from_vars(|key| env::var(key))
    }

    /// Build the configuration from any variable source shaped like `env::var`.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let backend: BackendMode = var("MARVIN_BACKEND")
            .unwrap_or_else(|_| "supabase".into())
            .parse()?;

        let openai_api_key = var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set. Please set it in your .env file")?;

        let supabase_url = var("NEXT_PUBLIC_SUPABASE_URL")
            .or_else(|_| var("SUPABASE_URL"))
            .unwrap_or_default();
        let supabase_anon_key = var("NEXT_PUBLIC_SUPABASE_ANON_KEY")
            .or_else(|_| var("SUPABASE_ANON_KEY"))
            .unwrap_or_default();
        let supabase_service_role_key = var("SUPABASE_SERVICE_ROLE_KEY").unwrap_or_default();

        if backend == BackendMode::Supabase {
            for (name, value) in [
                ("NEXT_PUBLIC_SUPABASE_URL", &supabase_url),
                ("NEXT_PUBLIC_SUPABASE_ANON_KEY", &supabase_anon_key),
                ("SUPABASE_SERVICE_ROLE_KEY", &supabase_service_role_key),
            ] {
                if value.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "{} environment variable not set. Set it or run with MARVIN_BACKEND=memory",
                        name
                    ));
                }
            }
        }

        let system_prompt = match var("MARVIN_SYSTEM_PROMPT_FILE") {
            Ok(path) => std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read system prompt from {}", path))?
                .trim()
                .to_string(),
            Err(_) => MARVIN_SYSTEM_PROMPT.to_string(),
        };

        let completion = CompletionOptions {
            model: var("MARVIN_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
            temperature: var("MARVIN_TEMPERATURE").unwrap_or_else(|_| "0.7".into()).parse()?,
            max_tokens: var("MARVIN_MAX_TOKENS").unwrap_or_else(|_| "800".into()).parse()?,
            frequency_penalty: var("MARVIN_FREQUENCY_PENALTY")
                .unwrap_or_else(|_| "0.1".into())
                .parse()?,
            presence_penalty: var("MARVIN_PRESENCE_PENALTY")
                .unwrap_or_else(|_| "0.1".into())
                .parse()?,
        };

        let dev_tokens = parse_dev_tokens(&var("MARVIN_DEV_TOKENS").unwrap_or_default());
        if backend == BackendMode::Memory && dev_tokens.is_empty() {
            warn!("MARVIN_BACKEND=memory without MARVIN_DEV_TOKENS; every request will be rejected");
        }

        Ok(Self {
            api_host: var("API_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            api_port: var("API_PORT").unwrap_or_else(|_| "3000".into()).parse()?,
            backend,
            openai_api_key,
            openai_api_base: var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            supabase_url,
            supabase_anon_key,
            supabase_service_role_key,
            completion,
            embedding_model: var("MARVIN_EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.into()),
            system_prompt,
            request_timeout_seconds: var("MARVIN_REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "120".into())
                .parse()?,
            upstream_timeout_seconds: var("MARVIN_UPSTREAM_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "60".into())
                .parse()?,
            rag_enabled: var("RAG_ENABLED").unwrap_or_else(|_| "false".into()).parse()?,
            rag_top_k: var("MARVIN_RAG_TOP_K").unwrap_or_else(|_| "3".into()).parse()?,
            rag_min_similarity: var("MARVIN_RAG_MIN_SIMILARITY")
                .unwrap_or_else(|_| "0.5".into())
                .parse()?,
            admin_user_ids: var("ADMIN_USER_IDS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect(),
            dev_tokens,
        })
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- API: {}:{}", self.api_host, self.api_port);
        info!("- Backend: {:?}", self.backend);
        if self.backend == BackendMode::Supabase {
            info!("- Supabase URL: {}", self.supabase_url);
            info!("- Supabase Service Key: {}", redact(&self.supabase_service_role_key));
        }
        info!("- OpenAI Base: {}", self.openai_api_base);
        info!("- OpenAI Key: {}", redact(&self.openai_api_key));
        info!(
            "- Model: {} (temperature {}, max tokens {})",
            self.completion.model, self.completion.temperature, self.completion.max_tokens
        );
        info!("- Embedding Model: {}", self.embedding_model);
        info!(
            "- RAG: {} (top {}, min similarity {})",
            if self.rag_enabled { "enabled" } else { "disabled" },
            self.rag_top_k,
            self.rag_min_similarity
        );
        info!("- Request Timeout: {}s", self.request_timeout_seconds);
        info!("- Upstream Timeout: {}s", self.upstream_timeout_seconds);
        info!("- Admin Users: {}", self.admin_user_ids.len());
    }

    pub fn api_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api_host, self.api_port)
            .parse()
            .with_context(|| format!("Invalid API address {}:{}", self.api_host, self.api_port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_user_ids.iter().any(|id| id == user_id)
    }
}

/// `token=user_id` pairs separated by commas; malformed entries are skipped.
fn parse_dev_tokens(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(token, user)| (token.trim().to_string(), user.trim().to_string()))
        .filter(|(token, user)| !token.is_empty() && !user.is_empty())
        .collect()
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return "<unset>".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{}***", visible)
}
