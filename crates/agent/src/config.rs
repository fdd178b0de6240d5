use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModelProvider {
    #[serde(rename = "groq")]
    Groq,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "mock")]
    Mock,
}

impl Default for ModelProvider {
    fn default() -> Self {
        ModelProvider::Groq
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub cluster: ClusterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ModelProvider,
    pub model: String,
    pub api_key: String,
    /// Base URL override for OpenAI-compatible endpoints.
    pub endpoint: Option<String>,
    pub temperature: f64,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    /// Skip TLS certificate verification when talking to the model endpoint.
    /// Development escape hatch only; logged loudly whenever enabled.
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub max_iterations: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub default_namespace: String,
    pub tool_timeout_secs: u64,
    pub max_output_bytes: usize,
    pub log_tail_lines: i64,
}

impl Config {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Config {
            server: ServerConfig {
                addr: std::env::var("SERVER_ADDR")
                    .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            },
            llm: LlmConfig {
                provider: match std::env::var("LLM_PROVIDER")
                    .unwrap_or_else(|_| "groq".to_string())
                    .to_lowercase()
                    .as_str()
                {
                    "groq" => ModelProvider::Groq,
                    "openai" => ModelProvider::OpenAi,
                    "anthropic" => ModelProvider::Anthropic,
                    "mock" => ModelProvider::Mock,
                    other => {
                        return Err(crate::Error::Config(format!(
                            "unknown LLM_PROVIDER '{}' (expected groq, openai, anthropic or mock)",
                            other
                        )))
                    }
                },
                model: std::env::var("LLM_MODEL")
                    .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
                api_key: std::env::var("LLM_API_KEY").unwrap_or_else(|_| "".to_string()),
                endpoint: std::env::var("LLM_ENDPOINT").ok(),
                temperature: std::env::var("LLM_TEMPERATURE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0.0),
                max_retries: std::env::var("LLM_MAX_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
                request_timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
                accept_invalid_certs: std::env::var("LLM_ACCEPT_INVALID_CERTS")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(false),
            },
            agent: AgentConfig {
                max_iterations: std::env::var("AGENT_MAX_ITERATIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            },
            cluster: ClusterConfig {
                default_namespace: std::env::var("CLUSTER_NAMESPACE")
                    .unwrap_or_else(|_| "default".to_string()),
                tool_timeout_secs: std::env::var("TOOL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
                max_output_bytes: std::env::var("TOOL_OUTPUT_MAX_BYTES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(4096),
                log_tail_lines: std::env::var("LOG_TAIL_LINES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(50),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.llm.api_key.is_empty() && self.llm.provider != ModelProvider::Mock {
            tracing::warn!(
                "LLM_API_KEY is not set. Requests to the model endpoint will be rejected."
            );
        }

        if let Some(endpoint) = &self.llm.endpoint {
            url::Url::parse(endpoint).map_err(|e| {
                crate::Error::Config(format!("LLM_ENDPOINT '{}' is not a valid URL: {}", endpoint, e))
            })?;
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(crate::Error::Config(format!(
                "LLM_TEMPERATURE must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.agent.max_iterations == 0 {
            return Err(crate::Error::Config(
                "AGENT_MAX_ITERATIONS must be at least 1".to_string(),
            ));
        }

        if self.llm.accept_invalid_certs {
            tracing::warn!(
                "LLM_ACCEPT_INVALID_CERTS is enabled: TLS certificate verification for the \
                 model endpoint is DISABLED. Never use this outside development."
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                addr: "0.0.0.0:8080".to_string(),
            },
            llm: LlmConfig {
                provider: ModelProvider::Groq,
                model: "llama-3.3-70b-versatile".to_string(),
                api_key: "".to_string(),
                endpoint: None,
                temperature: 0.0,
                max_retries: 2,
                request_timeout_secs: 60,
                accept_invalid_certs: false,
            },
            agent: AgentConfig {
                max_iterations: 10,
                request_timeout_secs: 300,
            },
            cluster: ClusterConfig {
                default_namespace: "default".to_string(),
                tool_timeout_secs: 15,
                max_output_bytes: 4096,
                log_tail_lines: 50,
            },
        }
    }
}
