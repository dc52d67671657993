use clap::{Parser, Subcommand};
use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub path: String, // file path or ":memory:"
    pub pool_size: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

/// Settings for the local Ollama backend.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OllamaSettings {
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub temperature: f32,
    pub top_p: f32,
}

/// Settings for the OpenAI-compatible remote backend.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub provider: Option<String>, // "local"/"ollama", "remote"/"openai", or unset for auto-detect
    pub ollama: OllamaSettings,
    pub openai: OpenAiSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// DuckDB database file (":memory:" for a throwaway database)
    #[arg(long)]
    pub database: Option<String>,

    /// Force an LLM provider instead of auto-detecting (local or remote)
    #[arg(long)]
    pub llm_provider: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Load taxi trip CSV files into the database
    Load {
        /// Specific CSV file to load
        #[arg(long, conflicts_with = "dir")]
        file: Option<PathBuf>,

        /// Directory whose *.csv files are loaded
        #[arg(long, default_value = "archive")]
        dir: PathBuf,

        /// Maximum rows to load per file
        #[arg(long)]
        limit: Option<u64>,

        /// Remove existing rows before loading
        #[arg(long)]
        clear: bool,
    },
}

/// Environment variables that override file configuration, keyed by config path.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("LLM_PROVIDER", "llm.provider"),
    ("OLLAMA_MODEL", "llm.ollama.model"),
    ("OLLAMA_BASE_URL", "llm.ollama.base_url"),
    ("OPENAI_API_KEY", "llm.openai.api_key"),
    ("OPENAI_MODEL", "llm.openai.model"),
    ("OPENAI_BASE_URL", "llm.openai.base_url"),
    ("DATABASE_PATH", "database.path"),
    ("BACKEND_HOST", "web.host"),
    ("BACKEND_PORT", "web.port"),
];

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        Self::load(args, |key| std::env::var(key).ok())
    }

    /// Builds the configuration with an injectable environment lookup.
    pub fn load<F>(args: &CliArgs, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Start with default configuration
        let mut config_builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            let default_locations = [
                "config.toml",
                "config/config.toml",
                "/etc/nl-analyst/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        for (var, key) in ENV_OVERRIDES {
            let value = env(var).filter(|v| !v.trim().is_empty());
            config_builder = config_builder.set_override_option(*key, value)?;
        }

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }
        if let Some(database) = &args.database {
            config.database.path = database.clone();
        }
        if let Some(provider) = &args.llm_provider {
            config.llm.provider = Some(provider.clone());
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "nl-analyst.duckdb".to_string(),
                pool_size: 4,
            },
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ],
            },
            llm: LlmConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: None,
            ollama: OllamaSettings {
                model: "sql-analyst".to_string(),
                base_url: "http://localhost:11434".to_string(),
                timeout_secs: 120,
                probe_timeout_secs: 5,
                temperature: 0.1,
                top_p: 0.9,
            },
            openai: OpenAiSettings {
                api_key: None,
                model: "gpt-4o-mini".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                timeout_secs: 60,
                max_tokens: 500,
            },
        }
    }
}
