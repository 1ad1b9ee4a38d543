use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Village socket server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "village-server", version, about = "Village session router")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "VILLAGE_PORT", default_value = "3002")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "VILLAGE_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./village.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "VILLAGE_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Display name given to villages created on first join
    #[arg(long, env = "VILLAGE_DEFAULT_NAME", default_value = "Village ABC")]
    pub default_village_name: String,

    /// Bot endpoint URL; when unset the built-in echo responder is used
    #[arg(long, env = "VILLAGE_BOT_URL")]
    pub bot_url: Option<String>,

    /// Webhook URL for consumer-join notifications; log-only when unset
    #[arg(long, env = "VILLAGE_NOTIFY_WEBHOOK_URL")]
    pub notify_webhook_url: Option<String>,

    /// Access-key verification endpoint; when unset the static
    /// [access_keys] table is used
    #[arg(long, env = "VILLAGE_VERIFY_URL")]
    pub verify_url: Option<String>,

    /// Static agent access keys: village id -> key
    /// (loaded from the [access_keys] section in TOML)
    #[arg(skip)]
    #[serde(default)]
    pub access_keys: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3002,
            bind_address: "0.0.0.0".to_string(),
            config: "./village.toml".to_string(),
            json_logs: false,
            generate_config: false,
            default_village_name: "Village ABC".to_string(),
            bot_url: None,
            notify_webhook_url: None,
            verify_url: None,
            access_keys: HashMap::new(),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (VILLAGE_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("VILLAGE_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Village Socket Server Configuration
# Place this file at ./village.toml or specify with --config <path>
# All settings can be overridden via environment variables (VILLAGE_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 3002)
# port = 3002

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Display name given to villages created on first join
# default_village_name = "Village ABC"

# Bot endpoint for the initial consumer reply.
# POST {"message": "..."} -> {"reply": "..."}
# When unset, a built-in echo responder answers.
# bot_url = "https://example.com/api/answer-user"

# Webhook receiving consumer-join notifications.
# POST {"name", "email", "message", "villageId"}
# When unset, joins are logged only.
# notify_webhook_url = "https://example.com/hooks/consumer-join"

# Access-key verification endpoint for agent joins.
# POST {"accessKey", "villageId"} -> {"valid": true|false}
# When unset, the static [access_keys] table below is consulted.
# verify_url = "https://example.com/api/verify-access-key"

# Static agent access keys, one per village id.
# [access_keys]
# my-village = "change-me"
"#
    .to_string()
}
