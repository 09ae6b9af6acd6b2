//! Environment-driven configuration.
//!
//! The backend and coach modes are decided once here, at startup: a remote
//! persistence backend needs both its URL and key, a remote coach needs an
//! API key (assistant id and base URL have defaults). Anything missing
//! falls back to local-only operation.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Remote persistence backend connection.
#[derive(Debug, Clone)]
pub struct RemoteBackendConfig {
    pub url: String,
    pub api_key: String,
}

/// Hosted assistant connection for the coach.
#[derive(Debug, Clone)]
pub struct CoachConfig {
    pub api_key: String,
    pub assistant_id: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub user_id: String,
    pub bind: SocketAddr,
    pub backend: Option<RemoteBackendConfig>,
    pub coach: Option<CoachConfig>,
}

const DEFAULT_BIND: &str = "127.0.0.1:8787";
const DEFAULT_MODEL_URL: &str = "https://api.openai.com";

impl Config {
    pub fn from_env() -> Self {
        let data_dir = env::var("TASKCOACH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".taskcoach")
            });

        let user_id = env::var("TASKCOACH_USER").unwrap_or_else(|_| "local".to_string());

        let bind = env::var("TASKCOACH_BIND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| DEFAULT_BIND.parse().expect("default bind address"));

        let backend = match (
            env::var("TASKCOACH_BACKEND_URL"),
            env::var("TASKCOACH_BACKEND_KEY"),
        ) {
            (Ok(url), Ok(api_key)) if !url.is_empty() && !api_key.is_empty() => {
                Some(RemoteBackendConfig { url, api_key })
            }
            _ => None,
        };

        let coach = match env::var("TASKCOACH_MODEL_API_KEY") {
            Ok(api_key) if !api_key.is_empty() => Some(CoachConfig {
                api_key,
                assistant_id: env::var("TASKCOACH_ASSISTANT_ID")
                    .unwrap_or_else(|_| "default".to_string()),
                base_url: env::var("TASKCOACH_MODEL_URL")
                    .unwrap_or_else(|_| DEFAULT_MODEL_URL.to_string()),
            }),
            _ => None,
        };

        Config {
            data_dir,
            user_id,
            bind,
            backend,
            coach,
        }
    }

    /// Path of the local fallback task file.
    pub fn local_store_path(&self) -> PathBuf {
        self.data_dir.join("tasks.json")
    }
}
