use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub editor: EditorConfig,
}

#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct EditorConfig {
    pub project_id: String,
    pub audio_source: String,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_tick_ms() -> u64 {
    100
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("DUBWAVE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
