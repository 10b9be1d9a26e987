use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Server {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Static content root and the document served at `/`.
#[derive(Debug, Clone, Deserialize)]
pub struct Assets {
    pub root: PathBuf,
    pub index: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub assets: Assets,
    pub log: Log,
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3000)?
        .set_default("assets.root", "public")?
        .set_default("assets.index", "index.html")?
        .set_default("log.level", "info")
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = defaults()?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("app").separator("_"))
            .build()?;

        s.try_deserialize()
    }
}
