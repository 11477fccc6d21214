//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{collections::HashMap, net::SocketAddr, path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::purge::PurgeConfig;

const LOCAL_CONFIG_BASENAME: &str = "autopurge";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_SITE_BASE_URL: &str = "http://localhost";

/// Command-line arguments for the autopurge binary.
#[derive(Debug, Parser)]
#[command(name = "autopurge", version, about = "CDN cache invalidation service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "AUTOPURGE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the notification listener.
    Serve(Box<ServeArgs>),
    /// Submit a manual purge and exit.
    Purge(PurgeArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the purge zone identifier.
    #[arg(long = "purge-zone-id", value_name = "ZONE")]
    pub purge_zone_id: Option<String>,

    /// Override the purge API token.
    #[arg(long = "purge-api-token", value_name = "TOKEN")]
    pub purge_api_token: Option<String>,

    /// Override the public site base URL.
    #[arg(long = "site-base-url", value_name = "URL")]
    pub site_base_url: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct PurgeArgs {
    #[command(subcommand)]
    pub action: PurgeAction,
}

#[derive(Debug, Subcommand, Clone)]
pub enum PurgeAction {
    /// Purge the entire cache.
    Everything,
    /// Purge an explicit URL list (arguments, file, or stdin).
    Urls {
        /// Read newline-delimited URLs from a file instead of arguments.
        #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,

        /// URLs to purge; reads stdin when empty and no file is given.
        urls: Vec<String>,
    },
    /// Purge an explicit cache-tag list (arguments, file, or stdin).
    Tags {
        /// Read newline-delimited tags from a file instead of arguments.
        #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,

        /// Tags to purge; reads stdin when empty and no file is given.
        tags: Vec<String>,
    },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("configuration load failed: {0}")]
    Source(#[from] config::ConfigError),
    #[error("invalid setting `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

impl LoadError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

/// Fully validated runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub purge: PurgeConfig,
    pub site: SiteSettings,
    pub notify: NotifySettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

impl ServerSettings {
    pub fn listen_addr(&self) -> Result<SocketAddr, LoadError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|err| LoadError::invalid("server.host", format!("failed to parse: {err}")))
    }
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Public URL structure of the origin site.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    /// Base URL of the public site, without trailing slash.
    pub base_url: String,
    /// Content types whose changes are purgeable at all.
    pub viewable_types: Vec<String>,
    /// Taxonomy name → URL path prefix (e.g. `post_tag` → `tag`).
    pub taxonomies: HashMap<String, String>,
    /// Content type → archive path (e.g. `post` → `blog`). Types without
    /// an entry have no archive.
    pub archives: HashMap<String, String>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SITE_BASE_URL.to_string(),
            viewable_types: vec!["post".to_string(), "page".to_string()],
            taxonomies: HashMap::from([
                ("category".to_string(), "category".to_string()),
                ("post_tag".to_string(), "tag".to_string()),
            ]),
            archives: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    /// Shared bearer token required on the notify routes; absent leaves
    /// them open for trusted-network deployments.
    pub token: Option<String>,
}

/// Raw deserialization target before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    purge: PurgeConfig,
    site: SiteSettings,
    notify: NotifySettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(zone) = overrides.purge_zone_id.as_ref() {
            self.purge.zone_id = Some(zone.clone());
        }
        if let Some(token) = overrides.purge_api_token.as_ref() {
            self.purge.api_token = Some(token.clone());
        }
        if let Some(base_url) = overrides.site_base_url.as_ref() {
            self.site.base_url = base_url.clone();
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let level = match raw.logging.level {
            Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
                LoadError::invalid("logging.level", format!("failed to parse: {err}"))
            })?,
            None => LevelFilter::INFO,
        };
        let format = if raw.logging.json.unwrap_or(false) {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };

        Ok(Self {
            server: ServerSettings {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: raw.server.port.unwrap_or(DEFAULT_PORT),
                graceful_shutdown_secs: raw
                    .server
                    .graceful_shutdown_secs
                    .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS),
            },
            logging: LoggingSettings { level, format },
            purge: raw.purge,
            site: raw.site,
            notify: raw.notify,
        })
    }
}

/// Load settings with layered precedence: local file, explicit file, env,
/// then CLI overrides.
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder =
        Config::builder().add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("AUTOPURGE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Purge(_)) | None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Parse CLI arguments and load the settings they select.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
