//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{fmt, net::SocketAddr, num::NonZeroUsize, str::FromStr, time::Duration};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::adjacency::AdjacencyStrategy;
use crate::application::site::AdjacencyPolicy;

mod cli;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "newsdesk";
const ENV_PREFIX: &str = "NEWSDESK";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_CMS_ENVIRONMENT: &str = "master";
const DEFAULT_LOCALE: &str = "en-US";
const DEFAULT_COMMENT_CONTENT_TYPE: &str = "comment";
const DEFAULT_GRAPHQL_URL: &str = "https://graphql.contentful.com";
const DEFAULT_DELIVERY_URL: &str = "https://cdn.contentful.com";
const DEFAULT_MANAGEMENT_URL: &str = "https://api.contentful.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cms: CmsSettings,
    pub content: ContentSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// A credential that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Clone)]
pub struct CmsSettings {
    pub space_id: Option<String>,
    pub environment: String,
    pub delivery_token: Option<Secret>,
    pub management_token: Option<Secret>,
    pub preview_token: Option<Secret>,
    pub default_locale: String,
    pub comment_content_type: String,
    pub graphql_url: Url,
    pub delivery_url: Url,
    pub management_url: Url,
    pub request_timeout: Duration,
}

impl CmsSettings {
    /// Keys whose absence disables every CMS call.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.space_id.is_none() {
            missing.push("cms.space_id");
        }
        if self.delivery_token.is_none() {
            missing.push("cms.delivery_token");
        }
        if self.management_token.is_none() {
            missing.push("cms.management_token");
        }
        missing
    }
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub development: bool,
    /// Most published responses kept in the in-process cache.
    pub cache_capacity: NonZeroUsize,
    pub adjacency: AdjacencyPolicy,
    pub preview_secret: Option<Secret>,
    pub revalidate_secret: Option<Secret>,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub url: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    use clap::Parser;

    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cms: RawCmsSettings,
    content: RawContentSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(space) = overrides.cms_space_id.as_ref() {
            self.cms.space_id = Some(space.clone());
        }
        if let Some(environment) = overrides.cms_environment.as_ref() {
            self.cms.environment = Some(environment.clone());
        }
        if let Some(locale) = overrides.cms_default_locale.as_ref() {
            self.cms.default_locale = Some(locale.clone());
        }
        if let Some(url) = overrides.cms_graphql_url.as_ref() {
            self.cms.graphql_url = Some(url.clone());
        }
        if let Some(url) = overrides.cms_delivery_url.as_ref() {
            self.cms.delivery_url = Some(url.clone());
        }
        if let Some(url) = overrides.cms_management_url.as_ref() {
            self.cms.management_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.cms_request_timeout_seconds {
            self.cms.request_timeout_seconds = Some(seconds);
        }
        if let Some(development) = overrides.content_development {
            self.content.development = Some(development);
        }
        if let Some(capacity) = overrides.content_cache_capacity {
            self.content.cache_capacity = Some(capacity);
        }
        if let Some(strategy) = overrides.content_post_adjacency {
            self.content.post_adjacency = Some(strategy);
        }
        if let Some(strategy) = overrides.content_notice_adjacency {
            self.content.notice_adjacency = Some(strategy);
        }
        if let Some(url) = overrides.site_url.as_ref() {
            self.site.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cms,
            content,
            site,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            cms: build_cms_settings(cms)?,
            content: build_content_settings(content)?,
            site: build_site_settings(site)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = non_blank(server.host).unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cms_settings(cms: RawCmsSettings) -> Result<CmsSettings, LoadError> {
    let timeout_secs = cms
        .request_timeout_seconds
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "cms.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CmsSettings {
        space_id: non_blank(cms.space_id),
        environment: non_blank(cms.environment)
            .unwrap_or_else(|| DEFAULT_CMS_ENVIRONMENT.to_string()),
        delivery_token: non_blank(cms.delivery_token).map(Secret::new),
        management_token: non_blank(cms.management_token).map(Secret::new),
        preview_token: non_blank(cms.preview_token).map(Secret::new),
        default_locale: non_blank(cms.default_locale).unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
        comment_content_type: non_blank(cms.comment_content_type)
            .unwrap_or_else(|| DEFAULT_COMMENT_CONTENT_TYPE.to_string()),
        graphql_url: parse_url("cms.graphql_url", cms.graphql_url, DEFAULT_GRAPHQL_URL)?,
        delivery_url: parse_url("cms.delivery_url", cms.delivery_url, DEFAULT_DELIVERY_URL)?,
        management_url: parse_url(
            "cms.management_url",
            cms.management_url,
            DEFAULT_MANAGEMENT_URL,
        )?,
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let capacity = content.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY);
    let cache_capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
        LoadError::invalid("content.cache_capacity", "must be greater than zero")
    })?;

    let defaults = AdjacencyPolicy::default();
    Ok(ContentSettings {
        development: content.development.unwrap_or(false),
        cache_capacity,
        adjacency: AdjacencyPolicy {
            posts: content.post_adjacency.unwrap_or(defaults.posts),
            notices: content.notice_adjacency.unwrap_or(defaults.notices),
        },
        preview_secret: non_blank(content.preview_secret).map(Secret::new),
        revalidate_secret: non_blank(content.revalidate_secret).map(Secret::new),
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let url = parse_url("site.url", site.url, DEFAULT_SITE_URL)?;
    Ok(SiteSettings {
        url: url.as_str().trim_end_matches('/').to_string(),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawCmsSettings {
    space_id: Option<String>,
    environment: Option<String>,
    delivery_token: Option<String>,
    management_token: Option<String>,
    preview_token: Option<String>,
    default_locale: Option<String>,
    comment_content_type: Option<String>,
    graphql_url: Option<String>,
    delivery_url: Option<String>,
    management_url: Option<String>,
    request_timeout_seconds: Option<u64>,
}

impl fmt::Debug for RawCmsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawCmsSettings")
            .field("space_id", &self.space_id)
            .field("environment", &self.environment)
            .field("default_locale", &self.default_locale)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    development: Option<bool>,
    cache_capacity: Option<usize>,
    post_adjacency: Option<AdjacencyStrategy>,
    notice_adjacency: Option<AdjacencyStrategy>,
    preview_secret: Option<String>,
    revalidate_secret: Option<String>,
}

impl fmt::Debug for RawContentSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawContentSettings")
            .field("development", &self.development)
            .field("cache_capacity", &self.cache_capacity)
            .field("post_adjacency", &self.post_adjacency)
            .field("notice_adjacency", &self.notice_adjacency)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    url: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_url(key: &'static str, value: Option<String>, default: &str) -> Result<Url, LoadError> {
    let raw = non_blank(value).unwrap_or_else(|| default.to_string());
    Url::parse(&raw).map_err(|err| LoadError::invalid(key, format!("invalid url `{raw}`: {err}")))
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}
