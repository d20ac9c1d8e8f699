use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

use crate::application::adjacency::AdjacencyStrategy;

/// Command-line arguments for the Newsdesk binary.
#[derive(Debug, Parser)]
#[command(name = "newsdesk", version, about = "Newsdesk content server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "NEWSDESK_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
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

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

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

    /// Override the CMS space id.
    #[arg(long = "cms-space-id", value_name = "ID")]
    pub cms_space_id: Option<String>,

    /// Override the CMS environment.
    #[arg(long = "cms-environment", value_name = "NAME")]
    pub cms_environment: Option<String>,

    /// Override the locale used for comment fields.
    #[arg(long = "cms-default-locale", value_name = "LOCALE")]
    pub cms_default_locale: Option<String>,

    /// Override the GraphQL content endpoint base URL.
    #[arg(long = "cms-graphql-url", value_name = "URL")]
    pub cms_graphql_url: Option<String>,

    /// Override the delivery API base URL.
    #[arg(long = "cms-delivery-url", value_name = "URL")]
    pub cms_delivery_url: Option<String>,

    /// Override the management API base URL.
    #[arg(long = "cms-management-url", value_name = "URL")]
    pub cms_management_url: Option<String>,

    /// Override the per-request upstream timeout.
    #[arg(long = "cms-request-timeout-seconds", value_name = "SECONDS")]
    pub cms_request_timeout_seconds: Option<u64>,

    /// Disable response caching.
    #[arg(
        long = "content-development",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub content_development: Option<bool>,

    /// Override the number of cached content responses.
    #[arg(long = "content-cache-capacity", value_name = "COUNT")]
    pub content_cache_capacity: Option<usize>,

    /// Neighbour lookup used for posts.
    #[arg(long = "content-post-adjacency", value_name = "STRATEGY", value_parser = parse_strategy)]
    pub content_post_adjacency: Option<AdjacencyStrategy>,

    /// Neighbour lookup used for notices.
    #[arg(long = "content-notice-adjacency", value_name = "STRATEGY", value_parser = parse_strategy)]
    pub content_notice_adjacency: Option<AdjacencyStrategy>,

    /// Override the public site URL used in the sitemap.
    #[arg(long = "site-url", value_name = "URL")]
    pub site_url: Option<String>,
}

fn parse_strategy(raw: &str) -> Result<AdjacencyStrategy, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "scan" => Ok(AdjacencyStrategy::Scan),
        "range" => Ok(AdjacencyStrategy::Range),
        other => Err(format!("unknown adjacency strategy `{other}` (expected scan|range)")),
    }
}
