//! Configuration for panel sessions.
//!
//! Supports programmatic configuration and environment variable overrides.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PANELS_PAGE_SIZE` | 50 | Records per page |
//! | `PANELS_MAX_RECORDS` | 5000 | Cached record cap per kind |
//! | `PANELS_SEARCH_DEBOUNCE_MS` | 300 | Search debounce (milliseconds) |
//! | `PANELS_LINKED_FETCH` | true | Fetch linked records after each page |
//! | `PANELS_LINKED_PAGE_SIZE` | 100 | Page size for linked list requests |
//! | `PANELS_LINKED_MAX_PAGES` | unset | Linked pages per link and load |
//! | `PANELS_LOG_LEVEL` | info | Log level |
//!
//! # Example
//!
//! ```rust
//! use helios_panels::PanelsConfig;
//!
//! // Create from environment
//! let config = PanelsConfig::from_env();
//!
//! // Or create programmatically
//! let config = PanelsConfig {
//!     page_size: 25,
//!     linked_fetch: false,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use clap::Parser;

use crate::loader::{LinkedFetchPolicy, LoaderConfig};

/// Panel session configuration.
///
/// Can be constructed from environment variables using [`PanelsConfig::from_env`],
/// from command line arguments using [`PanelsConfig::parse`], or programmatically.
#[derive(Debug, Clone, Parser)]
#[command(name = "panels")]
#[command(about = "Progressive clinical worklist cache")]
pub struct PanelsConfig {
    /// Records requested per page.
    #[arg(long, env = "PANELS_PAGE_SIZE", default_value = "50")]
    pub page_size: u32,

    /// Maximum cached records per resource kind.
    #[arg(long, env = "PANELS_MAX_RECORDS", default_value = "5000")]
    pub max_records: usize,

    /// Search debounce in milliseconds.
    #[arg(long, env = "PANELS_SEARCH_DEBOUNCE_MS", default_value = "300")]
    pub search_debounce_ms: u64,

    /// Fetch linked records (tasks of patients, patients of tasks).
    #[arg(long, env = "PANELS_LINKED_FETCH", default_value = "true", action = clap::ArgAction::Set)]
    pub linked_fetch: bool,

    /// Page size for linked list requests.
    #[arg(long, env = "PANELS_LINKED_PAGE_SIZE", default_value = "100")]
    pub linked_page_size: u32,

    /// Maximum linked pages per link and load (unbounded when unset).
    #[arg(long, env = "PANELS_LINKED_MAX_PAGES")]
    pub linked_max_pages: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "PANELS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for PanelsConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_records: 5000,
            search_debounce_ms: 300,
            linked_fetch: true,
            linked_page_size: 100,
            linked_max_pages: None,
            log_level: "info".to_string(),
        }
    }
}

impl PanelsConfig {
    /// Creates a configuration from environment variables only.
    pub fn from_env() -> Self {
        // Ignore the process arguments; they belong to the host binary.
        Self::try_parse_from(["panels"]).unwrap_or_default()
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.page_size == 0 {
            errors.push("Page size cannot be 0".to_string());
        }

        if self.max_records < self.page_size as usize {
            errors.push("Max records cannot be below page size".to_string());
        }

        if self.linked_page_size == 0 {
            errors.push("Linked page size cannot be 0".to_string());
        }

        if self.linked_max_pages == Some(0) {
            errors.push("Linked max pages cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Loader settings derived from this configuration.
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            page_size: self.page_size,
            max_records: self.max_records,
            linked: LinkedFetchPolicy {
                enabled: self.linked_fetch,
                page_size: self.linked_page_size,
                max_pages: self.linked_max_pages,
            },
        }
    }

    /// The search debounce delay.
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Small pages and a short debounce.
    pub fn for_testing() -> Self {
        Self {
            page_size: 5,
            max_records: 100,
            search_debounce_ms: 50,
            linked_fetch: true,
            linked_page_size: 10,
            linked_max_pages: None,
            log_level: "debug".to_string(),
        }
    }
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` takes
/// precedence over `level`.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("helios_panels={level},panels={level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
