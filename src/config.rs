//! Configuration management for Folio.
//!
//! Settings come from:
//! - Command-line arguments via clap
//! - Environment variables with the `FOLIO_` prefix
//! - Defaults for everything except the library directory
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use folio::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Check(config) => println!("Checking {}", config.library.display()),
//!     Command::Spreads(config) => println!("Walking {}", config.book.display()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `FOLIO_HOST` - Server bind address (default: 0.0.0.0)
//! - `FOLIO_PORT` - Server port (default: 8080)
//! - `FOLIO_LIBRARY` - Directory scanned for books (required)
//! - `FOLIO_CACHE_BOOKS` - Open books kept in the cache (default: 1)
//! - `FOLIO_DECODE_WORKERS` - Decodes running at once across all books (default: 4)
//! - `FOLIO_PAGE_MAX_SIZE` - Bounding box edge for served pages (default: 1024)
//! - `FOLIO_JPEG_QUALITY` - JPEG quality for pages and thumbnails (default: 80)
//! - `FOLIO_CORS_ORIGINS` - Comma-separated allowed origins (default: any)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::archiver::{DEFAULT_BOOK_CACHE_CAPACITY, DEFAULT_DECODE_WORKERS};
use crate::serve::{DEFAULT_JPEG_QUALITY, DEFAULT_PAGE_MAX_SIZE, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY};
use crate::spread::PageOrder;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Smallest accepted page bounding box edge.
pub const MIN_PAGE_MAX_SIZE: u32 = 64;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Folio - a reader and page server for comic archives and PDFs.
#[derive(Parser, Debug, Clone)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the library over HTTP.
    Serve(ServeConfig),

    /// Scan the library and report every book's format and page count.
    Check(CheckConfig),

    /// Open one book and print the spreads a reader would see.
    Spreads(SpreadsConfig),
}

// =============================================================================
// Serve
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "FOLIO_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "FOLIO_PORT")]
    pub port: u16,

    // =========================================================================
    // Library Configuration
    // =========================================================================
    /// Directory scanned recursively for .cbz, .zip and .pdf files.
    #[arg(long, env = "FOLIO_LIBRARY")]
    pub library: PathBuf,

    // =========================================================================
    // Cache and Decode Configuration
    // =========================================================================
    /// Number of open books kept in the cache.
    #[arg(long, default_value_t = DEFAULT_BOOK_CACHE_CAPACITY, env = "FOLIO_CACHE_BOOKS")]
    pub cache_books: usize,

    /// Maximum decodes running at once across all books.
    #[arg(long, default_value_t = DEFAULT_DECODE_WORKERS, env = "FOLIO_DECODE_WORKERS")]
    pub decode_workers: usize,

    // =========================================================================
    // Encoding Configuration
    // =========================================================================
    /// Served pages are fitted into a square of this many pixels.
    #[arg(long, default_value_t = DEFAULT_PAGE_MAX_SIZE, env = "FOLIO_PAGE_MAX_SIZE")]
    pub page_max_size: u32,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "FOLIO_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "FOLIO_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_books == 0 {
            return Err("cache_books must be greater than 0".to_string());
        }
        if self.decode_workers == 0 {
            return Err("decode_workers must be greater than 0".to_string());
        }
        if !(MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&self.jpeg_quality) {
            return Err(format!(
                "jpeg_quality must be between {} and {}",
                MIN_JPEG_QUALITY, MAX_JPEG_QUALITY
            ));
        }
        if self.page_max_size < MIN_PAGE_MAX_SIZE {
            return Err(format!(
                "page_max_size must be at least {} pixels",
                MIN_PAGE_MAX_SIZE
            ));
        }
        validate_library(&self.library)
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Check
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Directory scanned recursively for books.
    #[arg(long, env = "FOLIO_LIBRARY")]
    pub library: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CheckConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_library(&self.library)
    }
}

// =============================================================================
// Spreads
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct SpreadsConfig {
    /// Book file to open.
    pub book: PathBuf,

    /// Page the walk starts from.
    #[arg(long, default_value_t = 0)]
    pub start: usize,

    /// Read left to right instead of right to left.
    #[arg(long, default_value_t = false)]
    pub left_to_right: bool,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl SpreadsConfig {
    pub fn page_order(&self) -> PageOrder {
        PageOrder::from_right_to_left(!self.left_to_right)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.book.is_file() {
            return Err(format!("{} is not a file", self.book.display()));
        }
        Ok(())
    }
}

fn validate_library(library: &std::path::Path) -> Result<(), String> {
    if !library.is_dir() {
        return Err(format!(
            "Library {} is not a directory. Set --library or FOLIO_LIBRARY",
            library.display()
        ));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
