//! Folio - a reader and page server for comic archives and PDFs.
//!
//! This binary starts the HTTP server and provides library inspection tools.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::{
    archiver::{ArchiverCache, LocalBookSource},
    catalog::{BookCatalog, BookRecord, MemoryCatalog},
    config::{CheckConfig, Cli, Command, ServeConfig, SpreadsConfig},
    serve::{PageEncoder, PageService},
    server::{create_shared_router, RouterConfig},
    spread::{Spread, SpreadController},
};

/// How long `spreads` waits for one spread before treating it as unreadable.
const SPREAD_WAIT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config).await,
        Command::Spreads(config) => run_spreads(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Folio v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Library: {}", config.library.display());
    info!(
        "  Cache: {} book(s), {} decode worker(s)",
        config.cache_books, config.decode_workers
    );
    info!(
        "  Pages: fitted to {}px, JPEG quality {}",
        config.page_max_size, config.jpeg_quality
    );

    let catalog = match MemoryCatalog::scan(&config.library) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Failed to scan {}: {}", config.library.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let book_count = catalog.len().await;
    if book_count == 0 {
        warn!("  No books found in {}", config.library.display());
    } else {
        info!("  Found {} book(s)", book_count);
    }

    let cache = Arc::new(ArchiverCache::with_capacity(
        LocalBookSource::new(),
        config.cache_books,
        config.decode_workers,
    ));
    let encoder = PageEncoder::new(config.jpeg_quality, config.page_max_size, config.page_max_size);
    let service = Arc::new(PageService::with_shared_cache(
        Arc::clone(&cache),
        Arc::new(catalog),
        encoder,
    ));
    let router = create_shared_router(service, build_router_config(&config));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/api/v1/books", addr);
    info!("    curl http://{}/images/books/<book_id>/pages/0 -o page.jpg", addr);
    info!("");

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Closing {} cached book(s)", cache.cached_count().await);
    cache.shutdown().await;

    if let Err(e) = result {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "folio=debug,tower_http=debug"
    } else {
        "folio=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_tracing(!config.no_tracing);
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }
    router_config
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Folio Library Check");
    println!("═══════════════════");
    println!();

    if let Err(e) = config.validate() {
        println!("✗ {}", e);
        return ExitCode::FAILURE;
    }

    let catalog = match MemoryCatalog::scan(&config.library) {
        Ok(catalog) => catalog,
        Err(e) => {
            println!("✗ Failed to scan {}: {}", config.library.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let books = catalog.books().await;
    if books.is_empty() {
        println!("  (no books found)");
        return ExitCode::SUCCESS;
    }

    let cache = ArchiverCache::new(LocalBookSource::new());
    let mut failures = 0;
    for book in &books {
        match cache.get(&book.locator).await {
            Ok(source) => println!(
                "✓ {}  {}  {} page(s)  [{}]",
                book.name,
                source.format().name(),
                source.page_count(),
                book.id
            ),
            Err(e) => {
                failures += 1;
                println!("✗ {}  {}", book.name, e);
            }
        }
    }
    cache.shutdown().await;

    println!();
    println!("Total: {} book(s), {} unreadable", books.len(), failures);
    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// =============================================================================
// Spreads Command
// =============================================================================

async fn run_spreads(config: SpreadsConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let cache = ArchiverCache::new(LocalBookSource::new());
    let source = match cache.get(&config.book).await {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut record = BookRecord::from_path(&config.book);
    record.last_page_index = config.start;
    record.page_order = config.page_order();
    let catalog: Arc<dyn BookCatalog> = Arc::new(MemoryCatalog::new(vec![record.clone()]));

    println!(
        "{}  {}  {} page(s)",
        record.name,
        source.format().name(),
        source.page_count()
    );

    let (mut controller, mut events) = SpreadController::activate(&record, source, catalog);
    loop {
        let index = controller.current_page_index();
        match tokio::time::timeout(SPREAD_WAIT, events.recv()).await {
            Ok(Some(spread)) => print_spread(&spread, &controller),
            Ok(None) => break,
            Err(_) => println!("  {:>4}  (no readable pages)", index),
        }

        if !controller.forward() && !controller.forward_single() {
            break;
        }
    }

    let state = controller.deactivate().await;
    cache.shutdown().await;
    println!("Stopped at page {}", state.last_page_index);
    ExitCode::SUCCESS
}

fn print_spread(spread: &Spread, controller: &SpreadController) {
    let pages: Vec<String> = spread
        .in_display_order(controller.page_order())
        .iter()
        .map(|page| format!("{} ({}x{})", page.index, page.image.width(), page.image.height()))
        .collect();
    let layout = spread.layout(controller.state().manual_view_height());
    println!(
        "  {:>4}  {}  → {}x{}",
        spread.index,
        pages.join(" | "),
        layout.content_width,
        layout.content_height
    );
}
