//! Vitrine CLI - cart and wishlist from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart with its order summary
//! vitrine cart show
//!
//! # Add two units of a product's first variant
//! vitrine cart add 64f1c0 --quantity 2
//!
//! # Step a line's quantity
//! vitrine cart inc 65a2d1
//! vitrine cart dec 65a2d1
//!
//! # Toggle a product on the wishlist
//! vitrine wishlist toggle 64f1c0
//! ```
//!
//! # Commands
//!
//! - `cart` - Show and change the cart
//! - `wishlist` - Show and toggle wishlist entries
//!
//! The session comes from `VITRINE_SESSION_TOKEN` and `VITRINE_USER_ID`; see
//! `vitrine_storefront::config` for the full list of variables.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitrine_core::QuantityDelta;
use vitrine_storefront::{AppState, StorefrontConfig};

mod commands;

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(author, version, about = "Vitrine cart and wishlist")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Show and toggle wishlist entries
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart lines and totals
    Show,
    /// Add a product variant
    Add {
        /// Product ID
        product: String,

        /// Variant ID (defaults to the product's first variant)
        #[arg(short, long)]
        variant: Option<String>,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Increase a line's quantity by one
    Inc {
        /// Line item ID
        item: String,
    },
    /// Decrease a line's quantity by one
    Dec {
        /// Line item ID
        item: String,
    },
    /// Remove a line
    Remove {
        /// Line item ID
        item: String,
    },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// List wishlist entries
    Show,
    /// Add or remove a product
    Toggle {
        /// Product ID
        product: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Tracing is not set up yet
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Configuration error: {e}");
            }
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for the stores if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vitrine_storefront=info,vitrine_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(config)?;
    state.login(state.session());
    let mut notices = state.notifier().subscribe();

    let result = match cli.command {
        Commands::Cart { action } => {
            commands::cart::load(&state).await?;
            match action {
                CartAction::Show => {
                    commands::cart::show(&state);
                    Ok(())
                }
                CartAction::Add {
                    product,
                    variant,
                    quantity,
                } => commands::cart::add(&state, &product, variant.as_deref(), quantity).await,
                CartAction::Inc { item } => {
                    commands::cart::step(&state, &item, QuantityDelta::Increment).await
                }
                CartAction::Dec { item } => {
                    commands::cart::step(&state, &item, QuantityDelta::Decrement).await
                }
                CartAction::Remove { item } => commands::cart::remove(&state, &item).await,
                CartAction::Clear => commands::cart::clear(&state).await,
            }
        }
        Commands::Wishlist { action } => match action {
            WishlistAction::Show => commands::wishlist::show(&state).await,
            WishlistAction::Toggle { product } => {
                commands::wishlist::toggle(&state, &product).await
            }
        },
    };

    commands::print_notices(&mut notices);
    Ok(result?)
}
