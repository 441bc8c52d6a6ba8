//! # mezze-api: Operation Surface for Mezze POS
//!
//! Entry point for the till and back-office frontends. Every operation is a
//! plain async function taking the [`PosEngine`] and returning an
//! [`Outcome`], which serialises to `{success: true, ...}` or
//! `{success: false, code, message}`.
//!
//! ## Module Organization
//! ```text
//! mezze_api/
//! ├── lib.rs          ◄─── You are here (engine startup, tracing)
//! ├── engine.rs       ◄─── PosEngine: database + configuration
//! ├── config.rs       ◄─── EngineConfig loading (env → toml → defaults)
//! ├── outcome.rs      ◄─── success / failure envelope
//! ├── error.rs        ◄─── ApiError { code, message }
//! └── commands/
//!     ├── sale.rs       ◄─── create_sale, print flag
//!     ├── held.rs       ◄─── hold / list / resume / delete parked carts
//!     ├── purchase.rs   ◄─── supplier invoices and payments
//!     ├── inventory.rs  ◄─── manual stock corrections, reorder list
//!     └── shift.rs      ◄─── open, X-report, close
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Engine Startup                                 │
//! │                                                                         │
//! │  1. init_tracing()                                                      │
//! │     • tracing-subscriber with env filter                                │
//! │     • Default: info,mezze=debug,sqlx=warn (RUST_LOG overrides)          │
//! │                                                                         │
//! │  2. EngineConfig::load()                                                │
//! │     • MEZZE_* env vars, then mezze.toml, then defaults                  │
//! │                                                                         │
//! │  3. PosEngine::open(config)                                             │
//! │     • SQLite with WAL mode                                              │
//! │     • Run pending migrations                                            │
//! │     • Numbering prefixes and retry budget from config                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! mezze_api::init_tracing();
//! let engine = PosEngine::open(EngineConfig::load()?).await?;
//!
//! let outcome = commands::sale::create_sale(&engine, &actor, &header, &items).await;
//! println!("{}", serde_json::to_string(&outcome)?);
//! ```

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod outcome;

pub use config::{ConfigError, EngineConfig};
pub use engine::PosEngine;
pub use error::{ApiError, ErrorCode};
pub use outcome::Outcome;

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=mezze=trace` - Show trace for mezze crates only
/// - Default: INFO, DEBUG for mezze crates
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mezze=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
