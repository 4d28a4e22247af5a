//! # Snapshot Loader
//!
//! Idempotent ingestion of work-tracking snapshots.
//!
//! A fetch job drops tabular snapshot files exported from GitHub, Jira, and
//! ClickUp into per-provider intake directories. The loader discovers new
//! files, maps each provider's columns onto one canonical activity record,
//! stores the records, and keeps a tracking ledger so every file is loaded
//! exactly once.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌──────────────────────┐
//! │   Intake    │──▶│   Scanner   │──▶│ Transformer │──▶│        SQLite        │
//! │ github/jira │   │name + ledger│   │ per-provider│   │ file_tracking        │
//! │ clickup     │   │   filtering │   │   mapping   │   │ platform_information │
//! └─────────────┘   └─────────────┘   └─────────────┘   └──────────┬───────────┘
//!                                                                  │
//!                                                       ┌──────────┴──────────┐
//!                                                       ▼                     ▼
//!                                                  ┌─────────┐          ┌──────────┐
//!                                                  │  scan   │          │  stats   │
//!                                                  │ (watch) │          │ (--json) │
//!                                                  └─────────┘          └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! loader init                 # create database
//! loader sources              # check intake directories
//! loader scan all             # load every new snapshot
//! loader stats                # ledger overview
//! loader watch                # scan on a fixed interval
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | Tracing subscriber setup |
//! | [`error`] | File and scan error taxonomy |
//! | [`models`] | Core data types |
//! | [`schema`] | Provider column mappings |
//! | [`transform`] | Row → canonical record |
//! | [`tabular`] | Delimited file reading |
//! | [`scanner`] | Intake directory scanning |
//! | [`store`] | Ledger and record storage, SQLite connection |
//! | [`ingest`] | Ingestion orchestration |
//! | [`stats`] | Ledger statistics |
//! | [`sources`] | Provider listing |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod scanner;
pub mod schema;
pub mod sources;
pub mod stats;
pub mod store;
pub mod tabular;
pub mod transform;
