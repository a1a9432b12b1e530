//! # flatsync
//!
//! A batch engine that reconciles a directory tree of flat content files
//! (YAML front matter plus free-form body text) into relational table rows,
//! keeping both representations consistent over repeated runs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌─────────────┐   ┌──────────┐
//! │ Scanner  │──▶│ Normalizer │──▶│  Hierarchy  │──▶│  Change  │
//! │ files→   │   │ rows per   │   │  parents /  │   │ detector │
//! │ records  │   │ schema col │   │ siblings /  │   │ (SHA-256)│
//! └──────────┘   └────────────┘   │ translation │   └────┬─────┘
//!                                 └─────────────┘        │
//!                                    ┌───────────────────┤
//!                                    ▼                   ▼
//!                              ┌────────────┐      ┌──────────┐
//!                              │Synchronizer│      │   File   │
//!                              │ one sqlx tx│      │  writer  │
//!                              └────────────┘      │ (new ids)│
//!                                                  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! flatsync init                 # create the fingerprint table
//! flatsync check pages          # scan and validate, write nothing
//! flatsync load pages           # commit the delta in one transaction
//! flatsync load pages --subdir guides,notes
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`store`] | File storage abstraction |
//! | [`scan`] | Listing, front-matter parsing, id assignment |
//! | [`normalize`] | Per-column value derivation |
//! | [`hierarchy`] | Parent, translation, and sibling relations |
//! | [`fingerprint`] | Change detection |
//! | [`sync`] | Transactional writes |
//! | [`writer`] | Id backfill into content files |
//! | [`loader`] | Check/load orchestration |
//! | [`db`] | Database connection |
//! | [`migrate`] | Fingerprint-table setup |

pub mod config;
pub mod db;
pub mod fingerprint;
pub mod hierarchy;
pub mod loader;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod render;
pub mod report;
pub mod scan;
pub mod schema;
pub mod store;
pub mod sync;
pub mod writer;
