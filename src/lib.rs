//! AssetSentry - Remote Asset Discovery and Synchronization Daemon
//!
//! AssetSentry scans the repositories of a GitHub organization for visual
//! and text-art assets, classifies every discovered file through a
//! prioritized rule set, harvests ASCII banners out of README files, and
//! maintains a content-addressed local mirror with per-category manifests.
//!
//! ## Core Features
//!
//! - **Remote Discovery**: organization-wide repository scanning via the
//!   GitHub API, with per-repository failure isolation
//! - **Deterministic Classification**: first-match-wins rules plus a fixed
//!   fallback policy; same inputs, same categories
//! - **Content-Addressed Sync**: hash-diffed, idempotent re-sync; unchanged
//!   assets are never re-fetched
//! - **Banner Harvesting**: fenced README blocks that look like ASCII/ANSI
//!   art become synthetic text assets
//! - **Two-Level Manifests**: per-category registries plus a master
//!   manifest rebuilt from disk after every sync
//!
//! ## Modules
//!
//! - [`config`]: Configuration management and rule definitions
//! - [`sync`]: The scan/classify/diff/fetch/record pipeline
//! - [`source`]: Remote source abstraction and GitHub implementation

pub mod asset;
pub mod category;
pub mod classify;
pub mod config;
pub mod extract;
pub mod manifest;
pub mod organize;
pub mod rules;
pub mod source;
pub mod state;
pub mod sync;
pub mod watch;

pub use asset::{AssetContent, AssetDescriptor};
pub use category::AssetCategory;
pub use config::Config;
pub use manifest::{Manifest, ManifestEntry, MasterManifest};
pub use source::{GitHubSource, RemoteSource};
pub use state::SyncState;
pub use sync::{SyncEngine, SyncPlan, SyncSummary};
