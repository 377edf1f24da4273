// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # anchor-day
//!
//! An energy-aware daily planner. Each day the user records how much capacity
//! they have (low, medium, high); the first log of the day snapshots their
//! active anchor tasks into a checklist, and the dashboard shows a plan sized
//! to that capacity.
//!
//! ## Architecture
//!
//! - **Store** (`store`): SQLite via rusqlite, one transaction per write
//! - **Auth** (`auth`): PBKDF2 password hashes, HMAC-signed session tokens
//! - **Planner** (`planner`): the application operations behind the CLI and HTTP
//! - **Views** (`view`): dashboard model, server-rendered HTML
//! - **Seeds** (`seeds`): bundled TOML packs for the initial user and playbook
//! - **Server** (`server`, feature `server`): axum router for `anchord`
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use anchor_day::auth::SessionKeys;
//! use anchor_day::clock::SystemClock;
//! use anchor_day::model::EnergyLevel;
//! use anchor_day::planner::Planner;
//! use anchor_day::store::Store;
//! use anchor_day::validate::SignUpForm;
//!
//! let store = Store::open("anchor-day.db").unwrap();
//! let keys = SessionKeys::new(vec![0u8; 32], chrono::Duration::hours(24)).unwrap();
//! let planner = Planner::new(store, keys, Arc::new(SystemClock::local()));
//!
//! let user = planner
//!     .create_user(&SignUpForm {
//!         email: "me@example.com".into(),
//!         password: "correct horse".into(),
//!         name: None,
//!     })
//!     .unwrap();
//! planner.create_anchor_task(user.id, "Take medication", None).unwrap();
//! let outcome = planner.set_energy(user.id, EnergyLevel::Low).unwrap();
//! assert_eq!(outcome.statuses_created, 1);
//! ```

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod paths;
pub mod planner;
pub mod seeds;
#[cfg(feature = "server")]
pub mod server;
pub mod store;
pub mod validate;
pub mod view;
