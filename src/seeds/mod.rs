//! Seed packs: bootstrapping data for a fresh database.
//!
//! A seed pack is a TOML bundle of users, playbook items, anchor tasks and
//! goals. Three packs are bundled into the binary: `initial-user`, `playbook`
//! and `anchors`. Extra packs are discovered from `<data_dir>/seeds/<id>/seed.toml`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::hash_password;
use crate::error::StoreError;
use crate::model::{NewGoal, NewPlaybookItem, NewUser, PlaybookItemType};
use crate::store::Store;
use crate::validate::normalize_email;

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, Diagnostic)]
pub enum SeedError {
    #[error("seed pack not found: \"{id}\"")]
    #[diagnostic(
        code(anchor::seed::not_found),
        help("List available packs with `anchor seed --list`.")
    )]
    NotFound { id: String },

    #[error("failed to parse seed pack \"{id}\": {message}")]
    #[diagnostic(code(anchor::seed::parse), help("Check the seed.toml syntax."))]
    Parse { id: String, message: String },

    #[error("failed to apply seed \"{id}\": {source}")]
    #[diagnostic(
        code(anchor::seed::apply),
        help("Check that the database is writable. Nothing from this pack was recorded as applied.")
    )]
    Apply {
        id: String,
        #[source]
        source: StoreError,
    },
}

pub type SeedResult<T> = std::result::Result<T, SeedError>;

// ── Seed pack data model ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SeedPack {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub users: Vec<SeedUser>,
    pub playbook: Vec<NewPlaybookItem>,
    pub anchor_tasks: Vec<SeedAnchorTask>,
    pub goals: Vec<NewGoal>,
    pub source: SeedSource,
}

/// Where a seed pack came from.
#[derive(Debug, Clone)]
pub enum SeedSource {
    /// Bundled into the binary via `include_str!`.
    Bundled,
    /// Loaded from an external directory.
    External(PathBuf),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedAnchorTask {
    /// Email of the owning user.
    pub owner: String,
    pub task_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Report after applying a seed pack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub id: String,
    pub rows_applied: usize,
    pub rows_skipped: usize,
    pub already_applied: bool,
}

// ── TOML deserialization helpers ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SeedToml {
    seed: SeedMeta,
    #[serde(default)]
    users: Vec<SeedUser>,
    #[serde(default)]
    playbook: Vec<NewPlaybookItem>,
    #[serde(default)]
    anchor_tasks: Vec<SeedAnchorTask>,
    #[serde(default)]
    goals: Vec<NewGoal>,
}

#[derive(Debug, Deserialize)]
struct SeedMeta {
    id: String,
    name: String,
    version: String,
    description: String,
}

// ── Bundled seed packs ──────────────────────────────────────────────────

const INITIAL_USER_TOML: &str = include_str!("../../data/seeds/initial-user/seed.toml");
const PLAYBOOK_TOML: &str = include_str!("../../data/seeds/playbook/seed.toml");
const ANCHORS_TOML: &str = include_str!("../../data/seeds/anchors/seed.toml");

fn parse_seed_toml(toml_str: &str, source: SeedSource) -> SeedResult<SeedPack> {
    let parsed: SeedToml = toml::from_str(toml_str).map_err(|e| SeedError::Parse {
        id: "(unknown)".into(),
        message: e.to_string(),
    })?;
    Ok(SeedPack {
        id: parsed.seed.id,
        name: parsed.seed.name,
        version: parsed.seed.version,
        description: parsed.seed.description,
        users: parsed.users,
        playbook: parsed.playbook,
        anchor_tasks: parsed.anchor_tasks,
        goals: parsed.goals,
        source,
    })
}

fn bundled_packs() -> Vec<SeedPack> {
    [
        (INITIAL_USER_TOML, "initial-user"),
        (PLAYBOOK_TOML, "playbook"),
        (ANCHORS_TOML, "anchors"),
    ]
    .iter()
    .filter_map(
        |(toml, id)| match parse_seed_toml(toml, SeedSource::Bundled) {
            Ok(pack) => Some(pack),
            Err(e) => {
                tracing::warn!(seed = id, "failed to parse bundled seed: {e}");
                None
            }
        },
    )
    .collect()
}

// ── Seed Registry ───────────────────────────────────────────────────────

/// Registry of available seed packs (bundled + discovered from disk).
pub struct SeedRegistry {
    packs: HashMap<String, SeedPack>,
}

impl SeedRegistry {
    /// Create a registry with only bundled packs.
    pub fn bundled() -> Self {
        let packs = bundled_packs()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self { packs }
    }

    /// Bundled packs plus every `<seeds_dir>/<id>/seed.toml`. External packs
    /// override bundled ones with the same id.
    pub fn discover(seeds_dir: &Path) -> Self {
        let mut registry = Self::bundled();

        let Ok(entries) = std::fs::read_dir(seeds_dir) else {
            return registry;
        };
        for entry in entries.flatten() {
            let seed_file = entry.path().join("seed.toml");
            if !seed_file.is_file() {
                continue;
            }
            let parsed = std::fs::read_to_string(&seed_file)
                .map_err(|e| e.to_string())
                .and_then(|content| {
                    parse_seed_toml(&content, SeedSource::External(entry.path()))
                        .map_err(|e| e.to_string())
                });
            match parsed {
                Ok(pack) => {
                    tracing::debug!(seed = %pack.id, path = %seed_file.display(), "discovered seed pack");
                    registry.packs.insert(pack.id.clone(), pack);
                }
                Err(e) => {
                    tracing::warn!(path = %seed_file.display(), "failed to load seed pack: {e}");
                }
            }
        }
        registry
    }

    /// List all available seed packs.
    pub fn list(&self) -> Vec<&SeedPack> {
        let mut packs: Vec<&SeedPack> = self.packs.values().collect();
        packs.sort_by(|a, b| a.id.cmp(&b.id));
        packs
    }

    /// Get a seed pack by ID.
    pub fn get(&self, id: &str) -> SeedResult<&SeedPack> {
        self.packs
            .get(id)
            .ok_or_else(|| SeedError::NotFound { id: id.to_string() })
    }

    /// Apply a single seed pack. Idempotent via the `seed_runs` table.
    pub fn apply(
        &self,
        pack_id: &str,
        store: &Store,
        now: NaiveDateTime,
        password_rounds: u32,
    ) -> SeedResult<SeedReport> {
        let pack = self.get(pack_id)?;
        apply_seed_pack(pack, store, now, password_rounds).map_err(|source| SeedError::Apply {
            id: pack.id.clone(),
            source,
        })
    }

    /// Apply multiple seed packs in order. Returns a report per pack.
    pub fn apply_all(
        &self,
        pack_ids: &[String],
        store: &Store,
        now: NaiveDateTime,
        password_rounds: u32,
    ) -> SeedResult<Vec<SeedReport>> {
        pack_ids
            .iter()
            .map(|id| self.apply(id, store, now, password_rounds))
            .collect()
    }
}

// ── Application logic ───────────────────────────────────────────────────

fn apply_seed_pack(
    pack: &SeedPack,
    store: &Store,
    now: NaiveDateTime,
    password_rounds: u32,
) -> Result<SeedReport, StoreError> {
    let mut report = SeedReport {
        id: pack.id.clone(),
        ..Default::default()
    };
    if store.is_seed_applied(&pack.id)? {
        report.already_applied = true;
        return Ok(report);
    }

    for user in &pack.users {
        let email = normalize_email(&user.email);
        if store.find_user_by_email(&email)?.is_some() {
            tracing::info!(seed = %pack.id, %email, "Initial user already exists. Skipping creation.");
            report.rows_skipped += 1;
            continue;
        }
        store.insert_user(
            &NewUser {
                name: user.name.clone(),
                email: email.clone(),
                password_hash: hash_password(&user.password, password_rounds),
            },
            now,
        )?;
        tracing::info!(seed = %pack.id, %email, "initial user created");
        report.rows_applied += 1;
    }

    for item in &pack.playbook {
        let (_, inserted) = store.upsert_playbook_item(item)?;
        if inserted {
            report.rows_applied += 1;
        } else {
            report.rows_skipped += 1;
        }
    }

    for task in &pack.anchor_tasks {
        let owner = normalize_email(&task.owner);
        let Some(user) = store.find_user_by_email(&owner)? else {
            tracing::warn!(seed = %pack.id, %owner, task = %task.task_name, "owner not found, skipping task");
            report.rows_skipped += 1;
            continue;
        };
        let exists = store
            .list_anchor_tasks(user.id, true)?
            .iter()
            .any(|t| t.task_name == task.task_name);
        if exists {
            report.rows_skipped += 1;
            continue;
        }
        store.create_anchor_task(user.id, &task.task_name, task.description.as_deref())?;
        report.rows_applied += 1;
    }

    for goal in &pack.goals {
        store.create_goal(goal, now)?;
        report.rows_applied += 1;
    }

    store.mark_seed_applied(&pack.id, now)?;
    tracing::info!(
        seed = %pack.id,
        applied = report.rows_applied,
        skipped = report.rows_skipped,
        "seed pack applied"
    );
    Ok(report)
}

/// Number of dopamine-menu items in a pack, for `anchor seed --list`.
pub fn dopamine_item_count(pack: &SeedPack) -> usize {
    pack.playbook
        .iter()
        .filter(|i| PlaybookItemType::DOPAMINE_MENU.contains(&i.item_type))
        .count()
}
