//! Domain types shared by the store, the planner and the views.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub type UserId = i64;

/// Capacity tier chosen for the day. Drives which plan is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

impl EnergyLevel {
    pub const ALL: [EnergyLevel; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnergyLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ValidationError::new(
                "energy_level",
                "Invalid energy level provided.",
            )),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl User {
    /// Name used in greetings.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("User")
    }
}

/// Insert payload for a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub password_hash: String,
}

/// One row per user per calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyLog {
    pub id: i64,
    pub user_id: UserId,
    pub log_date: NaiveDate,
    pub energy_level: EnergyLevel,
    pub created_at: NaiveDateTime,
}

/// A recurring task the user wants tracked every day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnchorTask {
    pub id: i64,
    pub user_id: UserId,
    pub task_name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

/// Partial update for an anchor task. `None` leaves the column unchanged;
/// a blank `description` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnchorTaskPatch {
    pub task_name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Completion flag of one anchor task on one daily log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAnchorTaskStatus {
    pub id: i64,
    pub daily_log_id: i64,
    pub anchor_task_id: i64,
    pub is_completed: bool,
}

/// A status row joined with its anchor task, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStatusView {
    pub status_id: i64,
    pub anchor_task_id: i64,
    pub task_name: String,
    pub description: Option<String>,
    pub is_completed: bool,
}

/// Today's log plus its task checklist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyLogWithTasks {
    pub log: DailyLog,
    pub tasks: Vec<TaskStatusView>,
}

impl DailyLogWithTasks {
    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_completed).count()
    }
}

/// Result of the daily-log upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertOutcome {
    pub log: DailyLog,
    /// `true` when the log row did not exist before this call.
    pub created: bool,
    /// Status rows snapshotted from active anchor tasks (0 on update).
    pub statuses_created: usize,
}

/// Dog-care activity entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoodlesLog {
    pub id: i64,
    pub log_date: NaiveDate,
    pub activity_type: String,
    pub duration_minutes: Option<i64>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNoodlesLog {
    pub log_date: NaiveDate,
    pub activity_type: String,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Kind of playbook entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybookItemType {
    Meal,
    ComfortMedia,
    ComfortActivity,
    SensoryAid,
}

impl PlaybookItemType {
    /// Types shown on the dopamine menu.
    pub const DOPAMINE_MENU: [PlaybookItemType; 3] =
        [Self::ComfortMedia, Self::ComfortActivity, Self::SensoryAid];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meal => "meal",
            Self::ComfortMedia => "comfort_media",
            Self::ComfortActivity => "comfort_activity",
            Self::SensoryAid => "sensory_aid",
        }
    }
}

impl fmt::Display for PlaybookItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaybookItemType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meal" => Ok(Self::Meal),
            "comfort_media" => Ok(Self::ComfortMedia),
            "comfort_activity" => Ok(Self::ComfortActivity),
            "sensory_aid" => Ok(Self::SensoryAid),
            other => Err(ValidationError::new(
                "item_type",
                format!("Unknown playbook item type: {other}."),
            )),
        }
    }
}

/// Dopamine-menu or meal-guide entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybookItem {
    pub id: i64,
    pub item_type: PlaybookItemType,
    pub name: String,
    pub description: Option<String>,
    /// 0 for takeout, 1 for assembly, higher for more effort.
    pub energy_level_required: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPlaybookItem {
    pub item_type: PlaybookItemType,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub energy_level_required: Option<i64>,
}

/// Filter for playbook listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaybookFilter {
    #[serde(default)]
    pub types: Vec<PlaybookItemType>,
    /// Only items needing at most this much energy (items without a
    /// requirement always match).
    #[serde(default)]
    pub max_energy: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    OnHold,
}

impl GoalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "on_hold" => Ok(Self::OnHold),
            other => Err(ValidationError::new(
                "status",
                format!("Unknown goal status: {other}."),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FutureGoal {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: GoalStatus,
    pub next_physical_step: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGoal {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub next_physical_step: Option<String>,
}

/// Partial update for a goal. `None` leaves the column unchanged; a blank
/// `description` or `next_physical_step` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<GoalStatus>,
    pub next_physical_step: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_level_parses_lowercase_only() {
        assert_eq!("low".parse::<EnergyLevel>().unwrap(), EnergyLevel::Low);
        assert_eq!("high".parse::<EnergyLevel>().unwrap(), EnergyLevel::High);
        let err = "HIGH".parse::<EnergyLevel>().unwrap_err();
        assert_eq!(err.message, "Invalid energy level provided.");
        assert!("".parse::<EnergyLevel>().is_err());
    }

    #[test]
    fn energy_level_serde_is_lowercase() {
        let json = serde_json::to_string(&EnergyLevel::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
        let back: EnergyLevel = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(back, EnergyLevel::Low);
    }

    #[test]
    fn playbook_type_names_match_storage() {
        for ty in [
            PlaybookItemType::Meal,
            PlaybookItemType::ComfortMedia,
            PlaybookItemType::ComfortActivity,
            PlaybookItemType::SensoryAid,
        ] {
            assert_eq!(ty.as_str().parse::<PlaybookItemType>().unwrap(), ty);
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
        }
    }

    #[test]
    fn password_hash_never_serialized() {
        let epoch = chrono::DateTime::from_timestamp(0, 0).unwrap().naive_utc();
        let user = User {
            id: 1,
            name: None,
            email: "a@b.co".into(),
            password_hash: "secret".into(),
            created_at: epoch,
            updated_at: epoch,
            deleted_at: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("password_hash"));
        assert_eq!(user.display_name(), "User");
    }
}
