//! Presentation models.
//!
//! The dashboard is built once per request and then either serialized as
//! JSON or rendered to HTML by [`html`].

pub mod html;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{
    DailyLogWithTasks, EnergyLevel, FutureGoal, PlaybookItem, TaskStatusView, User,
};

pub const INTENTION_PROMPT: &str =
    "Let's set the intention for today. How is your capacity right now?";

/// One button of the energy selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnergyOption {
    pub level: EnergyLevel,
    pub title: &'static str,
    pub description: &'static str,
    pub selected: bool,
}

impl EnergyOption {
    pub fn for_level(level: EnergyLevel, selected: Option<EnergyLevel>) -> Self {
        let (title, description) = match level {
            EnergyLevel::Low => ("Low Capacity", "Crisis Mode: Basics only."),
            EnergyLevel::Medium => ("Medium Capacity", "Standard Day: Focus on priorities."),
            EnergyLevel::High => ("High Capacity", "Growth Day: Tackle bigger goals."),
        };
        Self {
            level,
            title,
            description,
            selected: selected == Some(level),
        }
    }
}

/// Tier-specific section shown under the anchor task checklist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanSection {
    DopamineMenu { items: Vec<PlaybookItem> },
    /// Placeholder; priorities have no data source yet.
    TopPriorities { items: Vec<String> },
    FutureGoals { goals: Vec<FutureGoal> },
}

impl PlanSection {
    pub fn heading(&self) -> &'static str {
        match self {
            Self::DopamineMenu { .. } => "Dopamine Menu",
            Self::TopPriorities { .. } => "Today's Top 3 Priorities",
            Self::FutureGoals { .. } => "Future Goals",
        }
    }
}

/// The capacity view for the stored energy level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityPlan {
    pub level: EnergyLevel,
    pub title: &'static str,
    pub description: &'static str,
    pub anchor_tasks: Vec<TaskStatusView>,
    pub section: PlanSection,
}

impl CapacityPlan {
    pub fn new(
        level: EnergyLevel,
        anchor_tasks: Vec<TaskStatusView>,
        dopamine: Vec<PlaybookItem>,
        goals: Vec<FutureGoal>,
    ) -> Self {
        let (title, description, section) = match level {
            EnergyLevel::Low => (
                "Low Capacity Protocol: Active",
                "Focus only on the essentials. It's okay that today is hard. \
                 We'll take it one step at a time.",
                PlanSection::DopamineMenu { items: dopamine },
            ),
            EnergyLevel::Medium => (
                "Medium Capacity Plan",
                "Let's focus on what matters most today.",
                PlanSection::TopPriorities { items: Vec::new() },
            ),
            EnergyLevel::High => (
                "High Capacity Plan",
                "A great day to make progress on bigger goals.",
                PlanSection::FutureGoals { goals },
            ),
        };
        Self {
            level,
            title,
            description,
            anchor_tasks,
            section,
        }
    }
}

/// Everything the dashboard page shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub greeting: String,
    pub prompt: &'static str,
    pub today: NaiveDate,
    pub energy_options: Vec<EnergyOption>,
    pub energy_level: Option<EnergyLevel>,
    pub completed: usize,
    /// `None` until an energy level is recorded for today.
    pub plan: Option<CapacityPlan>,
}

impl Dashboard {
    pub fn build(
        user: &User,
        today: NaiveDate,
        log: Option<DailyLogWithTasks>,
        dopamine: Vec<PlaybookItem>,
        goals: Vec<FutureGoal>,
    ) -> Self {
        let energy_level = log.as_ref().map(|l| l.log.energy_level);
        let completed = log.as_ref().map_or(0, DailyLogWithTasks::completed_count);
        let plan = log.map(|l| CapacityPlan::new(l.log.energy_level, l.tasks, dopamine, goals));
        Self {
            greeting: format!("Welcome back, {}.", user.display_name()),
            prompt: INTENTION_PROMPT,
            today,
            energy_options: EnergyLevel::ALL
                .iter()
                .map(|&level| EnergyOption::for_level(level, energy_level))
                .collect(),
            energy_level,
            completed,
            plan,
        }
    }
}
