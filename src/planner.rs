//! Application operations.
//!
//! [`Planner`] ties the store, session keys and clock together. The browser
//! flow uses the [`ActionState`]-returning methods, which never fail: every
//! problem becomes a user-facing message. The JSON API and the CLI use the
//! typed methods, which return [`AnchorResult`].

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::auth::{SessionKeys, hash_password, verify_password, DEFAULT_ROUNDS};
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::error::{AnchorError, AnchorResult, StoreError};
use crate::model::{
    AnchorTask, AnchorTaskPatch, DailyLogWithTasks, EnergyLevel, FutureGoal, GoalPatch,
    GoalStatus, NewGoal, NewNoodlesLog, NewUser, NoodlesLog, PlaybookFilter, PlaybookItem,
    PlaybookItemType, TaskStatusView, UpsertOutcome, User, UserId,
};
use crate::paths::AppPaths;
use crate::seeds::{SeedRegistry, SeedReport};
use crate::store::Store;
use crate::validate::{self, SignInForm, SignUpForm, normalize_email, required_text};
use crate::view::Dashboard;

pub const MSG_NOT_AUTHENTICATED: &str = "User not authenticated.";
pub const MSG_DATABASE: &str = "A database error occurred.";
pub const MSG_BAD_CREDENTIALS: &str = "Invalid email or password.";
pub const MSG_EMAIL_TAKEN: &str = "An account with this email already exists.";

/// Outcome of a form action, rendered back into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionState {
    pub error: Option<String>,
    pub success: Option<String>,
    /// Echoed email so the form can be refilled. Passwords are never echoed.
    pub email: Option<String>,
}

impl ActionState {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: Some(message.into()),
            ..Default::default()
        }
    }

    fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A freshly authenticated user and their session token.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    pub token: String,
}

pub struct Planner {
    store: Store,
    sessions: SessionKeys,
    clock: Arc<dyn Clock>,
    password_rounds: u32,
    /// Verified against when the email is unknown.
    dummy_hash: String,
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner")
            .field("store", &self.store)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl Planner {
    pub fn new(store: Store, sessions: SessionKeys, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            sessions,
            clock,
            password_rounds: DEFAULT_ROUNDS,
            dummy_hash: hash_password("", DEFAULT_ROUNDS),
        }
    }

    /// Open the configured database and load (or create) the session secret.
    pub fn from_config(config: &AppConfig, paths: &AppPaths) -> AnchorResult<Self> {
        let store = Store::open(config.database_path(paths))?;
        let secret = config.session_secret(paths)?;
        let sessions = SessionKeys::new(secret, config.session_ttl())?
            .with_secure_cookies(config.secure_cookies);
        let clock: Arc<dyn Clock> = match config.utc_offset_minutes {
            Some(minutes) => Arc::new(SystemClock::with_offset_minutes(minutes)),
            None => Arc::new(SystemClock::local()),
        };
        Ok(Self::new(store, sessions, clock))
    }

    /// PBKDF2 rounds for new hashes. Tests lower this.
    pub fn with_password_rounds(mut self, rounds: u32) -> Self {
        self.password_rounds = rounds;
        self.dummy_hash = hash_password("", rounds);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn sessions(&self) -> &SessionKeys {
        &self.sessions
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // ── Accounts ─────────────────────────────────────────────────────────

    /// Create an account. Used by sign-up and `anchor user create`.
    pub fn create_user(&self, form: &SignUpForm) -> AnchorResult<User> {
        form.validate()?;
        let email = normalize_email(&form.email);
        let user = self.store.insert_user(
            &NewUser {
                name: form.normalized_name(),
                email,
                password_hash: hash_password(&form.password, self.password_rounds),
            },
            self.clock.now_utc(),
        )?;
        tracing::info!(user_id = user.id, email = %user.email, "user created");
        Ok(user)
    }

    pub fn sign_up(&self, form: &SignUpForm) -> Result<SignedIn, ActionState> {
        match self.create_user(form) {
            Ok(user) => {
                let token = self.sessions.issue(user.id, self.clock.now_utc());
                Ok(SignedIn { user, token })
            }
            Err(err) => Err(self.account_failure(err).with_email(&form.email)),
        }
    }

    pub fn sign_in(&self, form: &SignInForm) -> Result<SignedIn, ActionState> {
        let fail = |state: ActionState| state.with_email(&form.email);
        if let Err(err) = form.validate() {
            return Err(fail(ActionState::error(err.message)));
        }
        let user = match self.store.find_user_by_email(&normalize_email(&form.email)) {
            Ok(Some(user)) if user.deleted_at.is_none() => user,
            Ok(_) => {
                // Unknown emails pay the same PBKDF2 cost as known ones.
                let _ = verify_password(&form.password, &self.dummy_hash);
                return Err(fail(ActionState::error(MSG_BAD_CREDENTIALS)));
            }
            Err(err) => {
                tracing::error!(error = %err, "sign-in lookup failed");
                return Err(fail(ActionState::error(MSG_DATABASE)));
            }
        };
        match verify_password(&form.password, &user.password_hash) {
            Ok(true) => {
                let token = self.sessions.issue(user.id, self.clock.now_utc());
                tracing::info!(user_id = user.id, "signed in");
                Ok(SignedIn { user, token })
            }
            Ok(false) => Err(fail(ActionState::error(MSG_BAD_CREDENTIALS))),
            Err(err) => {
                tracing::warn!(user_id = user.id, error = %err, "stored password hash unreadable");
                Err(fail(ActionState::error(MSG_BAD_CREDENTIALS)))
            }
        }
    }

    /// `Set-Cookie` value that ends the session.
    pub fn sign_out(&self) -> String {
        self.sessions.clear_cookie()
    }

    /// The user behind a session token, if the token verifies and the
    /// account still exists.
    pub fn current_user(&self, token: &str) -> Option<User> {
        let claims = match self.sessions.verify(token, self.clock.now_utc()) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::debug!(error = %err, "rejected session token");
                return None;
            }
        };
        match self.store.find_active_user(claims.user.id) {
            Ok(user) => user,
            Err(err) => {
                tracing::error!(error = %err, "session user lookup failed");
                None
            }
        }
    }

    /// Look a user up by email for the CLI.
    pub fn user_by_email(&self, email: &str) -> AnchorResult<User> {
        let email = normalize_email(email);
        match self.store.find_user_by_email(&email)? {
            Some(user) if user.deleted_at.is_none() => Ok(user),
            _ => Err(StoreError::NotFound {
                entity: "user",
                key: email,
            }
            .into()),
        }
    }

    fn account_failure(&self, err: AnchorError) -> ActionState {
        match err {
            AnchorError::Validation(v) => ActionState::error(v.message),
            AnchorError::Store(StoreError::Conflict { .. }) => ActionState::error(MSG_EMAIL_TAKEN),
            other => {
                tracing::error!(error = %other, "account action failed");
                ActionState::error(MSG_DATABASE)
            }
        }
    }

    // ── Daily log ────────────────────────────────────────────────────────

    /// Record today's energy level for the form flow.
    pub fn upsert_daily_log(&self, user: Option<&User>, level: &str) -> ActionState {
        let Some(user) = user else {
            return ActionState::error(MSG_NOT_AUTHENTICATED);
        };
        let level: EnergyLevel = match level.parse() {
            Ok(level) => level,
            Err(err) => return ActionState::error(err.message),
        };
        match self.set_energy(user.id, level) {
            Ok(_) => ActionState::success(format!("Energy level set to {level}.")),
            Err(err) => {
                tracing::error!(user_id = user.id, error = %err, "daily log upsert failed");
                ActionState::error(MSG_DATABASE)
            }
        }
    }

    /// Typed form of [`Planner::upsert_daily_log`] for today's date.
    pub fn set_energy(&self, user_id: UserId, level: EnergyLevel) -> AnchorResult<UpsertOutcome> {
        self.set_energy_on(user_id, self.clock.today(), level)
    }

    pub fn set_energy_on(
        &self,
        user_id: UserId,
        date: NaiveDate,
        level: EnergyLevel,
    ) -> AnchorResult<UpsertOutcome> {
        Ok(self
            .store
            .upsert_daily_log(user_id, date, level, self.clock.now_utc())?)
    }

    pub fn daily_log_for_today(&self, user_id: UserId) -> AnchorResult<Option<DailyLogWithTasks>> {
        Ok(self.store.daily_log_with_tasks(user_id, self.clock.today())?)
    }

    pub fn set_task_completion(
        &self,
        user_id: UserId,
        status_id: i64,
        completed: bool,
    ) -> AnchorResult<TaskStatusView> {
        Ok(self.store.set_task_completion(user_id, status_id, completed)?)
    }

    // ── Anchor tasks ─────────────────────────────────────────────────────

    pub fn create_anchor_task(
        &self,
        user_id: UserId,
        task_name: &str,
        description: Option<&str>,
    ) -> AnchorResult<AnchorTask> {
        let name = required_text("task_name", task_name, 255)?;
        let description = description.map(str::trim).filter(|d| !d.is_empty());
        Ok(self.store.create_anchor_task(user_id, &name, description)?)
    }

    pub fn list_anchor_tasks(
        &self,
        user_id: UserId,
        include_inactive: bool,
    ) -> AnchorResult<Vec<AnchorTask>> {
        Ok(self.store.list_anchor_tasks(user_id, include_inactive)?)
    }

    pub fn update_anchor_task(
        &self,
        user_id: UserId,
        id: i64,
        patch: &AnchorTaskPatch,
    ) -> AnchorResult<AnchorTask> {
        let mut patch = patch.clone();
        if let Some(name) = &patch.task_name {
            patch.task_name = Some(required_text("task_name", name, 255)?);
        }
        Ok(self.store.update_anchor_task(user_id, id, &patch)?)
    }

    // ── Playbook ─────────────────────────────────────────────────────────

    pub fn playbook(&self, filter: &PlaybookFilter) -> AnchorResult<Vec<PlaybookItem>> {
        Ok(self.store.list_playbook_items(filter)?)
    }

    /// Comfort media, comfort activities and sensory aids.
    pub fn dopamine_menu(&self) -> AnchorResult<Vec<PlaybookItem>> {
        self.playbook(&PlaybookFilter {
            types: PlaybookItemType::DOPAMINE_MENU.to_vec(),
            max_energy: None,
        })
    }

    /// Meal guide, least effort first.
    pub fn meals(&self, max_energy: Option<i64>) -> AnchorResult<Vec<PlaybookItem>> {
        self.playbook(&PlaybookFilter {
            types: vec![PlaybookItemType::Meal],
            max_energy,
        })
    }

    // ── Goals ────────────────────────────────────────────────────────────

    pub fn create_goal(&self, goal: &NewGoal) -> AnchorResult<FutureGoal> {
        let goal = NewGoal {
            title: required_text("title", &goal.title, 255)?,
            ..goal.clone()
        };
        Ok(self.store.create_goal(&goal, self.clock.now_utc())?)
    }

    pub fn list_goals(&self, status: Option<GoalStatus>) -> AnchorResult<Vec<FutureGoal>> {
        Ok(self.store.list_goals(status)?)
    }

    pub fn update_goal(&self, id: i64, patch: &GoalPatch) -> AnchorResult<FutureGoal> {
        let mut patch = patch.clone();
        if let Some(title) = &patch.title {
            patch.title = Some(required_text("title", title, 255)?);
        }
        Ok(self.store.update_goal(id, &patch)?)
    }

    // ── Noodles ──────────────────────────────────────────────────────────

    pub fn log_noodles(&self, entry: &NewNoodlesLog) -> AnchorResult<NoodlesLog> {
        let activity_type = required_text("activity_type", &entry.activity_type, 100)?;
        if entry.duration_minutes.is_some_and(|m| m < 0) {
            return Err(validate::negative("duration_minutes").into());
        }
        let entry = NewNoodlesLog {
            activity_type,
            ..entry.clone()
        };
        Ok(self.store.insert_noodles_log(&entry, self.clock.now_utc())?)
    }

    /// Entries in `[from, to]`; the last 30 days when unbounded.
    pub fn noodles_logs(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AnchorResult<Vec<NoodlesLog>> {
        let to = to.unwrap_or_else(|| self.clock.today());
        let from = from.unwrap_or_else(|| {
            to.checked_sub_signed(chrono::Duration::days(30))
                .unwrap_or(NaiveDate::MIN)
        });
        Ok(self.store.list_noodles_logs(from, to)?)
    }

    // ── Dashboard ────────────────────────────────────────────────────────

    pub fn dashboard(&self, user: &User) -> AnchorResult<Dashboard> {
        let today = self.daily_log_for_today(user.id)?;
        let level = today.as_ref().map(|t| t.log.energy_level);
        let dopamine = match level {
            Some(EnergyLevel::Low) => self.dopamine_menu()?,
            _ => Vec::new(),
        };
        let goals = match level {
            Some(EnergyLevel::High) => self.list_goals(Some(GoalStatus::Active))?,
            _ => Vec::new(),
        };
        Ok(Dashboard::build(
            user,
            self.clock.today(),
            today,
            dopamine,
            goals,
        ))
    }

    // ── Seeds ────────────────────────────────────────────────────────────

    pub fn apply_seeds(
        &self,
        registry: &SeedRegistry,
        pack_ids: &[String],
    ) -> AnchorResult<Vec<SeedReport>> {
        Ok(registry.apply_all(
            pack_ids,
            &self.store,
            self.clock.now_utc(),
            self.password_rounds,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::view::PlanSection;

    fn planner() -> Planner {
        let keys = SessionKeys::new(vec![7u8; 32], chrono::Duration::hours(24)).unwrap();
        let clock = FixedClock::on(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        Planner::new(Store::open_in_memory().unwrap(), keys, Arc::new(clock))
            .with_password_rounds(1_000)
    }

    fn sign_up(p: &Planner, email: &str) -> SignedIn {
        p.sign_up(&SignUpForm {
            email: email.into(),
            password: "correct horse".into(),
            name: Some("Sam".into()),
        })
        .unwrap()
    }

    #[test]
    fn sign_up_then_sign_in() {
        let p = planner();
        let signed = sign_up(&p, "Sam@Example.com");
        assert_eq!(signed.user.email, "sam@example.com");
        assert_eq!(p.current_user(&signed.token).unwrap().id, signed.user.id);

        let again = p
            .sign_in(&SignInForm {
                email: "sam@example.com".into(),
                password: "correct horse".into(),
            })
            .unwrap();
        assert_eq!(again.user.id, signed.user.id);
    }

    #[test]
    fn duplicate_sign_up_is_rejected() {
        let p = planner();
        sign_up(&p, "sam@example.com");
        let state = p
            .sign_up(&SignUpForm {
                email: "SAM@example.com".into(),
                password: "another one".into(),
                name: None,
            })
            .unwrap_err();
        assert_eq!(state.error.as_deref(), Some(MSG_EMAIL_TAKEN));
        assert_eq!(state.email.as_deref(), Some("SAM@example.com"));
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let p = planner();
        sign_up(&p, "sam@example.com");
        let wrong = p
            .sign_in(&SignInForm {
                email: "sam@example.com".into(),
                password: "wrong password".into(),
            })
            .unwrap_err();
        let unknown = p
            .sign_in(&SignInForm {
                email: "nobody@example.com".into(),
                password: "whatever1".into(),
            })
            .unwrap_err();
        assert_eq!(wrong.error.as_deref(), Some(MSG_BAD_CREDENTIALS));
        assert_eq!(wrong.error, unknown.error);
    }

    #[test]
    fn sign_in_validation_message() {
        let p = planner();
        let state = p
            .sign_in(&SignInForm {
                email: "sam@example.com".into(),
                password: "short".into(),
            })
            .unwrap_err();
        assert_eq!(
            state.error.as_deref(),
            Some("Password must contain at least 8 character(s).")
        );
    }

    #[test]
    fn deleted_users_lose_their_session() {
        let p = planner();
        let signed = sign_up(&p, "sam@example.com");
        p.store()
            .soft_delete_user(signed.user.id, p.clock.now_utc())
            .unwrap();
        assert!(p.current_user(&signed.token).is_none());
        assert!(
            p.sign_in(&SignInForm {
                email: "sam@example.com".into(),
                password: "correct horse".into(),
            })
            .is_err()
        );
    }

    #[test]
    fn garbage_token_is_anonymous() {
        assert!(planner().current_user("not-a-token").is_none());
    }

    #[test]
    fn energy_form_messages() {
        let p = planner();
        let user = sign_up(&p, "sam@example.com").user;

        assert_eq!(
            p.upsert_daily_log(None, "low").error.as_deref(),
            Some(MSG_NOT_AUTHENTICATED)
        );
        assert_eq!(
            p.upsert_daily_log(Some(&user), "extreme").error.as_deref(),
            Some("Invalid energy level provided.")
        );
        assert_eq!(
            p.upsert_daily_log(Some(&user), "medium").success.as_deref(),
            Some("Energy level set to medium.")
        );
        let today = p.daily_log_for_today(user.id).unwrap().unwrap();
        assert_eq!(today.log.energy_level, EnergyLevel::Medium);
        assert_eq!(today.log.log_date, p.today());
    }

    #[test]
    fn snapshot_happens_through_the_planner() {
        let p = planner();
        let user = sign_up(&p, "sam@example.com").user;
        p.create_anchor_task(user.id, " Take meds ", None).unwrap();
        p.create_anchor_task(user.id, "Walk Noodles", Some("")).unwrap();

        let outcome = p.set_energy(user.id, EnergyLevel::Low).unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.statuses_created, 2);

        let today = p.daily_log_for_today(user.id).unwrap().unwrap();
        assert_eq!(today.tasks[0].task_name, "Take meds");
        assert_eq!(today.tasks[1].description, None);

        let done = p
            .set_task_completion(user.id, today.tasks[0].status_id, true)
            .unwrap();
        assert!(done.is_completed);
    }

    #[test]
    fn blank_task_name_is_rejected() {
        let p = planner();
        let user = sign_up(&p, "sam@example.com").user;
        let err = p.create_anchor_task(user.id, "   ", None).unwrap_err();
        assert!(matches!(err, AnchorError::Validation(_)));
    }

    #[test]
    fn noodles_default_window_saturates_at_min_date() {
        let p = planner();
        let to: NaiveDate = "-262143-01-05".parse().unwrap();
        let logs = p.noodles_logs(None, Some(to)).unwrap();
        assert!(logs.is_empty());
    }

    #[test]
    fn unknown_email_is_checked_against_a_hash() {
        let p = planner();
        assert!(verify_password("", &p.dummy_hash).unwrap());
        let err = p
            .sign_in(&SignInForm {
                email: "nobody@example.com".into(),
                password: "whatever1".into(),
            })
            .unwrap_err();
        assert_eq!(err.error.as_deref(), Some(MSG_BAD_CREDENTIALS));
    }

    #[test]
    fn negative_walk_duration_is_rejected() {
        let p = planner();
        let err = p
            .log_noodles(&NewNoodlesLog {
                log_date: p.today(),
                activity_type: "Walk".into(),
                duration_minutes: Some(-5),
                notes: None,
            })
            .unwrap_err();
        assert!(matches!(err, AnchorError::Validation(_)));

        p.log_noodles(&NewNoodlesLog {
            log_date: p.today(),
            activity_type: " Walk ".into(),
            duration_minutes: Some(25),
            notes: None,
        })
        .unwrap();
        let logs = p.noodles_logs(None, None).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].activity_type, "Walk");
    }

    #[test]
    fn dashboard_follows_energy_level() {
        let p = planner();
        let user = sign_up(&p, "sam@example.com").user;
        p.apply_seeds(&SeedRegistry::bundled(), &["playbook".to_string()])
            .unwrap();
        p.create_goal(&NewGoal {
            title: "Learn to knit".into(),
            description: None,
            next_physical_step: Some("Buy yarn".into()),
        })
        .unwrap();

        assert!(p.dashboard(&user).unwrap().plan.is_none());

        p.set_energy(user.id, EnergyLevel::Low).unwrap();
        let low = p.dashboard(&user).unwrap();
        let plan = low.plan.unwrap();
        assert_eq!(plan.title, "Low Capacity Protocol: Active");
        assert!(matches!(plan.section, PlanSection::DopamineMenu { ref items } if !items.is_empty()));

        p.set_energy(user.id, EnergyLevel::High).unwrap();
        let plan = p.dashboard(&user).unwrap().plan.unwrap();
        assert!(matches!(plan.section, PlanSection::FutureGoals { ref goals } if goals.len() == 1));
    }

    #[test]
    fn meals_are_sorted_by_effort() {
        let p = planner();
        p.apply_seeds(&SeedRegistry::bundled(), &["playbook".to_string()])
            .unwrap();
        let meals = p.meals(Some(1)).unwrap();
        assert!(!meals.is_empty());
        assert!(meals.iter().all(|m| m.item_type == PlaybookItemType::Meal));
        assert!(meals.iter().all(|m| m.energy_level_required.unwrap_or(0) <= 1));
        assert!(p.dopamine_menu().unwrap().iter().all(|i| i.item_type != PlaybookItemType::Meal));
    }
}
