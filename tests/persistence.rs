//! Persistence tests for anchor-day.
//!
//! These tests verify that users, checklists, seed runs and the session key
//! survive a restart (drop + reopen from the same directories).

use anchor_day::config::AppConfig;
use anchor_day::model::EnergyLevel;
use anchor_day::paths::AppPaths;
use anchor_day::planner::Planner;
use anchor_day::seeds::SeedRegistry;
use anchor_day::validate::SignUpForm;

fn open(dir: &std::path::Path) -> Planner {
    let paths = AppPaths::rooted(dir);
    paths.ensure_dirs().unwrap();
    Planner::from_config(&AppConfig::default(), &paths)
        .unwrap()
        .with_password_rounds(1_000)
}

#[test]
fn checklist_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    let (user_id, status_id) = {
        let planner = open(dir.path());
        let user = planner
            .create_user(&SignUpForm {
                email: "sam@example.com".into(),
                password: "correct horse".into(),
                name: None,
            })
            .unwrap();
        planner
            .create_anchor_task(user.id, "Take medication", None)
            .unwrap();
        planner.set_energy(user.id, EnergyLevel::Medium).unwrap();
        let today = planner.daily_log_for_today(user.id).unwrap().unwrap();
        planner
            .set_task_completion(user.id, today.tasks[0].status_id, true)
            .unwrap();
        (user.id, today.tasks[0].status_id)
    };

    let planner = open(dir.path());
    let today = planner.daily_log_for_today(user_id).unwrap().unwrap();
    assert_eq!(today.log.energy_level, EnergyLevel::Medium);
    assert_eq!(today.tasks.len(), 1);
    assert_eq!(today.tasks[0].status_id, status_id);
    assert!(today.tasks[0].is_completed);
}

#[test]
fn sessions_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    let token = {
        let planner = open(dir.path());
        planner
            .sign_up(&SignUpForm {
                email: "sam@example.com".into(),
                password: "correct horse".into(),
                name: Some("Sam".into()),
            })
            .unwrap()
            .token
    };

    // The generated key was written to the state dir and is reused.
    let planner = open(dir.path());
    let user = planner.current_user(&token).unwrap();
    assert_eq!(user.display_name(), "Sam");
}

#[test]
fn seeds_apply_once_across_restarts() {
    let dir = tempfile::TempDir::new().unwrap();
    let packs: Vec<String> = AppConfig::default().seed_packs;

    {
        let planner = open(dir.path());
        let reports = planner
            .apply_seeds(&SeedRegistry::bundled(), &packs)
            .unwrap();
        assert!(reports.iter().all(|r| !r.already_applied));
    }

    let planner = open(dir.path());
    let reports = planner
        .apply_seeds(&SeedRegistry::bundled(), &packs)
        .unwrap();
    assert!(reports.iter().all(|r| r.already_applied));

    let user = planner.user_by_email("TEST@test.com").unwrap();
    assert_eq!(planner.list_anchor_tasks(user.id, true).unwrap().len(), 4);
}
