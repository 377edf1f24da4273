//! HTTP tests: the router is served on an ephemeral port and driven with reqwest.

#![cfg(feature = "server")]

use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, COOKIE, LOCATION, SET_COOKIE};
use serde_json::{Value, json};

use anchor_day::auth::SessionKeys;
use anchor_day::clock::FixedClock;
use anchor_day::planner::Planner;
use anchor_day::seeds::SeedRegistry;
use anchor_day::server::{self, AppState};
use anchor_day::store::Store;
use anchor_day::validate::SignInForm;

struct TestServer {
    base: String,
    state: Arc<AppState>,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let keys = SessionKeys::new(vec![9u8; 32], chrono::Duration::hours(24)).unwrap();
        let clock = FixedClock::on(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        let planner = Planner::new(Store::open_in_memory().unwrap(), keys, Arc::new(clock))
            .with_password_rounds(1_000);
        let packs: Vec<String> = ["initial-user", "playbook", "anchors"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        planner
            .apply_seeds(&SeedRegistry::bundled(), &packs)
            .unwrap();

        let state = Arc::new(AppState::new(planner));
        let app = server::router(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        Self {
            base: format!("http://{addr}"),
            state,
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn token(&self) -> String {
        self.state
            .planner
            .sign_in(&SignInForm {
                email: "test@test.com".into(),
                password: "admin123".into(),
            })
            .unwrap()
            .token
    }
}

fn session_cookie(resp: &reqwest::Response) -> String {
    let set_cookie = resp
        .headers()
        .get(SET_COOKIE)
        .expect("set-cookie header")
        .to_str()
        .unwrap()
        .to_string();
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_seeded_rows() {
    let srv = TestServer::start().await;
    let body: Value = srv
        .client
        .get(srv.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["tables"]["users"], 1);
    assert_eq!(body["tables"]["anchor_tasks"], 4);
}

#[tokio::test]
async fn api_requires_a_session() {
    let srv = TestServer::start().await;
    let resp = srv.client.get(srv.url("/api/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = srv
        .client
        .get(srv.url("/api/me"))
        .header(AUTHORIZATION, "Bearer forged.token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn browser_flow_from_sign_in_to_low_capacity_plan() {
    let srv = TestServer::start().await;

    let resp = srv.client.get(srv.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[LOCATION], "/sign-in");

    let resp = srv
        .client
        .post(srv.url("/sign-in"))
        .form(&[("email", "test@test.com"), ("password", "admin123")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[LOCATION], "/dashboard");
    let raw_cookie = resp.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(raw_cookie.contains("HttpOnly"));
    assert!(raw_cookie.contains("SameSite=Lax"));
    let cookie = session_cookie(&resp);

    let page = srv
        .client
        .get(srv.url("/dashboard"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Welcome back, User."));
    assert!(page.contains("Crisis Mode: Basics only."));
    assert!(!page.contains("Low Capacity Protocol: Active"));

    let resp = srv
        .client
        .post(srv.url("/dashboard/energy"))
        .header(COOKIE, &cookie)
        .form(&[("energy_level", "low")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let page = srv
        .client
        .get(srv.url("/dashboard"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Low Capacity Protocol: Active"));
    assert!(page.contains("Take medication"));
    assert!(page.contains("Dopamine Menu"));
}

#[tokio::test]
async fn bad_password_re_renders_the_form() {
    let srv = TestServer::start().await;
    let resp = srv
        .client
        .post(srv.url("/sign-in"))
        .form(&[("email", "test@test.com"), ("password", "wrong-password")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.headers().get(SET_COOKIE).is_none());
    let page = resp.text().await.unwrap();
    assert!(page.contains("Invalid email or password."));
    assert!(page.contains("value=\"test@test.com\""));
    assert!(!page.contains("wrong-password"));
}

#[tokio::test]
async fn sign_up_then_sign_out() {
    let srv = TestServer::start().await;
    let resp = srv
        .client
        .post(srv.url("/sign-up"))
        .form(&[
            ("email", "new@example.com"),
            ("password", "long enough"),
            ("name", "Robin"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(&resp);

    let me: Value = srv
        .client
        .get(srv.url("/api/me"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["email"], "new@example.com");
    assert!(me.get("password_hash").is_none());

    let resp = srv
        .client
        .post(srv.url("/sign-out"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(
        resp.headers()[SET_COOKIE]
            .to_str()
            .unwrap()
            .contains("Max-Age=0")
    );

    let resp = srv
        .client
        .post(srv.url("/sign-up"))
        .form(&[("email", "new@example.com"), ("password", "long enough")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        resp.text()
            .await
            .unwrap()
            .contains("An account with this email already exists.")
    );
}

#[tokio::test]
async fn daily_log_api_snapshot_and_toggle() {
    let srv = TestServer::start().await;
    let bearer = format!("Bearer {}", srv.token());

    let today: Value = srv
        .client
        .get(srv.url("/api/daily-log/today"))
        .header(AUTHORIZATION, &bearer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(today.is_null());

    let resp = srv
        .client
        .put(srv.url("/api/daily-log"))
        .header(AUTHORIZATION, &bearer)
        .json(&json!({ "energy_level": "high" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Energy level set to high.");
    assert_eq!(body["created"], true);
    assert_eq!(body["statuses_created"], 4);
    let status_id = body["today"]["tasks"][0]["status_id"].as_i64().unwrap();

    let body: Value = srv
        .client
        .put(srv.url("/api/daily-log"))
        .header(AUTHORIZATION, &bearer)
        .json(&json!({ "energy_level": "medium" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["created"], false);
    assert_eq!(body["today"]["tasks"].as_array().unwrap().len(), 4);

    let resp = srv
        .client
        .put(srv.url("/api/daily-log"))
        .header(AUTHORIZATION, &bearer)
        .json(&json!({ "energy_level": "exhausted" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.text().await.unwrap(), "Invalid energy level provided.");

    let task: Value = srv
        .client
        .put(srv.url(&format!("/api/daily-log/tasks/{status_id}")))
        .header(AUTHORIZATION, &bearer)
        .json(&json!({ "completed": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(task["is_completed"], true);

    let resp = srv
        .client
        .put(srv.url("/api/daily-log/tasks/9999"))
        .header(AUTHORIZATION, &bearer)
        .json(&json!({ "completed": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let dash: Value = srv
        .client
        .get(srv.url("/api/dashboard"))
        .header(AUTHORIZATION, &bearer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dash["energy_level"], "medium");
    assert_eq!(dash["completed"], 1);
    assert_eq!(dash["plan"]["title"], "Medium Capacity Plan");
    assert_eq!(dash["plan"]["section"]["kind"], "top_priorities");
}

#[tokio::test]
async fn anchor_task_crud() {
    let srv = TestServer::start().await;
    let bearer = format!("Bearer {}", srv.token());

    let resp = srv
        .client
        .post(srv.url("/api/anchor-tasks"))
        .header(AUTHORIZATION, &bearer)
        .json(&json!({ "task_name": "Journal", "description": "Three lines" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();

    let updated: Value = srv
        .client
        .patch(srv.url(&format!("/api/anchor-tasks/{id}")))
        .header(AUTHORIZATION, &bearer)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["is_active"], false);
    assert_eq!(updated["description"], "Three lines");

    let active: Value = srv
        .client
        .get(srv.url("/api/anchor-tasks"))
        .header(AUTHORIZATION, &bearer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(active.as_array().unwrap().len(), 4);

    let all: Value = srv
        .client
        .get(srv.url("/api/anchor-tasks?include_inactive=true"))
        .header(AUTHORIZATION, &bearer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.as_array().unwrap().len(), 5);

    let resp = srv
        .client
        .post(srv.url("/api/anchor-tasks"))
        .header(AUTHORIZATION, &bearer)
        .json(&json!({ "task_name": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn reference_content() {
    let srv = TestServer::start().await;
    let bearer = format!("Bearer {}", srv.token());

    let meals: Value = srv
        .client
        .get(srv.url("/api/playbook/meals?max_energy=0"))
        .header(AUTHORIZATION, &bearer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let meals = meals.as_array().unwrap();
    assert!(!meals.is_empty());
    assert!(meals.iter().all(|m| m["item_type"] == "meal"));

    let menu: Value = srv
        .client
        .get(srv.url("/api/playbook?types=sensory_aid"))
        .header(AUTHORIZATION, &bearer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(
        menu.as_array()
            .unwrap()
            .iter()
            .all(|m| m["item_type"] == "sensory_aid")
    );

    let resp = srv
        .client
        .get(srv.url("/api/playbook?types=snacks"))
        .header(AUTHORIZATION, &bearer)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = srv
        .client
        .post(srv.url("/api/goals"))
        .header(AUTHORIZATION, &bearer)
        .json(&json!({ "title": "Run a 5k", "next_physical_step": "Shoes by the door" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let goal: Value = resp.json().await.unwrap();
    assert_eq!(goal["status"], "active");

    let goal_id = goal["id"].as_i64().unwrap();
    let goal: Value = srv
        .client
        .patch(srv.url(&format!("/api/goals/{goal_id}")))
        .header(AUTHORIZATION, &bearer)
        .json(&json!({ "status": "on_hold" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(goal["status"], "on_hold");

    let active: Value = srv
        .client
        .get(srv.url("/api/goals?status=active"))
        .header(AUTHORIZATION, &bearer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(active.as_array().unwrap().is_empty());

    let resp = srv
        .client
        .post(srv.url("/api/noodles-logs"))
        .header(AUTHORIZATION, &bearer)
        .json(&json!({ "activity_type": "Walk", "duration_minutes": 30 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let entry: Value = resp.json().await.unwrap();
    assert_eq!(entry["log_date"], "2024-06-03");

    let logs: Value = srv
        .client
        .get(srv.url("/api/noodles-logs?from=2024-06-01&to=2024-06-30"))
        .header(AUTHORIZATION, &bearer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(logs.as_array().unwrap().len(), 1);
}
