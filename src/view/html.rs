//! Server-side HTML.
//!
//! Pages are small enough to build with `format!`. Every interpolated user
//! value goes through [`escape`].

use std::fmt::Write as _;

use crate::planner::ActionState;
use crate::view::{CapacityPlan, Dashboard, PlanSection};

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title} | Anchor Day</title>\n</head>\n<body>\n<main>\n{body}</main>\n</body>\n</html>\n",
        title = escape(title),
    )
}

fn flash(state: &ActionState) -> String {
    let mut out = String::new();
    if let Some(error) = &state.error {
        let _ = writeln!(out, "<p class=\"error\" role=\"alert\">{}</p>", escape(error));
    }
    if let Some(success) = &state.success {
        let _ = writeln!(out, "<p class=\"success\" role=\"status\">{}</p>", escape(success));
    }
    out
}

pub fn sign_in_page(state: &ActionState) -> String {
    let email = escape(state.email.as_deref().unwrap_or_default());
    let body = format!(
        "<h1>Sign in</h1>\n{flash}\
         <form method=\"post\" action=\"/sign-in\">\n\
         <label>Email <input type=\"email\" name=\"email\" value=\"{email}\" required></label>\n\
         <label>Password <input type=\"password\" name=\"password\" required></label>\n\
         <button type=\"submit\">Sign in</button>\n\
         </form>\n\
         <p>No account yet? <a href=\"/sign-up\">Sign up</a></p>\n",
        flash = flash(state),
    );
    layout("Sign in", &body)
}

pub fn sign_up_page(state: &ActionState) -> String {
    let email = escape(state.email.as_deref().unwrap_or_default());
    let body = format!(
        "<h1>Create an account</h1>\n{flash}\
         <form method=\"post\" action=\"/sign-up\">\n\
         <label>Name <input type=\"text\" name=\"name\"></label>\n\
         <label>Email <input type=\"email\" name=\"email\" value=\"{email}\" required></label>\n\
         <label>Password <input type=\"password\" name=\"password\" minlength=\"8\" required></label>\n\
         <button type=\"submit\">Sign up</button>\n\
         </form>\n\
         <p>Already registered? <a href=\"/sign-in\">Sign in</a></p>\n",
        flash = flash(state),
    );
    layout("Sign up", &body)
}

pub fn dashboard_page(dashboard: &Dashboard, state: &ActionState) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "<header>\n<h1>{}</h1>", escape(&dashboard.greeting));
    let _ = writeln!(body, "<p>{}</p>", escape(dashboard.prompt));
    body.push_str(
        "<form method=\"post\" action=\"/sign-out\"><button type=\"submit\">Sign out</button></form>\n</header>\n",
    );
    body.push_str(&flash(state));

    body.push_str("<form method=\"post\" action=\"/dashboard/energy\" class=\"energy\">\n");
    for option in &dashboard.energy_options {
        let _ = writeln!(
            body,
            "<button type=\"submit\" name=\"energy_level\" value=\"{level}\"{pressed}>\
             <strong>{title}</strong> <span>{description}</span></button>",
            level = option.level,
            pressed = if option.selected { " aria-pressed=\"true\"" } else { "" },
            title = escape(option.title),
            description = escape(option.description),
        );
    }
    body.push_str("</form>\n");

    if let Some(plan) = &dashboard.plan {
        body.push_str(&plan_html(plan));
    }
    layout("Dashboard", &body)
}

fn plan_html(plan: &CapacityPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<section class=\"plan plan-{}\">", plan.level);
    let _ = writeln!(out, "<h2>{}</h2>", escape(plan.title));
    let _ = writeln!(out, "<p>{}</p>", escape(plan.description));

    out.push_str("<h3>Anchor Tasks</h3>\n");
    if plan.anchor_tasks.is_empty() {
        out.push_str("<p>No anchor tasks yet.</p>\n");
    } else {
        out.push_str("<ul class=\"anchor-tasks\">\n");
        for task in &plan.anchor_tasks {
            let _ = write!(
                out,
                "<li><form method=\"post\" action=\"/dashboard/tasks/{id}\">\
                 <input type=\"hidden\" name=\"completed\" value=\"{next}\">\
                 <button type=\"submit\" aria-pressed=\"{done}\">{mark} {name}</button>",
                id = task.status_id,
                next = !task.is_completed,
                done = task.is_completed,
                mark = if task.is_completed { "[x]" } else { "[ ]" },
                name = escape(&task.task_name),
            );
            if let Some(description) = &task.description {
                let _ = write!(out, " <small>{}</small>", escape(description));
            }
            out.push_str("</form></li>\n");
        }
        out.push_str("</ul>\n");
    }

    let _ = writeln!(out, "<h3>{}</h3>", escape(plan.section.heading()));
    match &plan.section {
        PlanSection::DopamineMenu { items } => {
            out.push_str("<ul class=\"dopamine-menu\">\n");
            for item in items {
                let _ = write!(out, "<li><strong>{}</strong>", escape(&item.name));
                if let Some(description) = &item.description {
                    let _ = write!(out, ": {}", escape(description));
                }
                out.push_str("</li>\n");
            }
            out.push_str("</ul>\n");
        }
        PlanSection::TopPriorities { items } => {
            out.push_str("<ol class=\"priorities\">\n");
            for item in items {
                let _ = writeln!(out, "<li>{}</li>", escape(item));
            }
            out.push_str("</ol>\n");
        }
        PlanSection::FutureGoals { goals } => {
            out.push_str("<ul class=\"goals\">\n");
            for goal in goals {
                let _ = write!(out, "<li><strong>{}</strong>", escape(&goal.title));
                if let Some(step) = &goal.next_physical_step {
                    let _ = write!(out, " <em>Next step: {}</em>", escape(step));
                }
                out.push_str("</li>\n");
            }
            out.push_str("</ul>\n");
        }
    }
    out.push_str("</section>\n");
    out
}
