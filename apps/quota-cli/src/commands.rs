//! Command handlers.
//!
//! Each handler plays the UI side of the rate window contract: check before
//! acting, record usage only once the action went through.

use std::process::Command as Process;

use anyhow::Context;
use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::Serialize;

use quota_core::{Category, Decision, WindowStatus};
use quota_shared::{
    ApiResponse, CategoryUsageResponse, DecisionResponse, ErrorResponse, MarkResponse,
    StatusResponse,
};

use crate::cli::Command;
use crate::state::AppState;

pub const EXIT_OK: u8 = 0;
/// Exit status when the quota for a category is exhausted.
pub const EXIT_DENIED: u8 = 2;

pub fn run(state: &AppState, command: Command) -> anyhow::Result<u8> {
    match command {
        Command::Check { category } => check(state, category),
        Command::Mark { category } => mark(state, category),
        Command::Reset => reset(state),
        Command::Status => status(state),
        Command::Guard { category, program } => guard(state, category, &program),
    }
}

fn check(state: &AppState, category: Category) -> anyhow::Result<u8> {
    let decision = if state.bypass {
        Decision::Allowed
    } else {
        state.window.is_allowed(category)
    };

    let response = decision_response(category, &decision, state.bypass);
    emit(state, ApiResponse::ok(&response), || match decision {
        Decision::Allowed => format!("{} requests: allowed", category.label()),
        Decision::Denied { retry_after } => denial_message(category, retry_after),
    })?;

    Ok(exit_for(&decision))
}

fn mark(state: &AppState, category: Category) -> anyhow::Result<u8> {
    state
        .window
        .mark(category)
        .with_context(|| format!("failed to record {category} usage"))?;

    let response = MarkResponse {
        action: "mark".to_string(),
        category: Some(category.to_string()),
        recorded: true,
    };
    emit(
        state,
        ApiResponse::ok_with_message(&response, "usage recorded"),
        || format!("Recorded one {} request", category.label().to_lowercase()),
    )?;

    Ok(EXIT_OK)
}

fn reset(state: &AppState) -> anyhow::Result<u8> {
    state.window.reset().context("failed to reset rate window")?;

    let response = MarkResponse {
        action: "reset".to_string(),
        category: None,
        recorded: true,
    };
    emit(
        state,
        ApiResponse::ok_with_message(&response, "window reset"),
        || "Rate window reset, full quota available".to_string(),
    )?;

    Ok(EXIT_OK)
}

fn status(state: &AppState) -> anyhow::Result<u8> {
    let snapshot = state.window.status();
    let response = status_response(&snapshot);

    emit(state, ApiResponse::ok(&response), || {
        let mut lines = vec![format!(
            "Window started {}, resets {}",
            local_time(snapshot.start),
            local_time(snapshot.resets_at)
        )];
        lines.extend(snapshot.usage.iter().map(|u| {
            format!(
                "  {:<6} {}/{} used, {} left",
                u.category.label(),
                u.used,
                u.limit,
                u.remaining
            )
        }));
        lines.join("\n")
    })?;

    Ok(EXIT_OK)
}

fn guard(state: &AppState, category: Category, program: &[String]) -> anyhow::Result<u8> {
    let (name, args) = program
        .split_first()
        .context("no program given to guard")?;

    if !state.bypass {
        if let Decision::Denied { retry_after } = state.window.is_allowed(category) {
            let message = denial_message(category, retry_after);
            if state.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ErrorResponse::limit_reached(&message))?
                );
            } else {
                eprintln!("{message}");
            }
            return Ok(EXIT_DENIED);
        }
    }

    let status = Process::new(name)
        .args(args)
        .status()
        .with_context(|| format!("failed to launch {name}"))?;

    if !status.success() {
        tracing::info!(category = %category, status = %status, "Guarded action failed, usage not recorded");
        return Ok(exit_code_of(status.code()));
    }

    if state.bypass {
        tracing::debug!(category = %category, "Privileged action, usage not recorded");
    } else if let Err(e) = state.window.mark(category) {
        // The action already happened; report and keep its exit status.
        tracing::warn!(category = %category, error = %e, "Action succeeded but usage was not recorded");
    }

    Ok(EXIT_OK)
}

fn emit<T: Serialize>(
    state: &AppState,
    response: ApiResponse<T>,
    human: impl FnOnce() -> String,
) -> anyhow::Result<()> {
    if state.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", human());
    }
    Ok(())
}

fn exit_for(decision: &Decision) -> u8 {
    if decision.is_allowed() {
        EXIT_OK
    } else {
        EXIT_DENIED
    }
}

fn exit_code_of(code: Option<i32>) -> u8 {
    code.and_then(|c| u8::try_from(c).ok())
        .filter(|c| *c != 0)
        .unwrap_or(1)
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M %:z").to_string()
}

pub fn denial_message(category: Category, retry_after: DateTime<Utc>) -> String {
    format!(
        "Limit reached for {} requests. Next allowed at {}",
        category.label(),
        local_time(retry_after)
    )
}

pub fn decision_response(category: Category, decision: &Decision, bypassed: bool) -> DecisionResponse {
    DecisionResponse {
        category: category.to_string(),
        label: category.label().to_string(),
        allowed: decision.is_allowed(),
        retry_after: decision.retry_after().map(rfc3339),
        bypassed,
    }
}

pub fn status_response(status: &WindowStatus) -> StatusResponse {
    StatusResponse {
        start: rfc3339(status.start),
        resets_at: rfc3339(status.resets_at),
        fresh: status.origin.is_fresh(),
        categories: status
            .usage
            .iter()
            .map(|u| CategoryUsageResponse {
                category: u.category.to_string(),
                label: u.category.label().to_string(),
                used: u.used,
                limit: u.limit,
                remaining: u.remaining,
                allowed: u.allowed,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, TimeZone};
    use quota_core::ports::KeyValueStore;
    use quota_core::{RateLimitWindow, STORAGE_KEY, WindowConfig};
    use quota_infra::{InMemoryStore, ManualClock};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 2, 18, 0, 0).unwrap()
    }

    fn state_with(store: Arc<InMemoryStore>, bypass: bool) -> AppState {
        let window = RateLimitWindow::new(
            store,
            Arc::new(ManualClock::new(t0())),
            WindowConfig::default(),
        )
        .unwrap();
        AppState::from_parts(window, true, bypass)
    }

    fn used(state: &AppState, category: Category) -> u32 {
        state
            .window
            .status()
            .usage
            .into_iter()
            .find(|u| u.category == category)
            .map(|u| u.used)
            .unwrap()
    }

    #[test]
    fn test_decision_response_for_denial() {
        let retry_after = t0() + TimeDelta::hours(72);
        let response = decision_response(Category::Image, &Decision::Denied { retry_after }, false);

        assert!(!response.allowed);
        assert_eq!(response.label, "Image");
        assert_eq!(response.retry_after.as_deref(), Some("2025-04-05T18:00:00.000Z"));
    }

    #[test]
    fn test_denial_message_names_category() {
        let message = denial_message(Category::Code, t0());
        assert!(message.starts_with("Limit reached for Code requests."));
    }

    #[test]
    fn test_status_response_marks_fresh_window() {
        let state = state_with(Arc::new(InMemoryStore::new()), false);
        let response = status_response(&state.window.status());

        assert!(response.fresh);
        assert_eq!(response.start, "2025-04-02T18:00:00.000Z");
        assert_eq!(response.categories.len(), 3);
        assert_eq!(response.categories[0].remaining, 5);
    }

    #[test]
    fn test_mark_and_reset_commands() {
        let state = state_with(Arc::new(InMemoryStore::new()), false);

        run(&state, Command::Mark { category: Category::Text }).unwrap();
        run(&state, Command::Mark { category: Category::Text }).unwrap();
        assert_eq!(used(&state, Category::Text), 2);

        run(&state, Command::Reset).unwrap();
        assert_eq!(used(&state, Category::Text), 0);
    }

    #[test]
    fn test_mark_surfaces_write_failure() {
        let store = Arc::new(InMemoryStore::new());
        store.set_fail_writes(true);
        let state = state_with(store, false);

        assert!(run(&state, Command::Mark { category: Category::Code }).is_err());
    }

    #[test]
    fn test_check_exit_codes() {
        let state = state_with(Arc::new(InMemoryStore::new()), false);
        assert_eq!(
            run(&state, Command::Check { category: Category::Image }).unwrap(),
            EXIT_OK
        );

        state.window.mark(Category::Image).unwrap();
        assert_eq!(
            run(&state, Command::Check { category: Category::Image }).unwrap(),
            EXIT_DENIED
        );
    }

    #[test]
    fn test_privileged_check_skips_the_window() {
        let store = Arc::new(InMemoryStore::new());
        let state = state_with(store.clone(), true);
        state.window.mark(Category::Image).unwrap();

        assert_eq!(
            run(&state, Command::Check { category: Category::Image }).unwrap(),
            EXIT_OK
        );
        assert!(store.get(STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn test_exit_code_of() {
        assert_eq!(exit_code_of(Some(3)), 3);
        assert_eq!(exit_code_of(Some(300)), 1);
        assert_eq!(exit_code_of(None), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_guard_marks_only_successful_actions() {
        let state = state_with(Arc::new(InMemoryStore::new()), false);

        let failed = run(
            &state,
            Command::Guard {
                category: Category::Code,
                program: vec!["false".to_string()],
            },
        )
        .unwrap();
        assert_eq!(failed, 1);
        assert_eq!(used(&state, Category::Code), 0);

        let ok = run(
            &state,
            Command::Guard {
                category: Category::Code,
                program: vec!["true".to_string()],
            },
        )
        .unwrap();
        assert_eq!(ok, EXIT_OK);
        assert_eq!(used(&state, Category::Code), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_guard_refuses_when_exhausted() {
        let state = state_with(Arc::new(InMemoryStore::new()), false);
        state.window.mark(Category::Image).unwrap();

        let code = run(
            &state,
            Command::Guard {
                category: Category::Image,
                program: vec!["true".to_string()],
            },
        )
        .unwrap();

        assert_eq!(code, EXIT_DENIED);
        assert_eq!(used(&state, Category::Image), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_privileged_guard_does_not_record() {
        let state = state_with(Arc::new(InMemoryStore::new()), true);

        let code = run(
            &state,
            Command::Guard {
                category: Category::Text,
                program: vec!["true".to_string()],
            },
        )
        .unwrap();

        assert_eq!(code, EXIT_OK);
        assert_eq!(used(&state, Category::Text), 0);
    }
}
