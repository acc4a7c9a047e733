// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use client::auth::{self, AuthForm, AuthOutcome};
use client::config::ClientConfig;
use client::{ClientError, Horizon, HttpTaskService, SqlitePreferenceStore, TaskListState};
use common::{Task, TaskId};

#[derive(Parser, Debug)]
#[command(name = "tasks", version, about = "Client for the remote to-do list API")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true, env = "TASKS_CONFIG")]
    config: Option<PathBuf>,

    /// Root URL of the to-do API, overrides the config file
    #[arg(long, global = true, env = "TASKS_SERVER_URL")]
    server_url: Option<String>,

    /// Preference database URL, overrides the config file
    #[arg(long, global = true, env = "TASKS_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Sign in and remember the session
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Signout,
    /// Show the tasks of a horizon
    List {
        #[arg(long, default_value = "today")]
        horizon: String,
    },
    /// Add a task
    Add {
        description: String,
        /// Planned day (YYYY-MM-DD), today when omitted
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "today")]
        horizon: String,
    },
    /// Mark a task as done, or as pending again
    Toggle {
        id: TaskId,
        #[arg(long, default_value = "today")]
        horizon: String,
    },
    /// Delete a task
    Delete {
        id: TaskId,
        #[arg(long, default_value = "today")]
        horizon: String,
    },
    /// Show or hide completed tasks
    Filter {
        mode: FilterMode,
        #[arg(long, default_value = "today")]
        horizon: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FilterMode {
    Show,
    Hide,
    Toggle,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ClientError>() {
            Some(client_error) => eprintln!("{}", client_error.user_message()),
            None => eprintln!("Error: {e:#}"),
        }
        tracing::error!("Command failed: {:?}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::load(cli.config.as_deref())?
        .with_overrides(cli.server_url.clone(), cli.database_url.clone());
    let store = Arc::new(SqlitePreferenceStore::connect(&config.database_url).await?);
    let service = HttpTaskService::new(&config.server_url, config.request_timeout())?;

    tracing::debug!("Using API at {}", service.base_url());

    let horizon_key = match &cli.command {
        Command::Signup {
            name,
            email,
            password,
            confirm_password,
        } => {
            let mut form = AuthForm::sign_up(name, email, password, confirm_password);
            form.submit(&service, store.as_ref()).await?;
            println!("Account created. You can sign in now.");
            return Ok(());
        }
        Command::Signin { email, password } => {
            let mut form = AuthForm::sign_in(email, password);
            if let AuthOutcome::SignedIn {
                user,
                session_saved,
            } = form.submit(&service, store.as_ref()).await?
            {
                println!("Welcome, {}!", user.name);
                if !session_saved {
                    eprintln!(
                        "Warning: the session could not be saved; sign in again before the next command."
                    );
                }
            }
            return Ok(());
        }
        Command::Signout => {
            auth::clear_session(store.as_ref()).await?;
            println!("Signed out.");
            return Ok(());
        }
        Command::List { horizon }
        | Command::Add { horizon, .. }
        | Command::Toggle { horizon, .. }
        | Command::Delete { horizon, .. }
        | Command::Filter { horizon, .. } => horizon.clone(),
    };

    let horizon = Horizon::from_key(&horizon_key, config.month_days)
        .with_context(|| format!("Unknown horizon '{horizon_key}' (today, tomorrow, week, month)"))?;
    let session = auth::restore_session(store.as_ref()).await;

    // The filter is a local preference: it applies even without a session
    // or when the tasks cannot be loaded.
    if let Command::Filter { mode, .. } = &cli.command {
        let service = match &session {
            Some(user) => service.with_token(&user.token),
            None => service,
        };
        let mut state = TaskListState::new(
            horizon,
            config.preference_scope,
            Arc::new(service),
            store.clone(),
        );
        match session {
            Some(_) => {
                if let Err(e) = state.initialize().await {
                    eprintln!("Tasks could not be loaded: {}", e.user_message());
                }
            }
            None => {
                state.restore_preference().await;
                eprintln!("Not signed in, tasks were not loaded.");
            }
        }
        apply_filter(&mut state, *mode);
        state.settle().await;
        print_tasks(&state);
        return Ok(());
    }

    let user = session.context("Not signed in. Run `tasks signin` first.")?;

    let mut state = TaskListState::new(
        horizon,
        config.preference_scope,
        Arc::new(service.with_token(user.token)),
        store.clone(),
    );
    state.initialize().await?;

    match cli.command {
        Command::Add {
            description, date, ..
        } => {
            let estimated_at = estimated_at(date)?;
            state.add(&description, estimated_at).await?;
        }
        Command::Toggle { id, .. } => state.toggle(id).await?,
        Command::Delete { id, .. } => state.remove(id).await?,
        _ => {}
    }

    state.settle().await;
    print_tasks(&state);
    Ok(())
}

fn apply_filter(state: &mut TaskListState, mode: FilterMode) {
    match mode {
        FilterMode::Show => state.set_filter(true),
        FilterMode::Hide => state.set_filter(false),
        FilterMode::Toggle => state.toggle_filter(),
    }
}

/// The chosen day at the current time of day, or now.
fn estimated_at(date: Option<NaiveDate>) -> Result<DateTime<Utc>> {
    let Some(date) = date else {
        return Ok(Utc::now());
    };
    let local = date.and_time(Local::now().time());
    Local
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("{date} has no valid local time"))
}

fn print_tasks(state: &TaskListState) {
    let horizon = state.horizon();
    println!(
        "{} - {}",
        horizon.title(),
        Local::now().format("%a, %-d %B")
    );

    if state.visible_tasks().is_empty() {
        println!("  No tasks.");
    }
    for task in state.visible_tasks() {
        println!("  {}", format_task(task));
    }
    if !state.show_done_tasks() {
        let hidden = state.tasks().len() - state.visible_tasks().len();
        println!("  ({hidden} done tasks hidden)");
    }
}

fn format_task(task: &Task) -> String {
    // Done tasks show when they were completed, pending ones when they are planned.
    let (mark, date) = match task.done_at {
        Some(done_at) => ("[x]", done_at),
        None => ("[ ]", task.estimated_at),
    };
    format!(
        "{} #{} {} ({})",
        mark,
        task.id,
        task.description,
        date.with_timezone(&Local).format("%a, %-d %B")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use client::{MemoryPreferenceStore, PreferenceScope, PreferenceStore};
    use std::time::Duration;

    #[test]
    fn test_url_flags_are_global() {
        let cli = Cli::try_parse_from([
            "tasks",
            "list",
            "--server-url",
            "http://api.example.com",
            "--database-url",
            "sqlite::memory:",
        ])
        .unwrap();

        let config = ClientConfig::default().with_overrides(cli.server_url, cli.database_url);
        assert_eq!(config.server_url, "http://api.example.com");
        assert_eq!(config.database_url, "sqlite::memory:");
    }

    #[tokio::test]
    async fn test_filter_applies_without_session() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let service = HttpTaskService::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let mut state = TaskListState::new(
            Horizon::Today,
            PreferenceScope::PerHorizon,
            Arc::new(service),
            store.clone(),
        );

        state.restore_preference().await;
        apply_filter(&mut state, FilterMode::Hide);
        state.settle().await;

        assert!(!state.show_done_tasks());
        assert_eq!(
            store.get("tasksState:today").await.unwrap().as_deref(),
            Some(r#"{"showDoneTasks":false}"#)
        );
    }
}
