//! # taskcoach - Personal Task Management with an AI Coach
//!
//! A task manager that pairs ordinary task CRUD with a conversational
//! coach. The coach answers questions about your workload and can create
//! tasks from natural language; when no hosted assistant is configured
//! (or it misbehaves) a deterministic rule engine answers instead.
//!
//! ## Key Features
//!
//! - **Tasks and Subtasks**: One level of nesting; completing or deleting
//!   a parent cascades to its subtasks
//! - **Rich Metadata**: Priority, due dates, categories, tags
//! - **Two Interfaces**: A CLI for terminal use plus an HTTP JSON API
//!   (`taskcoach serve`) with a `/api/chat` coach endpoint
//! - **Two Backends**: A local JSON file by default, or a hosted
//!   relational backend when `TASKCOACH_BACKEND_URL` and
//!   `TASKCOACH_BACKEND_KEY` are set
//! - **Derived Insight**: Completion streaks, 7-day creation averages,
//!   per-category counts, and generated productivity insights
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task
//! taskcoach add "Write the quarterly report" --due friday --priority high
//!
//! # See what's on
//! taskcoach list
//! taskcoach summary --insights
//!
//! # Ask the coach
//! taskcoach chat what should I focus on today?
//!
//! # Run the HTTP API
//! taskcoach serve
//! ```
//!
//! Data is stored locally in `~/.taskcoach/tasks.json` unless a remote
//! backend or `--db` path is configured.

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

pub mod api;
pub mod cli;
pub mod cmd;
pub mod coach;
pub mod config;
pub mod dates;
pub mod fields;
pub mod mapper;
pub mod storage;
pub mod store;
pub mod summary;
pub mod task;

use cli::Cli;
use cmd::*;
use coach::{AssistantClient, Coach};
use config::Config;
use storage::{local::LocalStore, remote::RemoteStore, StorageBackend};
use store::TaskStore;

fn build_coach(config: &Config) -> Coach {
    let remote = config.coach.as_ref().and_then(|c| {
        match AssistantClient::new(&c.base_url, &c.api_key, &c.assistant_id) {
            Ok(client) => Some(client),
            Err(e) => {
                error!(error = %e, "could not build assistant client, coach will use rules only");
                None
            }
        }
    });
    Coach::new(remote)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("taskcoach=info")
        }))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    // Completions need no store at all.
    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return;
    }

    // --db pins the local file backend; otherwise remote wins when
    // configured.
    let backend: Box<dyn StorageBackend> = match (&cli.db, &config.backend) {
        (Some(path), _) => Box::new(LocalStore::open(path.clone())),
        (None, Some(remote)) => match RemoteStore::new(&remote.url, &remote.api_key) {
            Ok(store) => Box::new(store),
            Err(e) => {
                eprintln!("could not reach the configured backend: {e}");
                std::process::exit(1);
            }
        },
        (None, None) => Box::new(LocalStore::open(config.local_store_path())),
    };
    debug!(backend = %backend.kind(), user = %config.user_id, "starting");

    let mut store = TaskStore::new(backend, config.user_id.clone());
    store.fetch().await;

    match cli.command {
        Commands::Completions { .. } => unreachable!("handled above"),

        Commands::Serve => {
            let state = api::AppState {
                store: std::sync::Arc::new(tokio::sync::Mutex::new(store)),
                coach: std::sync::Arc::new(build_coach(&config)),
            };
            println!("listening on http://{}", config.bind);
            if let Err(e) = api::serve(state, config.bind).await {
                eprintln!("server error: {e}");
                std::process::exit(1);
            }
        }

        Commands::Add {
            title,
            desc,
            due,
            priority,
            category,
            tags,
            parent,
        } => cmd_add(&mut store, title, desc, due, priority, category, tags, parent).await,

        Commands::List {
            all,
            completed,
            category,
            priority,
            search,
        } => cmd_list(&store, all, completed, category, priority, search),

        Commands::View { id } => cmd_view(&store, &id),

        Commands::Update {
            id,
            title,
            desc,
            due,
            clear_due,
            priority,
            category,
            clear_category,
        } => {
            cmd_update(
                &mut store,
                &id,
                title,
                desc,
                due,
                clear_due,
                priority,
                category,
                clear_category,
            )
            .await
        }

        Commands::Complete { id } => cmd_complete(&mut store, &id).await,

        Commands::Delete { id } => cmd_delete(&mut store, &id).await,

        Commands::Reorder { from, to } => cmd_reorder(&mut store, from, to).await,

        Commands::Category { action } => cmd_category(&mut store, action).await,

        Commands::Tags => cmd_tags(&store),

        Commands::Summary { insights } => cmd_summary(&store, insights),

        Commands::Chat { message } => {
            let coach = build_coach(&config);
            cmd_chat(&mut store, &coach, &message.join(" ")).await;
        }
    }
}
