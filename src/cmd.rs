//! Command implementations for the CLI interface.
//!
//! These handlers drive the same task store operations the HTTP API uses,
//! printing results for a terminal instead of serializing them.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use chrono::Local;

use crate::cli::Cli;
use crate::coach::Coach;
use crate::dates::{format_due_relative, parse_due_input};
use crate::fields::{format_priority, CategoryIcon, Filter, Priority};
use crate::store::{CategoryPatch, TaskStore};
use crate::task::{CategoryDraft, Task, TaskDraft, TaskPatch};

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (chat endpoint + JSON task API).
    Serve,

    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "in Nd", or a weekday.
        #[arg(long)]
        due: Option<String>,
        /// Priority: low | medium | high | urgent.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Category name.
        #[arg(long)]
        category: Option<String>,
        /// Tag. May be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Parent task id (or unique id prefix / title).
        #[arg(long)]
        parent: Option<String>,
    },

    /// List tasks with optional filters.
    List {
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
        /// Show only completed tasks.
        #[arg(long)]
        completed: bool,
        /// Filter by category.
        #[arg(long)]
        category: Option<String>,
        /// Filter by priority.
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Free-text search; "due:YYYY-MM-DD" filters by due date.
        search: Option<String>,
    },

    /// View a single task.
    View {
        /// Task id, unique id prefix, or title.
        id: String,
    },

    /// Update fields on a task.
    Update {
        /// Task id, unique id prefix, or title.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// Clear the due date.
        #[arg(long)]
        clear_due: bool,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long)]
        category: Option<String>,
        /// Clear the category.
        #[arg(long)]
        clear_category: bool,
    },

    /// Toggle completion on a task (completing cascades to subtasks).
    Complete {
        /// Task id, unique id prefix, or title.
        id: String,
    },

    /// Delete a task and its direct subtasks.
    Delete {
        /// Task id, unique id prefix, or title.
        id: String,
    },

    /// Move a task to a new position in the list.
    Reorder {
        /// Current 0-based position.
        from: usize,
        /// Target 0-based position.
        to: usize,
    },

    /// Manage categories.
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// List distinct tags and counts.
    Tags,

    /// Show the derived task summary.
    Summary {
        /// Also print generated insights.
        #[arg(long)]
        insights: bool,
    },

    /// Ask the coach a question (or tell it to add a task).
    Chat {
        /// The message; multiple words are joined.
        #[arg(trailing_var_arg = true, required = true)]
        message: Vec<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// Create a category.
    Add {
        name: String,
        /// 6-digit hex colour.
        #[arg(long, default_value = "#6b7280")]
        color: String,
        #[arg(long, value_enum, default_value_t = CategoryIcon::Folder)]
        icon: CategoryIcon,
    },
    /// List categories.
    List,
    /// Update a category.
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long, value_enum)]
        icon: Option<CategoryIcon>,
    },
    /// Delete a category (tasks keep their other fields; the label clears).
    Delete { id: String },
}

/// Resolve a task identifier: exact id, unique id prefix, or
/// case-insensitive title. Ambiguity is an error telling the user to use
/// the id.
pub fn resolve_task_identifier(identifier: &str, store: &TaskStore) -> Result<String, String> {
    if store.get(identifier).is_some() {
        return Ok(identifier.to_string());
    }

    let by_prefix: Vec<&Task> = store
        .tasks()
        .iter()
        .filter(|t| t.id.starts_with(identifier))
        .collect();
    if by_prefix.len() == 1 {
        return Ok(by_prefix[0].id.clone());
    }

    let by_title: Vec<&Task> = store
        .tasks()
        .iter()
        .filter(|t| t.title.eq_ignore_ascii_case(identifier))
        .collect();
    match by_title.len() {
        0 => Err(format!("no task found matching '{identifier}'")),
        1 => Ok(by_title[0].id.clone()),
        _ => {
            let mut msg = format!("multiple tasks titled '{identifier}':\n");
            for t in by_title {
                msg.push_str(&format!("  {}  {}\n", short_id(&t.id), t.title));
            }
            msg.push_str("use the id instead.");
            Err(msg)
        }
    }
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(8)]
}

/// Print tasks in a formatted table, indenting subtasks.
pub fn print_table(tasks: &[&Task]) {
    println!(
        "{:<10} {:<4} {:<8} {:<10} {:<14} {}",
        "ID", "Done", "Pri", "Due", "Category", "Title [tags]"
    );
    let today = Local::now().date_naive();
    for t in tasks {
        let tags = if t.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", t.tags.join(","))
        };
        let indent = if t.parent_id.is_some() { "  " } else { "" };
        println!(
            "{:<10} {:<4} {:<8} {:<10} {:<14} {}{}{}",
            short_id(&t.id),
            if t.completed { "x" } else { "-" },
            format_priority(t.priority),
            format_due_relative(t.due_date, today),
            t.category.as_deref().unwrap_or("-"),
            indent,
            t.title,
            tags
        );
    }
}

pub async fn cmd_add(
    store: &mut TaskStore,
    title: String,
    desc: Option<String>,
    due: Option<String>,
    priority: Priority,
    category: Option<String>,
    tags: Vec<String>,
    parent: Option<String>,
) {
    if title.trim().is_empty() {
        eprintln!("title may not be empty");
        std::process::exit(1);
    }
    let parent_id = match parent {
        Some(p) => match resolve_task_identifier(&p, store) {
            Ok(id) => Some(id),
            Err(e) => {
                eprintln!("error resolving parent: {e}");
                std::process::exit(1);
            }
        },
        None => None,
    };
    let due_date = match &due {
        Some(s) => match parse_due_input(s) {
            Some(d) => Some(d),
            None => {
                eprintln!("unrecognized due date '{s}'");
                std::process::exit(1);
            }
        },
        None => None,
    };

    let draft = TaskDraft {
        title,
        description: desc,
        due_date,
        priority,
        category,
        tags,
        parent_id,
        ..TaskDraft::default()
    };
    match store.add_task(draft).await {
        Some(task) => println!("added {}  {}", short_id(&task.id), task.title),
        None => eprintln!("task was not saved (backend unavailable)"),
    }
}

pub fn cmd_list(
    store: &TaskStore,
    all: bool,
    completed: bool,
    category: Option<String>,
    priority: Option<Priority>,
    search: Option<String>,
) {
    let filter = Filter {
        category,
        priority,
        completed: if completed {
            Some(true)
        } else if all {
            None
        } else {
            Some(false)
        },
        search: search.unwrap_or_default(),
    };
    let tasks = store.filtered_tasks(&filter);
    if tasks.is_empty() {
        println!("no matching tasks");
        return;
    }
    print_table(&tasks);
}

pub fn cmd_view(store: &TaskStore, identifier: &str) {
    let id = match resolve_task_identifier(identifier, store) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let task = store.get(&id).expect("resolved id exists");
    println!("id:        {}", task.id);
    println!("title:     {}", task.title);
    if let Some(desc) = &task.description {
        println!("desc:      {desc}");
    }
    println!("completed: {}", task.completed);
    if let Some(at) = task.completed_at {
        println!("done at:   {at}");
    }
    println!("priority:  {}", format_priority(task.priority));
    println!(
        "due:       {}",
        format_due_relative(task.due_date, Local::now().date_naive())
    );
    println!("category:  {}", task.category.as_deref().unwrap_or("-"));
    if !task.tags.is_empty() {
        println!("tags:      {}", task.tags.join(", "));
    }
    if let Some(parent) = &task.parent_id {
        println!("parent:    {}", short_id(parent));
    }
    let subtasks: Vec<&Task> = store
        .tasks()
        .iter()
        .filter(|t| t.parent_id.as_deref() == Some(id.as_str()))
        .collect();
    if !subtasks.is_empty() {
        println!("subtasks:");
        for sub in subtasks {
            println!(
                "  [{}] {}  {}",
                if sub.completed { "x" } else { " " },
                short_id(&sub.id),
                sub.title
            );
        }
    }
    if task.ai_generated {
        println!("created by the coach");
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_update(
    store: &mut TaskStore,
    identifier: &str,
    title: Option<String>,
    desc: Option<String>,
    due: Option<String>,
    clear_due: bool,
    priority: Option<Priority>,
    category: Option<String>,
    clear_category: bool,
) {
    let id = match resolve_task_identifier(identifier, store) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let due_date = if clear_due {
        Some(None)
    } else {
        match &due {
            Some(s) => match parse_due_input(s) {
                Some(d) => Some(Some(d)),
                None => {
                    eprintln!("unrecognized due date '{s}'");
                    std::process::exit(1);
                }
            },
            None => None,
        }
    };
    let category = if clear_category {
        Some(None)
    } else {
        category.map(Some)
    };

    let patch = TaskPatch {
        title,
        description: desc.map(Some),
        due_date,
        priority,
        category,
        ..TaskPatch::default()
    };
    if patch.is_empty() {
        eprintln!("nothing to update");
        return;
    }
    if store.update_task(&id, patch).await {
        println!("updated {}", short_id(&id));
    } else {
        eprintln!("update was not saved");
    }
}

pub async fn cmd_complete(store: &mut TaskStore, identifier: &str) {
    let id = match resolve_task_identifier(identifier, store) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    if store.toggle_completion(&id).await {
        let task = store.get(&id).expect("resolved id exists");
        if task.completed {
            println!("completed {}  {}", short_id(&id), task.title);
        } else {
            println!("reopened {}  {}", short_id(&id), task.title);
        }
    } else {
        eprintln!("change was not saved");
    }
}

pub async fn cmd_delete(store: &mut TaskStore, identifier: &str) {
    let id = match resolve_task_identifier(identifier, store) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let subtasks = store
        .tasks()
        .iter()
        .filter(|t| t.parent_id.as_deref() == Some(id.as_str()))
        .count();
    if store.delete_task(&id).await {
        if subtasks > 0 {
            println!("deleted {} and {subtasks} subtask(s)", short_id(&id));
        } else {
            println!("deleted {}", short_id(&id));
        }
    } else {
        eprintln!("delete was not saved");
    }
}

pub async fn cmd_reorder(store: &mut TaskStore, from: usize, to: usize) {
    if store.reorder_tasks(from, to).await {
        print_table(&store.tasks().iter().collect::<Vec<_>>());
    } else {
        eprintln!("reorder failed (position out of range or backend unavailable)");
    }
}

pub async fn cmd_category(store: &mut TaskStore, action: CategoryAction) {
    match action {
        CategoryAction::Add { name, color, icon } => {
            match store.add_category(CategoryDraft { name, color, icon }).await {
                Ok(Some(c)) => println!("added category {}  {}", short_id(&c.id), c.name),
                Ok(None) => eprintln!("category was not saved"),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
        }
        CategoryAction::List => {
            if store.categories().is_empty() {
                println!("no categories");
                return;
            }
            println!("{:<10} {:<16} {:<8} {}", "ID", "Name", "Colour", "Icon");
            for c in store.categories() {
                println!(
                    "{:<10} {:<16} {:<8} {}",
                    short_id(&c.id),
                    c.name,
                    c.color,
                    c.icon.as_str()
                );
            }
        }
        CategoryAction::Update {
            id,
            name,
            color,
            icon,
        } => {
            let full_id = match store.categories().iter().find(|c| c.id.starts_with(&id)) {
                Some(c) => c.id.clone(),
                None => {
                    eprintln!("no category matching '{id}'");
                    std::process::exit(1);
                }
            };
            match store
                .update_category(&full_id, CategoryPatch { name, color, icon })
                .await
            {
                Ok(true) => println!("updated {}", short_id(&full_id)),
                Ok(false) => eprintln!("update was not saved"),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
        }
        CategoryAction::Delete { id } => {
            let full_id = match store.categories().iter().find(|c| c.id.starts_with(&id)) {
                Some(c) => c.id.clone(),
                None => {
                    eprintln!("no category matching '{id}'");
                    std::process::exit(1);
                }
            };
            if store.delete_category(&full_id).await {
                println!("deleted category; affected tasks are now uncategorized");
            } else {
                eprintln!("delete was not saved");
            }
        }
    }
}

pub fn cmd_tags(store: &TaskStore) {
    use std::collections::BTreeMap;
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for t in store.tasks() {
        for tag in &t.tags {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }
    if counts.is_empty() {
        println!("no tags");
        return;
    }
    for (tag, count) in counts {
        println!("{tag}  ({count})");
    }
}

pub fn cmd_summary(store: &TaskStore, with_insights: bool) {
    let s = store.summary();
    println!("total:           {}", s.total);
    println!("completed:       {} ({}%)", s.completed, s.completion_rate);
    println!("active:          {}", s.active);
    println!("completed today: {}", s.completed_today);
    println!("due today:       {}", s.due_today);
    println!("overdue:         {}", s.overdue);
    println!("high priority:   {}", s.high_priority);
    println!("urgent:          {}", s.urgent);
    println!("streak:          {} day(s)", s.streak_days);
    println!("created/day (7d): {:.1}", s.daily_created_avg);
    if !s.by_category.is_empty() {
        println!("by category:");
        for (name, count) in &s.by_category {
            println!("  {name}  ({count})");
        }
    }
    if with_insights {
        let insights = store.insights();
        if insights.is_empty() {
            println!("no insights right now");
        } else {
            println!("insights:");
            for i in insights {
                println!("  - {}", i.content);
            }
        }
    }
}

pub async fn cmd_chat(store: &mut TaskStore, coach: &Coach, message: &str) {
    if message.trim().is_empty() {
        eprintln!("say something, e.g.: taskcoach chat what should I prioritize?");
        std::process::exit(1);
    }
    let summary = store.summary();
    let categories = store.categories().to_vec();
    let reply = coach.respond(&summary, &categories, message).await;
    println!("{}", reply.message);
    if let Some(draft) = reply.task {
        if store.add_task(draft).await.is_none() {
            eprintln!("(the task could not be saved)");
        }
    }
}

pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
