use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{load_settings, KanbanSession, ReorderOutcome, StatusColumns};
use shared::{
    domain::{BoardId, Priority, TaskId, TaskStatus},
    protocol::{CreateTaskRequest, NewSubtask, NotificationKind, NotificationRecord},
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Kanban board client")]
struct Cli {
    /// Overrides the configured board service url.
    #[arg(long)]
    api_url: Option<String>,
    /// Print raw JSON instead of the column view.
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Boards {
        #[arg(long)]
        query: Option<String>,
    },
    CreateBoard {
        name: String,
    },
    RenameBoard {
        board_id: String,
        name: String,
    },
    DeleteBoard {
        board_id: String,
    },
    Show {
        board_id: String,
    },
    AddTask {
        board_id: String,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "todo", value_parser = parse_status)]
        status: TaskStatus,
        #[arg(long, default_value = "medium", value_parser = parse_priority)]
        priority: Priority,
        #[arg(long = "subtask")]
        subtasks: Vec<String>,
    },
    Move {
        board_id: String,
        task_id: String,
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },
    Priority {
        board_id: String,
        task_id: String,
        #[arg(value_parser = parse_priority)]
        priority: Priority,
    },
    /// Saves a new board order; list every board id in the wanted order.
    Reorder {
        #[arg(required = true)]
        board_ids: Vec<String>,
    },
    Invite {
        board_id: String,
        email: String,
    },
    Accept {
        board_id: String,
    },
    Notifications {
        #[arg(long)]
        mark_read: bool,
    },
}

fn parse_status(raw: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(raw).ok_or_else(|| format!("unknown status '{raw}' (todo, doing, done)"))
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    Priority::parse(raw).ok_or_else(|| format!("unknown priority '{raw}' (high, medium, low)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url.clone() {
        settings.api_url = Some(api_url);
    }
    let session =
        KanbanSession::from_settings(&settings).context("failed to initialize kanban session")?;
    info!(
        environment = ?settings.environment,
        api_url = settings.api_url.as_deref().unwrap_or("(environment default)"),
        "kanban session ready"
    );
    debug!(command = ?cli.command, json = cli.json, "running command");

    match cli.command {
        Command::Boards { query } => {
            let boards = session
                .load_boards(query.as_deref())
                .await
                .context("failed to list boards")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&boards)?);
            } else {
                for board in boards {
                    println!("{}  {}", board.board_id, board.board_name);
                }
            }
        }
        Command::CreateBoard { name } => {
            session
                .create_board(&name)
                .await
                .context("failed to create board")?;
            println!("created board '{}'", name.trim());
        }
        Command::RenameBoard { board_id, name } => {
            session
                .rename_board(&BoardId::new(board_id), &name)
                .await
                .context("failed to rename board")?;
            println!("renamed board to '{}'", name.trim());
        }
        Command::DeleteBoard { board_id } => {
            session
                .delete_board(&BoardId::new(board_id.clone()))
                .await
                .context("failed to delete board")?;
            println!("deleted board {board_id}");
        }
        Command::Show { board_id } => {
            session
                .select_board(&BoardId::new(board_id))
                .await
                .context("failed to load board")?;
            let Some(board) = session.selected_board().await else {
                bail!("board snapshot was not installed");
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&board)?);
            } else {
                println!("{}", board.board_name);
                print_columns(&session.current_view().await);
            }
        }
        Command::AddTask {
            board_id,
            title,
            description,
            status,
            priority,
            subtasks,
        } => {
            session
                .select_board(&BoardId::new(board_id))
                .await
                .context("failed to load board")?;
            session
                .create_task(CreateTaskRequest {
                    title,
                    description,
                    subtasks: subtasks.into_iter().map(|name| NewSubtask { name }).collect(),
                    status,
                    priority,
                    deadline: None,
                })
                .await
                .context("failed to create task")?;
            print_columns(&session.current_view().await);
        }
        Command::Move {
            board_id,
            task_id,
            status,
        } => {
            session
                .select_board(&BoardId::new(board_id))
                .await
                .context("failed to load board")?;
            match session
                .move_task(&TaskId::new(task_id), status)
                .await
                .context("failed to move task")?
            {
                Some(commit) => println!("moved {} to {}", commit.task_id, status.label()),
                None => println!("task already in {}", status.label()),
            }
            print_columns(&session.current_view().await);
        }
        Command::Priority {
            board_id,
            task_id,
            priority,
        } => {
            session
                .select_board(&BoardId::new(board_id))
                .await
                .context("failed to load board")?;
            let changed = session
                .change_priority(&TaskId::new(task_id), priority)
                .await
                .context("failed to change priority")?;
            if !changed {
                println!("priority unchanged");
            }
        }
        Command::Reorder { board_ids } => {
            session
                .load_boards(None)
                .await
                .context("failed to list boards")?;
            let proposed = board_ids.into_iter().map(BoardId::new).collect();
            match session
                .commit_reorder(proposed)
                .await
                .context("failed to save board order")?
            {
                ReorderOutcome::Unchanged => println!("board order unchanged"),
                ReorderOutcome::Committed(entries) => {
                    println!("saved {} board position(s)", entries.len())
                }
            }
        }
        Command::Invite { board_id, email } => {
            let board_id = BoardId::new(board_id);
            session
                .select_board(&board_id)
                .await
                .context("failed to load board")?;
            let user = session
                .invite_user(&board_id, &email)
                .await
                .context("failed to invite user")?;
            println!("invited {}", user.name);
            println!("invite link: {}", session.invite_link(&board_id));
        }
        Command::Accept { board_id } => {
            session
                .accept_invite(&BoardId::new(board_id))
                .await
                .context("failed to accept invite")?;
            println!("invite accepted");
        }
        Command::Notifications { mark_read } => {
            let records = session
                .notifications()
                .await
                .context("failed to load notifications")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    println!("{}", describe(record));
                }
            }
            if mark_read {
                session
                    .mark_all_read()
                    .await
                    .context("failed to mark notifications read")?;
            }
        }
    }

    Ok(())
}

fn print_columns(columns: &StatusColumns) {
    for status in TaskStatus::ALL {
        let tasks = columns.column(status);
        println!("{} ({})", status.label().to_uppercase(), tasks.len());
        for task in tasks {
            println!(
                "  {}  {} [{}] {}",
                task.task_id,
                task.title,
                task.priority.as_str(),
                task.progress_label()
            );
        }
    }
}

fn describe(record: &NotificationRecord) -> String {
    let actor = &record.action_by.name;
    let board = record.board.as_ref().map_or("a board", |b| b.name.as_str());
    let task = record.task.as_ref().map_or("a task", |t| t.name.as_str());
    let marker = if record.read { " " } else { "*" };
    let text = match record.kind {
        NotificationKind::Assign => format!("{actor} assigned you to {task} on {board}"),
        NotificationKind::Unassign => format!("{actor} removed you from {task} on {board}"),
        NotificationKind::Move | NotificationKind::Status => {
            format!("{actor} moved {task} on {board}")
        }
        NotificationKind::Join => format!("{actor} joined {board}"),
    };
    format!("{marker} {}  {text}", record.timestamp.format("%Y-%m-%d %H:%M"))
}
