//! Command-line front end for the todo tree store.
//!
//! # Responsibility
//! - Map subcommands onto `TodoService` use cases against one database file.
//! - Print trees as JSON on stdout; errors go to stderr with exit code 1.
//!
//! # Configuration
//! - `TODOTREE_LOG_DIR` enables file logging; `TODOTREE_LOG_LEVEL` overrides
//!   the build-mode default level.

use clap::{Args, Parser, Subcommand};
use log::info;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use todotree_core::db::open_db;
use todotree_core::logging::{init_with, LogSettings};
use todotree_core::{
    graph_from_json, MaxDepth, NodeHandle, PopulatedTree, SqliteTodoRepository, TodoGraph, TodoId,
    TodoService,
};

/// Store and load todo trees in a SQLite file.
#[derive(Debug, Parser)]
#[command(name = "todotree", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct Store {
    /// SQLite file holding the todos; created and migrated on first use
    #[arg(short, long, value_name = "FILE")]
    db: PathBuf,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Check that the core library answers
    Ping,
    /// Save a JSON tree as a new top-level tree
    Save {
        #[command(flatten)]
        store: Store,
        /// Payload file: {"description", "done"?, "subTodos"?: [todo | id]}
        file: PathBuf,
    },
    /// Print one tree, children resolved up to max-depth levels
    Show {
        #[command(flatten)]
        store: Store,
        #[arg(value_parser = parse_todo_id)]
        id: TodoId,
        /// Levels to resolve; omit for the whole tree
        max_depth: Option<usize>,
    },
    /// Print every top-level tree, oldest first
    Roots {
        #[command(flatten)]
        store: Store,
        max_depth: Option<usize>,
    },
    /// Replace a tree; an unknown id stores the payload as a new tree
    Put {
        #[command(flatten)]
        store: Store,
        #[arg(value_parser = parse_todo_id)]
        id: TodoId,
        file: PathBuf,
    },
    /// Replace an existing tree
    Update {
        #[command(flatten)]
        store: Store,
        #[arg(value_parser = parse_todo_id)]
        id: TodoId,
        file: PathBuf,
    },
    /// Delete a top-level tree and the descendants nothing else references
    Delete {
        #[command(flatten)]
        store: Store,
        #[arg(value_parser = parse_todo_id)]
        id: TodoId,
    },
    /// Print one stored record as-is, children as ids
    Record {
        #[command(flatten)]
        store: Store,
        #[arg(value_parser = parse_todo_id)]
        id: TodoId,
    },
}

impl Command {
    /// Database the command works on; `None` for commands that need none.
    fn db(&self) -> Option<&Path> {
        match self {
            Self::Ping => None,
            Self::Save { store, .. }
            | Self::Show { store, .. }
            | Self::Roots { store, .. }
            | Self::Put { store, .. }
            | Self::Update { store, .. }
            | Self::Delete { store, .. }
            | Self::Record { store, .. } => Some(&store.db),
        }
    }
}

fn parse_todo_id(raw: &str) -> Result<TodoId, String> {
    TodoId::parse_str(raw).map_err(|_| format!("`{raw}` is not a todo id"))
}

#[derive(Debug)]
enum CliError {
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
    Core(Box<dyn Error>),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "invalid json: {err}"),
            Self::Core(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CliError {}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

fn core_err(err: impl Error + 'static) -> CliError {
    CliError::Core(Box::new(err))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = LogSettings::from_env().and_then(|settings| match settings {
        Some(settings) => init_with(settings),
        None => Ok(()),
    }) {
        eprintln!("logging disabled: {err}");
    }

    match run(cli.command) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn ping_line() -> String {
    format!(
        "todotree_core ping={} version={}",
        todotree_core::ping(),
        todotree_core::core_version()
    )
}

fn run(command: Command) -> Result<String, CliError> {
    let Some(db) = command.db().map(Path::to_path_buf) else {
        return Ok(ping_line());
    };
    let conn = open_db(&db).map_err(core_err)?;
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).map_err(core_err)?);
    info!(
        "event=cli_command module=cli status=start db={}",
        db.display()
    );

    match command {
        Command::Ping => Ok(ping_line()),
        Command::Save { file, .. } => {
            let (graph, root) = read_graph(&file)?;
            render(&service.create_root_tree(graph, root).map_err(core_err)?)
        }
        Command::Put { id, file, .. } => {
            let (graph, root) = read_graph(&file)?;
            render(&service.put_tree(id, graph, root).map_err(core_err)?)
        }
        Command::Update { id, file, .. } => {
            let (graph, root) = read_graph(&file)?;
            render(&service.update_tree(id, graph, root).map_err(core_err)?)
        }
        Command::Show { id, max_depth, .. } => {
            let tree = service
                .get_tree(id, MaxDepth::from(max_depth))
                .map_err(core_err)?;
            render(&tree)
        }
        Command::Roots { max_depth, .. } => {
            let trees = service
                .list_root_trees(MaxDepth::from(max_depth))
                .map_err(core_err)?;
            let values = trees
                .iter()
                .map(|tree| tree.to_json().map_err(core_err))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(serde_json::to_string_pretty(&Value::Array(values))?)
        }
        Command::Delete { id, .. } => {
            service.delete_tree(id).map_err(core_err)?;
            Ok(format!("deleted {id}"))
        }
        Command::Record { id, .. } => {
            let record = service.get_record(id).map_err(core_err)?;
            Ok(serde_json::to_string_pretty(&record)?)
        }
    }
}

fn read_graph(file: &Path) -> Result<(TodoGraph, NodeHandle), CliError> {
    let raw = std::fs::read_to_string(file).map_err(|source| CliError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let payload: Value = serde_json::from_str(&raw)?;
    graph_from_json(&payload).map_err(core_err)
}

fn render(tree: &PopulatedTree) -> Result<String, CliError> {
    let value = tree.to_json().map_err(core_err)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::error::ErrorKind;
    use clap::{CommandFactory, Parser};
    use std::path::Path;

    const ID: &str = "6f1c2d4e-8a3b-4c5d-9e6f-7a8b9c0d1e2f";

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_show_with_and_without_depth() {
        let bounded = Cli::try_parse_from(["todotree", "show", "--db", "todos.db", ID, "2"])
            .expect("valid args");
        assert!(matches!(
            bounded.command,
            Command::Show { max_depth: Some(2), .. }
        ));

        let unbounded = Cli::try_parse_from(["todotree", "show", "-d", "todos.db", ID])
            .expect("valid args");
        assert!(matches!(
            unbounded.command,
            Command::Show { max_depth: None, ref id, .. } if id.to_string() == ID
        ));
        assert_eq!(unbounded.command.db(), Some(Path::new("todos.db")));
    }

    #[test]
    fn rejects_bad_id_and_unknown_command() {
        let bad_id = Cli::try_parse_from(["todotree", "delete", "--db", "todos.db", "nope"])
            .unwrap_err();
        assert_eq!(bad_id.kind(), ErrorKind::ValueValidation);
        assert!(bad_id.to_string().contains("`nope` is not a todo id"));

        let unknown = Cli::try_parse_from(["todotree", "frobnicate"]).unwrap_err();
        assert_eq!(unknown.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn put_and_update_take_id_and_file() {
        let put = Cli::try_parse_from(["todotree", "put", "--db", "todos.db", ID, "tree.json"])
            .expect("valid args");
        assert!(matches!(
            put.command,
            Command::Put { ref file, .. } if file == Path::new("tree.json")
        ));

        let missing_file = Cli::try_parse_from(["todotree", "update", "--db", "todos.db", ID])
            .unwrap_err();
        assert_eq!(missing_file.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn store_commands_require_a_database() {
        let err = Cli::try_parse_from(["todotree", "roots"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn ping_needs_no_database() {
        let cli = Cli::try_parse_from(["todotree", "ping"]).expect("valid args");
        assert!(matches!(cli.command, Command::Ping));
        assert_eq!(cli.command.db(), None);
    }
}
