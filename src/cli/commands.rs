use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use dialoguer::Confirm;
use tracing::warn;

use code_assistant::config::AssistantConfig;
use code_assistant::error::{AssistantError, Result};
use code_assistant::index::IndexStore;
use code_assistant::indexer::{FileWatcher, IndexAction, Indexer, WatchFilter};
use code_assistant::inference::InferenceClient;
use code_assistant::memory::{build_prompt, conversation_context, project_context, HistoryStore};
use code_assistant::storage::ContextDir;
use code_assistant::writeback::{save_generated_code, WriteOutcome};

#[derive(Parser)]
#[command(name = "code-assistant")]
#[command(about = "Ask a local code model questions about the project in the current directory")]
#[command(version, arg_required_else_help = true, disable_help_subcommand = true)]
#[command(after_long_help = r#"
Any words other than `setup` or `write` form a question.

EXAMPLES:
    # Build the index for the current directory
    code-assistant setup

    # Ask a question (all remaining words form the question)
    code-assistant what files handle authentication

    # Generate code and write it to a file after confirmation
    code-assistant write "add a retry helper" utils/retry.py

    # Keep the index current while editing
    code-assistant --watch

    # Show index statistics and freshness
    code-assistant --status

    # Delete the index and the conversation history
    code-assistant --clear --clear-history
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub operation: Operation,

    /// With --history, print every stored turn instead of the recent window
    #[arg(long, requires = "history")]
    pub all: bool,

    /// With --clear, also delete the conversation history
    #[arg(long, requires = "clear")]
    pub clear_history: bool,

    /// Project root to index and query
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Generation endpoint URL
    #[arg(long, global = true, env = "CODE_ASSISTANT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Model name sent with each request
    #[arg(long, global = true, env = "CODE_ASSISTANT_MODEL")]
    pub model: Option<String>,
}

/// Maintenance operations. They are flags so that no question word can
/// select one.
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
pub struct Operation {
    /// Keep the index up to date as files change
    #[arg(long)]
    pub watch: bool,

    /// Show index statistics and whether the index is current
    #[arg(long)]
    pub status: bool,

    /// Print the recent conversation
    #[arg(long)]
    pub history: bool,

    /// Delete the index documents
    #[arg(long)]
    pub clear: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index the whole project (unchanged files are reused)
    Setup,

    /// Ask for code and write the first code block of the answer to a file
    Write {
        /// What to generate
        question: String,

        /// Target file, relative to the project root
        filename: PathBuf,

        /// Write without asking for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    #[command(external_subcommand)]
    Question(Vec<String>),
}

/// What a command line asks for, after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Setup,
    Ask(String),
    Write {
        question: String,
        filename: PathBuf,
        yes: bool,
    },
    Watch,
    Status,
    History { all: bool },
    Clear { history: bool },
}

impl Cli {
    pub fn action(&self) -> std::result::Result<Action, clap::Error> {
        let flag = self.operation.selected();
        match (&self.command, flag) {
            (Some(_), Some(flag)) => Err(Self::command().error(
                ErrorKind::ArgumentConflict,
                format!("--{} cannot be combined with a question or subcommand", flag),
            )),
            (Some(Commands::Setup), None) => Ok(Action::Setup),
            (Some(Commands::Write { question, filename, yes }), None) => Ok(Action::Write {
                question: question.clone(),
                filename: filename.clone(),
                yes: *yes,
            }),
            (Some(Commands::Question(words)), None) => Ok(Action::Ask(words.join(" "))),
            (None, Some("watch")) => Ok(Action::Watch),
            (None, Some("status")) => Ok(Action::Status),
            (None, Some("history")) => Ok(Action::History { all: self.all }),
            (None, Some(_)) => Ok(Action::Clear {
                history: self.clear_history,
            }),
            (None, None) => Err(Self::command().error(
                ErrorKind::MissingSubcommand,
                "expected a question, `setup`, `write` or one of --watch, --status, --history, --clear",
            )),
        }
    }
}

impl Operation {
    fn selected(&self) -> Option<&'static str> {
        [
            (self.watch, "watch"),
            (self.status, "status"),
            (self.history, "history"),
            (self.clear, "clear"),
        ]
        .into_iter()
        .find_map(|(set, name)| set.then_some(name))
    }
}

pub fn setup(root: &Path) -> Result<()> {
    let indexer = Indexer::new(root)?;
    println!("Indexing {}...", indexer.root().display());

    let mut store = indexer.open_store()?;
    let report = indexer.full_rescan(&mut store)?;

    println!(
        "Indexed {} files ({} analyzed, {} unchanged, {} removed)",
        report.total_indexed(),
        report.analyzed,
        report.reused,
        report.removed
    );
    println!("Context stored in {}", indexer.context().dir().display());
    Ok(())
}

pub async fn ask(root: &Path, config: &AssistantConfig, question: &str) -> Result<()> {
    let indexer = Indexer::new(root)?;
    answer(&indexer, config, question).await?;
    Ok(())
}

pub async fn write(
    root: &Path,
    config: &AssistantConfig,
    question: &str,
    filename: &Path,
    yes: bool,
) -> Result<()> {
    let indexer = Indexer::new(root)?;
    let Some(text) = answer(&indexer, config, question).await? else {
        return Ok(());
    };

    let target = indexer.root().join(filename);
    let outcome = save_generated_code(&text, &target, |target| {
        if yes {
            return Ok(true);
        }
        Confirm::new()
            .with_prompt(format!("Write code to {}?", target.display()))
            .default(false)
            .interact()
            .map_err(|e| AssistantError::Prompt(e.to_string()))
    })?;

    match outcome {
        WriteOutcome::NoCodeBlock => {
            println!("No code block found in the response; nothing written")
        }
        WriteOutcome::Declined => println!("Nothing written"),
        WriteOutcome::Written { backup } => {
            if let Some(backup) = backup {
                println!("Backup saved to {}", backup.display());
            }
            println!("Code written to {}", target.display());
        }
    }
    Ok(())
}

/// Runs one query end to end. Returns `None` when no answer could be
/// obtained; that case has already been reported to the user.
async fn answer(
    indexer: &Indexer,
    config: &AssistantConfig,
    question: &str,
) -> Result<Option<String>> {
    let refresh = indexer.refresh()?;
    if let Some(report) = &refresh.report {
        println!(
            "Changes detected ({}), re-indexed {} files",
            refresh.staleness,
            report.total_indexed()
        );
    }

    let history = HistoryStore::new(indexer.context());
    let recent = history.recent()?;
    let prompt = build_prompt(
        &project_context(question, refresh.store.records()),
        &conversation_context(&recent),
        question,
    );

    let client = InferenceClient::new(config.inference.clone())?;
    let mut printed = false;
    let result = client
        .generate(&prompt, |piece| {
            printed = true;
            print!("{}", piece);
            let _ = io::stdout().flush();
        })
        .await;

    match result {
        Ok(generation) => {
            if printed {
                println!();
            }
            if !generation.streamed {
                println!("{}", generation.text);
            }
            history.append_exchange(question, &generation.text)?;
            Ok(Some(generation.text))
        }
        Err(e) => {
            if printed {
                println!();
            }
            warn!("Inference failed: {}", e);
            println!(
                "Could not get an answer from {} (model {}). Is the model server running?",
                config.inference.endpoint, config.inference.model
            );
            Ok(None)
        }
    }
}

pub fn watch(root: &Path, config: &AssistantConfig) -> Result<()> {
    let indexer = Indexer::new(root)?;
    let mut store = indexer.refresh()?.store;
    println!("Indexed {} files", store.len());

    let watcher = FileWatcher::new(indexer.root())?;
    let mut filter = WatchFilter::new(indexer.root(), config.watch.debounce());
    println!("Watching {} for changes...", indexer.root().display());

    while let Some(events) = watcher.recv() {
        let mut dirty = false;

        for event in events {
            let Some(action) = filter.accept(event, Instant::now()) else {
                continue;
            };

            match indexer.apply(&mut store, &action) {
                Ok(outcome) if outcome.is_change() => {
                    dirty = true;
                    match &action {
                        IndexAction::Update(path) => {
                            println!("Updated {}", display_relative(indexer.root(), path))
                        }
                        IndexAction::Remove(path) => {
                            println!("Removed {}", display_relative(indexer.root(), path))
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to apply {:?}: {}", action, e),
            }
        }

        if dirty {
            store.save()?;
        }
    }

    Ok(())
}

pub fn status(root: &Path) -> Result<()> {
    let indexer = Indexer::new(root)?;
    let store = indexer.open_store()?;
    let staleness = indexer.detect(&store);
    let stats = store.stats();
    let turns = HistoryStore::new(indexer.context()).load_all()?.len();

    println!("Index Statistics:");
    println!("  Root: {}", indexer.root().display());
    println!("  Total files: {}", stats.total_files);
    println!("  Total lines: {}", stats.total_lines);
    println!("  Total bytes: {}", stats.total_bytes);

    if !stats.files_by_extension.is_empty() {
        println!("\n  Files by type:");
        for (extension, count) in &stats.files_by_extension {
            println!("    {}: {}", extension, count);
        }
    }

    println!("\n  Index: {}", staleness);
    println!("  Conversation turns: {}", turns);
    Ok(())
}

pub fn history(root: &Path, all: bool) -> Result<()> {
    let history = HistoryStore::new(&ContextDir::new(root));
    let turns = if all {
        history.load_all()?
    } else {
        history.recent()?
    };

    if turns.is_empty() {
        println!("No conversation history");
        return Ok(());
    }

    for turn in turns {
        println!(
            "[{}] {}:",
            turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
            turn.kind.label()
        );
        println!("{}\n", turn.content);
    }
    Ok(())
}

pub fn clear(root: &Path, history: bool) -> Result<()> {
    let context = ContextDir::new(root);
    IndexStore::empty(context.clone()).clear()?;
    println!("Index cleared");

    if history {
        HistoryStore::new(&context).clear()?;
        println!("Conversation history cleared");
    }
    Ok(())
}

fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(args: &[&str]) -> std::result::Result<Action, clap::Error> {
        let mut argv = vec!["code-assistant"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv)?.action()
    }

    #[test]
    fn test_no_arguments_prints_usage() {
        let err = Cli::try_parse_from(["code-assistant"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand);
    }

    #[test]
    fn test_words_join_into_question() {
        assert_eq!(
            action(&["explain", "main"]).unwrap(),
            Action::Ask("explain main".to_string())
        );
        assert_eq!(
            action(&["what files handle authentication?"]).unwrap(),
            Action::Ask("what files handle authentication?".to_string())
        );
    }

    #[test]
    fn test_operation_words_start_questions() {
        assert_eq!(
            action(&["status", "of", "the", "auth", "module"]).unwrap(),
            Action::Ask("status of the auth module".to_string())
        );
        assert_eq!(
            action(&["history", "of", "main.py"]).unwrap(),
            Action::Ask("history of main.py".to_string())
        );
        assert_eq!(action(&["clear"]).unwrap(), Action::Ask("clear".to_string()));
        assert_eq!(action(&["watch"]).unwrap(), Action::Ask("watch".to_string()));
        assert_eq!(action(&["help"]).unwrap(), Action::Ask("help".to_string()));
    }

    #[test]
    fn test_setup() {
        assert_eq!(action(&["setup"]).unwrap(), Action::Setup);
    }

    #[test]
    fn test_write_arguments() {
        assert_eq!(
            action(&["write", "add a retry helper", "utils/retry.py"]).unwrap(),
            Action::Write {
                question: "add a retry helper".to_string(),
                filename: PathBuf::from("utils/retry.py"),
                yes: false,
            }
        );
        assert_eq!(
            action(&["write", "add a retry helper", "utils/retry.py", "--yes"]).unwrap(),
            Action::Write {
                question: "add a retry helper".to_string(),
                filename: PathBuf::from("utils/retry.py"),
                yes: true,
            }
        );
    }

    #[test]
    fn test_write_requires_filename() {
        assert!(action(&["write", "add a retry helper"]).is_err());
    }

    #[test]
    fn test_operation_flags() {
        assert_eq!(action(&["--watch"]).unwrap(), Action::Watch);
        assert_eq!(action(&["--status"]).unwrap(), Action::Status);
        assert_eq!(action(&["--history"]).unwrap(), Action::History { all: false });
        assert_eq!(
            action(&["--history", "--all"]).unwrap(),
            Action::History { all: true }
        );
        assert_eq!(action(&["--clear"]).unwrap(), Action::Clear { history: false });
        assert_eq!(
            action(&["--clear", "--clear-history"]).unwrap(),
            Action::Clear { history: true }
        );
    }

    #[test]
    fn test_operation_flags_are_exclusive() {
        assert!(action(&["--status", "--clear"]).is_err());
        assert!(action(&["--all"]).is_err());
        assert!(action(&["--clear-history"]).is_err());
    }

    #[test]
    fn test_operation_flag_rejects_question_and_subcommand() {
        let err = action(&["--status", "of", "main"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        let err = action(&["--clear", "setup"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_global_options_without_action_is_error() {
        let err = action(&["--root", "/tmp/project"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingSubcommand);
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::try_parse_from([
            "code-assistant",
            "--root",
            "/tmp/project",
            "--endpoint",
            "http://gpu-box:11434/api/generate",
            "--model",
            "llama3:8b",
            "explain",
            "main",
        ])
        .unwrap();

        assert_eq!(cli.root, PathBuf::from("/tmp/project"));
        assert_eq!(cli.endpoint.as_deref(), Some("http://gpu-box:11434/api/generate"));
        assert_eq!(cli.model.as_deref(), Some("llama3:8b"));
        assert_eq!(cli.action().unwrap(), Action::Ask("explain main".to_string()));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["code-assistant", "setup", "--root", "/tmp/project"]).unwrap();
        assert_eq!(cli.root, PathBuf::from("/tmp/project"));
        assert_eq!(cli.action().unwrap(), Action::Setup);
    }

    #[test]
    fn test_default_root() {
        let cli = Cli::try_parse_from(["code-assistant", "setup"]).unwrap();
        assert_eq!(cli.root, PathBuf::from("."));
    }

    #[test]
    fn test_endpoint_and_model_read_environment() {
        let command = Cli::command();
        let env_of = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_env())
                .map(|name| name.to_string_lossy().into_owned())
        };

        assert_eq!(env_of("endpoint").as_deref(), Some("CODE_ASSISTANT_ENDPOINT"));
        assert_eq!(env_of("model").as_deref(), Some("CODE_ASSISTANT_MODEL"));
    }
}
