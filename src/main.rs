mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use code_assistant::config::{AssistantConfig, ConfigOverrides};
use code_assistant::storage::ContextDir;

use crate::cli::{Action, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "code_assistant=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let action = cli.action().unwrap_or_else(|e| e.exit());

    match action {
        Action::Setup => {
            cli::setup(&cli.root)?;
        }
        Action::Ask(question) => {
            let config = load_config(&cli)?;
            cli::ask(&cli.root, &config, &question).await?;
        }
        Action::Write {
            question,
            filename,
            yes,
        } => {
            let config = load_config(&cli)?;
            cli::write(&cli.root, &config, &question, &filename, yes).await?;
        }
        Action::Watch => {
            let config = load_config(&cli)?;
            cli::watch(&cli.root, &config)?;
        }
        Action::Status => {
            cli::status(&cli.root)?;
        }
        Action::History { all } => {
            cli::history(&cli.root, all)?;
        }
        Action::Clear { history } => {
            cli::clear(&cli.root, history)?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> code_assistant::Result<AssistantConfig> {
    let path = ContextDir::new(&cli.root).config_path();
    Ok(AssistantConfig::load(&path)?.with_overrides(ConfigOverrides {
        endpoint: cli.endpoint.clone(),
        model: cli.model.clone(),
    }))
}
