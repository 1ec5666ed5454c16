//! Command dispatch

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use tracing::{debug, instrument};

use crate::application::{replay, IoResultExt, Replay, Script, Store};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::tree_traits::ToTermTree;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Replay { script, quiet }) => {
            let settings = Settings::load(cli.config.as_deref())?;
            replay_script(script, *quiet, &settings)
        }
        Some(Commands::Config { command }) => config_command(command, cli.config.as_deref()),
        Some(Commands::Completion { shell }) => {
            completion(*shell);
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see `nodestore --help`".to_string(),
        )),
    }
}

#[instrument(skip(settings))]
fn replay_script(path: &Path, quiet: bool, settings: &Settings) -> CliResult<()> {
    let script = Script::load(path)?;
    let replayed = replay(&script, settings)?;
    debug!("replayed {} step(s)", replayed.steps.len());

    if !quiet && settings.show_changes {
        print_steps(&replayed);
    }
    output::header(&format!("{} store", replayed.store.kind()));
    output::info(&render(&replayed.store));
    Ok(())
}

fn print_steps(replayed: &Replay) {
    for step in &replayed.steps {
        if step.applied {
            output::success(&step.op);
        } else {
            output::failure(&format!("{} (rejected)", step.op));
        }
        for change in &step.changes {
            output::change(change, change.is_end());
        }
    }
}

fn render(store: &Store) -> String {
    match store {
        Store::List(list) => list.to_tree_string().to_string(),
        Store::Table(table) => table.to_tree_string().to_string(),
        Store::Tree(tree) => tree.to_tree_string().to_string(),
    }
}

#[instrument]
fn config_command(command: &ConfigCommands, config_file: Option<&Path>) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(config_file)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => {
                    let state = if path.exists() { "exists" } else { "not found" };
                    output::action("global", &format!("{} ({})", path.display(), state));
                }
                None => output::warning("no config directory on this platform"),
            }
            if let Some(path) = config_file {
                output::action("override", &path.display());
            }
        }
        ConfigCommands::Init { force } => {
            let path = global_config_path().ok_or_else(|| {
                CliError::Usage("no config directory on this platform".to_string())
            })?;
            if path.exists() && !force {
                return Err(CliError::Usage(format!(
                    "{} exists, use --force to overwrite",
                    path.display()
                )));
            }
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir).with_path(dir)?;
            }
            std::fs::write(&path, Settings::template()).with_path(&path)?;
            output::success(&format!("created {}", path.display()));
        }
    }
    Ok(())
}

fn completion(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
