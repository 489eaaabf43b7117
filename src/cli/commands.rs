//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::TreeView;
use crate::load_with;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|e| CliError::Usage(format!("cannot determine current directory: {e}")))?,
    };

    match &cli.command {
        Some(Commands::Show { store }) => cmd_show(&load_settings(&dir)?, store),
        Some(Commands::Flatten {
            store,
            flat_names,
            separator,
        }) => cmd_flatten(&load_settings(&dir)?, store, *flat_names, separator.as_deref()),
        Some(Commands::Config { command }) => cmd_config(&dir, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "nestkit", &mut io::stdout());
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map_err(|e| CliError::Usage(e.to_string())),
    }
}

fn load_settings(dir: &Path) -> CliResult<Settings> {
    Ok(Settings::load(Some(dir))?)
}

#[instrument(skip(settings))]
fn cmd_show(settings: &Settings, store: &Path) -> CliResult<()> {
    let tree = load_with(settings, store)?;
    output::info(&tree.to_tree_string(&store.display().to_string()));
    Ok(())
}

#[instrument(skip(settings))]
fn cmd_flatten(
    settings: &Settings,
    store: &Path,
    flat_names: bool,
    separator: Option<&str>,
) -> CliResult<()> {
    let mut settings = settings.clone();
    if flat_names {
        settings.keep_nested_name = false;
    }
    if let Some(separator) = separator {
        if separator.is_empty() {
            return Err(CliError::InvalidArgs("separator must not be empty".to_string()));
        }
        settings.separator = separator.to_string();
    }
    debug!("flatten: {:?}", settings);

    let tree = load_with(&settings, store)?;
    let flat = settings
        .flattener()
        .flatten(&tree)
        .map_err(ApplicationError::from)?;
    for (key, value) in &flat {
        output::entry(key, value);
    }
    Ok(())
}

fn cmd_config(dir: &Path, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(dir)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            output::header("Config files");
            let global = global_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unavailable)".to_string());
            output::detail(&format!("global: {global}"));
            let local: PathBuf = local_config_path(dir);
            output::detail(&format!("local:  {}", local.display()));
        }
    }
    Ok(())
}
