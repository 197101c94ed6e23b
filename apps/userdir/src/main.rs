mod form;
mod output;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use runtime::{default_logging_config, AppConfig, CliArgs};
use std::path::PathBuf;
use user_directory::{
    RestUserDirectory, UserDirectoryApi, UserDirectoryConfig, UserDirectoryError, UserId,
    MODULE_NAME,
};

/// userdir - manage users in a REST user directory
#[derive(Parser)]
#[command(name = "userdir")]
#[command(about = "userdir - manage users in a REST user directory")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend address (overrides config)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all users
    List,
    /// Create a user
    Create {
        #[arg(long)]
        user_name: String,
        #[arg(long)]
        email: String,
    },
    /// Replace the user name and email of an existing user
    Update {
        id: UserId,
        #[arg(long)]
        user_name: String,
        #[arg(long)]
        email: String,
    },
    /// Delete a user
    Delete { id: UserId },
    /// Validate configuration and probe the backend
    Check,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs { verbose: cli.verbose };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config
        .logging
        .clone()
        .unwrap_or_else(default_logging_config);
    runtime::logging::init_logging_from_config(&logging_config, config.home_dir());
    tracing::debug!(home_dir = %config.client.home_dir, "userdir starting");

    let mut directory_config: UserDirectoryConfig = config.module_config(MODULE_NAME)?;
    if let Some(base_url) = cli.base_url.clone() {
        directory_config.base_url = base_url;
    }

    if cli.print_config {
        config.modules.insert(
            MODULE_NAME.to_string(),
            serde_json::to_value(&directory_config)?,
        );
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    let directory = RestUserDirectory::from_config(&directory_config)?;
    tracing::debug!(base = %directory.base(), "Using user directory");

    let rendered = execute(&directory, cli.command.unwrap_or(Commands::List), cli.json).await?;
    print!("{rendered}");
    Ok(())
}

/// Run one command and return what should be printed on stdout.
async fn execute(directory: &dyn UserDirectoryApi, command: Commands, json: bool) -> Result<String> {
    let rendered = match command {
        Commands::List => {
            let users = directory.list_users().await.map_err(alert)?;
            output::users(&users, json)?
        }
        Commands::Create { user_name, email } => {
            let fields = form::user_fields(&user_name, &email)?;
            let created = directory.create_user(fields).await.map_err(alert)?;
            output::user(&created, json)?
        }
        Commands::Update {
            id,
            user_name,
            email,
        } => {
            let fields = form::user_fields(&user_name, &email)?;
            let updated = directory.update_user(id, fields).await.map_err(alert)?;
            output::user(&updated, json)?
        }
        Commands::Delete { id } => {
            directory.delete_user(id).await.map_err(alert)?;
            if json {
                format!("{}\n", serde_json::json!({ "deleted": id }))
            } else {
                format!("Deleted user {id}\n")
            }
        }
        Commands::Check => {
            tracing::info!("Checking configuration...");
            let users = directory.list_users().await.map_err(alert)?;
            format!(
                "Configuration check passed\nBackend reachable: {} users\n",
                users.len()
            )
        }
    };

    Ok(rendered)
}

fn alert(err: UserDirectoryError) -> anyhow::Error {
    tracing::debug!(error = ?err, "User directory call failed");
    anyhow!(output::alert(&err))
}
