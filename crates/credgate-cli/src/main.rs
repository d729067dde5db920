mod commands;

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use credgate_core::{
    CONFIG_FILE, USERS_FILE, default_config_dir, load_config_or_default,
    write_default_config_files,
};
use tracing_subscriber::EnvFilter;

use crate::commands::auth;

#[derive(Debug, Parser)]
#[command(name = "credgate", about = "credgate — email/password login and session tokens")]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write default auth.toml and users.toml
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Hash a password for users.toml (prompted, never echoed)
    HashPassword {
        /// Read the password from stdin instead of prompting
        #[arg(long)]
        password_stdin: bool,
    },
    /// Log in with email/password and print a session token
    Login {
        #[arg(long)]
        email: String,
        /// Read the password from stdin instead of prompting
        #[arg(long)]
        password_stdin: bool,
    },
    /// Resolve an email to its user id
    Resolve {
        #[arg(long)]
        email: String,
    },
    /// Authenticate a session token against the current user directory
    Whoami {
        #[arg(long)]
        token: String,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("credgate=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let cfg_dir = cli.config_dir.clone().unwrap_or_else(default_config_dir);

    match cli.command {
        Commands::Init { force } => {
            if force && cfg_dir.exists() {
                for name in [CONFIG_FILE, USERS_FILE] {
                    let p = cfg_dir.join(name);
                    if p.exists() {
                        fs::remove_file(&p)?;
                    }
                }
            }
            write_default_config_files(&cfg_dir)?;
            pout(
                cli.json,
                serde_json::json!({"message":"init complete","config_dir":cfg_dir}),
                "Init complete",
            )?;
        }
        Commands::HashPassword { password_stdin } => {
            let config = load_config_or_default(&cfg_dir)?;
            return auth::cmd_hash_password(&config, password_stdin, cli.json);
        }
        Commands::Login {
            email,
            password_stdin,
        } => {
            let config = load_config_or_default(&cfg_dir)?;
            return auth::cmd_login(&config, &cfg_dir, &email, password_stdin, cli.json);
        }
        Commands::Resolve { email } => {
            let config = load_config_or_default(&cfg_dir)?;
            return auth::cmd_resolve(&config, &cfg_dir, &email, cli.json);
        }
        Commands::Whoami { token } => {
            let config = load_config_or_default(&cfg_dir)?;
            return auth::cmd_whoami(&config, &cfg_dir, &token, cli.json);
        }
    }

    Ok(())
}

pub fn pout(json_mode: bool, value: serde_json::Value, text: &str) -> anyhow::Result<()> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{text}");
    }
    Ok(())
}
