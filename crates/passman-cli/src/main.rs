use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use passman_core::paths::{data_dir, socket_path};
use passman_core::{Entry, VaultClient};
use std::path::PathBuf;

mod generate;

use crate::generate::{generate_password, Charset};

const MASTER_PASSWORD_ENV: &str = "PASSMAN_MASTER_PASSWORD";

#[derive(Parser)]
#[command(name = "passman", version, about = "Command-line client for the passman vault", long_about = None)]
struct Cli {
    /// Daemon socket (defaults to PASSMAN_SOCKET or the data directory)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Print daemon replies as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new entry to the vault
    Add {
        service: String,
        username: String,
        /// Password (prompted for when omitted)
        #[arg(short, long)]
        password: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
        /// Advisory expiry, RFC 3339 (e.g. 2030-01-01T00:00:00Z)
        #[arg(short, long, value_parser = parse_expiry)]
        expiry: Option<DateTime<Utc>>,
    },

    /// Retrieve an entry
    Get {
        service: String,
        username: String,
        /// Print the password
        #[arg(short, long)]
        show: bool,
    },

    /// Replace the password and notes of an existing entry
    Update {
        service: String,
        username: String,
        #[arg(short, long)]
        password: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Delete an entry from the vault
    Delete { service: String, username: String },

    /// List all entries, or those whose service or username contains QUERY
    List { query: Option<String> },

    /// Lock the vault until it is unlocked with the same master password
    Lock,

    /// Unlock a locked vault
    Unlock,

    /// Generate a random password locally
    Generate {
        #[arg(short, long, default_value_t = 10)]
        length: usize,
        #[arg(short, long)]
        symbols: bool,
        #[arg(short, long)]
        numbers: bool,
        #[arg(short, long)]
        uppercase: bool,
        /// Characters to leave out
        #[arg(short = 'x', long)]
        exclude: Option<String>,
    },
}

fn parse_expiry(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp: {e}"))
}

fn read_password(given: Option<String>, prompt: &str) -> Result<String> {
    match given {
        Some(pw) => Ok(pw),
        None => rpassword::prompt_password(prompt).map_err(|e| anyhow!("password prompt: {e}")),
    }
}

fn master_password() -> Result<String> {
    if let Ok(pw) = std::env::var(MASTER_PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(pw);
        }
    }
    read_password(None, "Master password: ")
}

fn connect(flag: Option<PathBuf>) -> Result<(VaultClient, String)> {
    let socket = match flag {
        Some(path) => path,
        None => socket_path(&data_dir()?),
    };
    let hint = format!("is passmand running on {}?", socket.display());
    Ok((VaultClient::new(socket), hint))
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        socket,
        json,
        command,
    } = Cli::parse();

    match command {
        Commands::Add {
            service,
            username,
            password,
            notes,
            expiry,
        } => {
            let (client, hint) = connect(socket)?;
            let password = read_password(password, "Password: ")?;
            let mut entry = Entry::new(service, username, password);
            entry.notes = notes;
            entry.expiry = expiry;
            client.add(entry).await.context(hint)?;
            println!("Added.");
        }

        Commands::Get {
            service,
            username,
            show,
        } => {
            let (client, hint) = connect(socket)?;
            let result = client.get(&service, &username).await.context(hint)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                if show {
                    println!("Pass: {}", result.password);
                } else {
                    println!("Found {service}/{username} (use --show to print the password)");
                }
                if let Some(notes) = result.notes.filter(|n| !n.is_empty()) {
                    println!("Notes: {notes}");
                }
                if let Some(expiry) = result.expiry {
                    println!("Expires: {}", expiry.to_rfc3339());
                }
            }
        }

        Commands::Update {
            service,
            username,
            password,
            notes,
        } => {
            let (client, hint) = connect(socket)?;
            let password = read_password(password, "New password: ")?;
            client
                .update(&service, &username, &password, notes)
                .await
                .context(hint)?;
            println!("Updated.");
        }

        Commands::Delete { service, username } => {
            let (client, hint) = connect(socket)?;
            client.delete(&service, &username).await.context(hint)?;
            println!("Deleted.");
        }

        Commands::List { query } => {
            let (client, hint) = connect(socket)?;
            let entries = client.list(query).await.context(hint)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in entries {
                    println!(
                        "{}\t{}\t{}",
                        entry.service,
                        entry.username,
                        entry.notes.unwrap_or_default()
                    );
                }
            }
        }

        Commands::Lock => {
            let (client, hint) = connect(socket)?;
            let password = master_password()?;
            client.lock(&password).await.context(hint)?;
            println!("Vault locked.");
        }

        Commands::Unlock => {
            let (client, hint) = connect(socket)?;
            let password = master_password()?;
            client.unlock(&password).await.context(hint)?;
            println!("Vault unlocked.");
        }

        Commands::Generate {
            length,
            symbols,
            numbers,
            uppercase,
            exclude,
        } => {
            let charset = Charset {
                uppercase,
                symbols,
                numbers,
                exclude: exclude.unwrap_or_default(),
            };
            println!("{}", generate_password(length, &charset)?);
        }
    }

    Ok(())
}
