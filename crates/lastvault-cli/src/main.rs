//! lastvault: command-line client for the password vault service
//!
//! Commands:
//!   ls                  - list every account
//!   show <id>           - print one account
//!   search <value>      - find accounts by id, name, url or username
//!   add                 - create an account
//!   edit <id>           - change fields of an existing account
//!   rm <id>             - delete an account
//!   config show         - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use lastvault_client::{Field, HttpTransport, LoginRequest, SearchMethod, Vault};
use lastvault_core::{Account, LastvaultConfig, VaultError};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "lastvault",
    version,
    about = "Password vault client",
    long_about = "lastvault: list, search and edit accounts in an encrypted password vault"
)]
struct Cli {
    /// Path to lastvault.toml configuration file
    #[arg(long, short = 'c', env = "LASTVAULT_CONFIG", default_value = "lastvault.toml")]
    config: PathBuf,

    /// Account to log in as (overrides config account.username)
    #[arg(long, short = 'u', env = "LASTVAULT_USERNAME")]
    username: Option<String>,

    /// One-time second-factor code
    #[arg(long)]
    otp: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides config log.level
    #[arg(long, env = "LASTVAULT_LOG")]
    log: Option<String>,

    /// Log format; overrides config log.format
    #[arg(long, env = "LASTVAULT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every account
    Ls {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print one account
    Show {
        id: String,
        /// Include the password in text output
        #[arg(long)]
        reveal: bool,
        #[arg(long)]
        json: bool,
    },

    /// Find accounts matching a value
    Search {
        value: String,
        /// Field to match: id, name, url, username
        #[arg(long, short = 'f', default_value = "name")]
        field: Field,
        /// exact, exact-insensitive, substring, substring-insensitive, regex
        #[arg(long, short = 'm', default_value = "substring-insensitive")]
        method: SearchMethod,
        #[arg(long)]
        json: bool,
    },

    /// Create an account (prompts for its password unless --password is given)
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        url: String,
        #[arg(long = "login", default_value = "")]
        login: String,
        #[arg(long, env = "LASTVAULT_ENTRY_PASSWORD")]
        password: Option<String>,
        #[arg(long, default_value = "")]
        group: String,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Change fields of an existing account
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long = "login")]
        login: Option<String>,
        #[arg(long, env = "LASTVAULT_ENTRY_PASSWORD")]
        password: Option<String>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete an account
    Rm { id: String },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, found) = load_config(&cli.config)?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);
    if !found {
        tracing::warn!(
            "config file not found: {}  (using defaults)",
            cli.config.display()
        );
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    match cli.command {
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &cli.config),
        Commands::Ls { json } => {
            let vault = open_vault(&config, cli.username, cli.otp, &cancel).await?;
            cmd_ls(&vault, json, &cancel).await
        }
        Commands::Show { id, reveal, json } => {
            let vault = open_vault(&config, cli.username, cli.otp, &cancel).await?;
            cmd_show(&vault, &id, reveal, json, &cancel).await
        }
        Commands::Search { value, field, method, json } => {
            let vault = open_vault(&config, cli.username, cli.otp, &cancel).await?;
            cmd_search(&vault, &value, field, method, json, &cancel).await
        }
        Commands::Add { name, url, login, password, group, notes } => {
            let vault = open_vault(&config, cli.username, cli.otp, &cancel).await?;
            let password = match password {
                Some(p) => p,
                None => rpassword::prompt_password(format!("Password for {name}: "))
                    .context("reading entry password")?,
            };
            let account = Account {
                name,
                url,
                username: login,
                password,
                group,
                notes,
                ..Default::default()
            };
            cmd_add(&vault, account, &cancel).await
        }
        Commands::Edit { id, name, url, login, password, group, notes } => {
            let vault = open_vault(&config, cli.username, cli.otp, &cancel).await?;
            let changes = AccountChanges {
                name,
                url,
                username: login,
                password,
                group,
                notes,
            };
            cmd_edit(&vault, &id, changes, &cancel).await
        }
        Commands::Rm { id } => {
            let vault = open_vault(&config, cli.username, cli.otp, &cancel).await?;
            vault
                .delete(&id, &cancel)
                .await
                .with_context(|| format!("deleting account {id}"))?;
            println!("deleted {id}");
            Ok(())
        }
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Load the config file, or defaults if it does not exist. The flag reports
/// whether a file was read.
fn load_config(path: &Path) -> Result<(LastvaultConfig, bool)> {
    if path.exists() {
        let config = LastvaultConfig::load(path)
            .with_context(|| format!("loading config: {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((LastvaultConfig::default(), false))
    }
}

// ── Login ─────────────────────────────────────────────────────────────────────

fn master_password(username: &str) -> Result<SecretString> {
    if let Ok(password) = std::env::var("LASTVAULT_PASSWORD") {
        return Ok(SecretString::from(password));
    }
    let password = rpassword::prompt_password(format!("Master password for {username}: "))
        .context("reading master password")?;
    Ok(SecretString::from(password))
}

/// Log in, prompting once for a second-factor code if the service asks for one.
async fn open_vault(
    config: &LastvaultConfig,
    username: Option<String>,
    otp: Option<String>,
    cancel: &CancellationToken,
) -> Result<Vault<HttpTransport>> {
    let username = username
        .or_else(|| config.account.username.clone())
        .context("no username: pass --username or set account.username in the config")?;

    let mut request = LoginRequest::new(username.clone(), master_password(&username)?);
    if let Some(code) = otp {
        request = request.with_second_factor(code);
    }

    let transport = HttpTransport::new(&config.server).context("building HTTP transport")?;
    let opened = Vault::open(transport, &request, cancel).await;
    match opened {
        Ok(vault) => Ok(vault),
        Err(VaultError::SecondFactorRequired(message)) if request.second_factor.is_none() => {
            eprintln!("{message}");
            let code = rpassword::prompt_password("One-time code: ")
                .context("reading one-time code")?;
            let request = request.with_second_factor(code.trim());
            let transport =
                HttpTransport::new(&config.server).context("building HTTP transport")?;
            Vault::open(transport, &request, cancel)
                .await
                .with_context(|| format!("logging in as {username}"))
        }
        Err(e) => Err(e).with_context(|| format!("logging in as {username}")),
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serializing to JSON")?;
    println!("{rendered}");
    Ok(())
}

fn print_listing(accounts: &[Account]) {
    for account in accounts {
        let path = if account.group.is_empty() {
            account.name.clone()
        } else {
            format!("{}/{}", account.group, account.name)
        };
        println!("{:<20} {:<40} {}", account.id, path, account.username);
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn cmd_ls(
    vault: &Vault<HttpTransport>,
    json: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let accounts = vault.accounts(cancel).await.context("listing accounts")?;
    if json {
        print_json(&accounts)
    } else {
        print_listing(&accounts);
        Ok(())
    }
}

async fn cmd_show(
    vault: &Vault<HttpTransport>,
    id: &str,
    reveal: bool,
    json: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let account = vault
        .account(id, cancel)
        .await
        .with_context(|| format!("looking up account {id}"))?;
    if json {
        return print_json(&account);
    }

    println!("Id:       {}", account.id);
    println!("Name:     {}", account.name);
    println!("Group:    {}", account.group);
    println!("URL:      {}", account.url);
    println!("Username: {}", account.username);
    if reveal {
        println!("Password: {}", account.password);
    } else {
        println!("Password: ********");
    }
    if !account.notes.is_empty() {
        println!("Notes:\n{}", account.notes);
    }
    Ok(())
}

async fn cmd_search(
    vault: &Vault<HttpTransport>,
    value: &str,
    field: Field,
    method: SearchMethod,
    json: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let accounts = vault
        .search(value, field, method, cancel)
        .await
        .with_context(|| format!("searching for '{value}'"))?;
    if json {
        print_json(&accounts)
    } else {
        if accounts.is_empty() {
            eprintln!("no matching accounts");
        }
        print_listing(&accounts);
        Ok(())
    }
}

async fn cmd_add(
    vault: &Vault<HttpTransport>,
    account: Account,
    cancel: &CancellationToken,
) -> Result<()> {
    let created = vault
        .create(account, cancel)
        .await
        .context("creating account")?;
    println!("created {}", created.id);
    Ok(())
}

async fn cmd_edit(
    vault: &Vault<HttpTransport>,
    id: &str,
    changes: AccountChanges,
    cancel: &CancellationToken,
) -> Result<()> {
    let current = vault
        .account(id, cancel)
        .await
        .with_context(|| format!("looking up account {id}"))?;
    let updated = apply_changes(current, changes);
    vault
        .update(&updated, cancel)
        .await
        .with_context(|| format!("updating account {id}"))?;
    println!("updated {id}");
    Ok(())
}

/// Fields given on the `edit` command line. `None` keeps the stored value;
/// `Some("")` clears it.
#[derive(Debug, Default)]
struct AccountChanges {
    name: Option<String>,
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    group: Option<String>,
    notes: Option<String>,
}

fn apply_changes(current: Account, changes: AccountChanges) -> Account {
    Account {
        id: current.id,
        name: changes.name.unwrap_or(current.name),
        url: changes.url.unwrap_or(current.url),
        username: changes.username.unwrap_or(current.username),
        password: changes.password.unwrap_or(current.password),
        group: changes.group.unwrap_or(current.group),
        notes: changes.notes.unwrap_or(current.notes),
    }
}

fn cmd_config_show(config: &LastvaultConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
