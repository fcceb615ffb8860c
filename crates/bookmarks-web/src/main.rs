//! `bookmarks` server and administration binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `BOOKMARKS_*` environment variables, opens the SQLite store and either
//! serves HTTP or runs a one-off account command.
//!
//! ```text
//! bookmarks serve
//! echo 's3cret-pass' | bookmarks create-user admin --email admin@example.com --staff
//! bookmarks deactivate spammer
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, bail};
use bookmarks_core::{forms::RegistrationForm, store::UserStore};
use bookmarks_store_sqlite::SqliteStore;
use bookmarks_web::{AppState, ServerConfig, accounts};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Bookmarks social site")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve HTTP (the default).
  Serve,
  /// Create an account. The password is read from stdin.
  CreateUser {
    username: String,
    #[arg(long, default_value = "")]
    email:    String,
    /// Grant staff rights; staff are hidden from the member directory.
    #[arg(long)]
    staff:    bool,
  },
  /// Disable an account. Its history is kept.
  Deactivate { username: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("BOOKMARKS"))
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.database_path = expand_tilde(&server_cfg.database_path);
  server_cfg.media_dir = expand_tilde(&server_cfg.media_dir);

  let store = SqliteStore::open(&server_cfg.database_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.database_path))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, server_cfg).await,
    Command::CreateUser { username, email, staff } => {
      create_user(&store, username, email, staff).await
    }
    Command::Deactivate { username } => deactivate(&store, &username).await,
  }
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  tokio::fs::create_dir_all(&server_cfg.media_dir)
    .await
    .with_context(|| format!("failed to create {:?}", server_cfg.media_dir))?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState { store: Arc::new(store), config: Arc::new(server_cfg) };
  let app = bookmarks_web::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn create_user(
  store: &SqliteStore,
  username: String,
  email: String,
  staff: bool,
) -> anyhow::Result<()> {
  let password = read_password()?;
  let form = RegistrationForm {
    username,
    first_name: String::new(),
    email,
    password: password.clone(),
    password2: password,
  };

  match accounts::register_as(store, &form, staff).await? {
    Ok(account) => {
      println!("created {} (id {})", account.user.username, account.user.id);
      Ok(())
    }
    Err(errors) => bail!("invalid account: {errors}"),
  }
}

async fn deactivate(store: &SqliteStore, username: &str) -> anyhow::Result<()> {
  let Some(user) = store.get_user_by_username(username).await? else {
    bail!("no such user: {username}");
  };
  store.set_active(user.id, false).await?;
  tracing::info!(user_id = %user.id, username, "account deactivated");
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
