use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use notesync_core::database::LocalStore;
use notesync_core::platform::get_default_config_path;
use notesync_core::sync::KintoClient;
use notesync_core::{
    Collection, ContentKey, Credentials, FileCredentials, KeyId, LifecycleMessage,
    MessagingSink, NativeMessagingSink, NoteController, PlainContent, SqliteStore, SyncConfig,
    SyncOrchestrator, SyncOutcome,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Encrypted single-note sync client
#[derive(Parser)]
#[command(name = "notesync")]
#[command(about = "End-to-end encrypted note sync", long_about = None)]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Remote server URL, overriding the config file
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Local database path, overriding the config file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Write lifecycle messages as native-messaging frames instead of JSON lines
    #[arg(long, global = true)]
    native: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync, then print the note
    Load,

    /// Replace the note with TEXT and sync
    Save {
        /// New note text
        text: String,
    },

    /// Run one sync pass
    Sync,

    /// Show the local note and sync metadata
    Status,

    /// Store an access token and a freshly generated content key
    Credentials {
        /// Bearer token for the remote server
        #[arg(long)]
        token: String,

        /// Key id to tag encrypted records with
        #[arg(long, default_value = "default")]
        kid: String,
    },
}

/// Prints each lifecycle message as one JSON line on stdout.
struct JsonLinesSink;

impl MessagingSink for JsonLinesSink {
    fn send(&self, recipient: &str, message: LifecycleMessage) {
        let line = serde_json::json!({ "recipient": recipient, "message": message });
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", line) {
            tracing::warn!(error = %e, "Failed to write lifecycle message");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries lifecycle messages
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let credentials = Arc::new(FileCredentials::new(&config.credentials_path));
    if let Commands::Credentials { token, kid } = &cli.command {
        credentials
            .store(&Credentials {
                key: ContentKey::generate(KeyId::new(kid.as_str())),
                access_token: token.clone(),
            })
            .await?;
        info!(path = %credentials.path().display(), "Credentials stored");
        return Ok(());
    }

    let store = Arc::new(
        SqliteStore::open(&config.database_path)
            .with_context(|| format!("opening {}", config.database_path.display()))?,
    );
    let remote = Arc::new(KintoClient::new(
        &config.remote_url,
        &config.bucket,
        &config.collection,
        config.request_timeout(),
    )?);
    let collection = Collection::new(config.collection.clone(), store, remote);
    let orchestrator = SyncOrchestrator::new(credentials);

    let sink: Arc<dyn MessagingSink> = if cli.native {
        Arc::new(NativeMessagingSink::new(std::io::stdout()))
    } else {
        Arc::new(JsonLinesSink)
    };
    let controller = NoteController::new(collection, orchestrator, sink, &config.recipient_id)
        .with_note_id(&config.note_id);

    match cli.command {
        Commands::Load => controller.load().await?,
        Commands::Save { text } => controller.save(PlainContent::text(text)).await?,
        Commands::Sync => match controller.sync().await {
            SyncOutcome::Synced(report) => println!("{}", serde_json::to_string(&report)?),
            SyncOutcome::UnauthorizedRecovered => {
                println!("Access token rejected; credentials cleared. Store new ones and retry.")
            }
            SyncOutcome::Failed(e) => return Err(e.into()),
        },
        Commands::Status => print_status(controller.collection(), &config.note_id).await?,
        Commands::Credentials { .. } => {}
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<SyncConfig> {
    let path = cli.config.clone().unwrap_or_else(get_default_config_path);
    let mut config = match &cli.config {
        // An explicit path must exist
        Some(path) => SyncConfig::load(path),
        None => SyncConfig::load_or_default(&path),
    }
    .with_context(|| format!("loading config {}", path.display()))?;

    if let Some(remote) = &cli.remote {
        config.remote_url = remote.clone();
    }
    if let Some(database) = &cli.database {
        config.database_path = database.clone();
    }
    Ok(config)
}

async fn print_status(collection: &Collection, note_id: &str) -> Result<()> {
    match collection.get_any(note_id).await? {
        Some(record) => {
            println!("Note:          {}", record.id);
            println!("State:         {}", record.status.as_str());
            match record.last_modified {
                Some(ts) => println!("Last modified: {}", ts),
                None => println!("Last modified: never synced"),
            }
            println!("Text:          {}", record.content.to_plain_text());
        }
        None => println!("No local note ({})", note_id),
    }

    let metadata = collection.store().sync_metadata().await?;
    match metadata.collection_timestamp {
        Some(ts) => println!("Collection at: {}", ts),
        None => println!("Collection at: never pulled"),
    }
    match metadata
        .last_sync_at
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    {
        Some(when) => println!("Last sync:     {}", when.to_rfc3339()),
        None => println!("Last sync:     never"),
    }
    Ok(())
}
