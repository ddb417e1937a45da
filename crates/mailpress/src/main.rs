//! `MailPress` - newsletter ingestion, summarization, and fan-out.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailpress_core::{
    ChannelRepository, FsContentStore, MailRepository, OpenAiOracle, Pipeline, SourceLanguage,
    SourceRepository, Summarizer, WebhookAlertSink, WebhookTransport,
};

use config::Config;

#[derive(Parser)]
#[command(name = "mailpress")]
#[command(about = "Newsletter ingestion and summary fan-out")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one raw message by its content key
    Ingest {
        /// Content key of the message blob in the mail directory
        key: String,
    },

    /// Ingest every blob in the mail directory, skipping duplicates
    IngestAll,

    /// Recompute the summary of an already ingested message
    Resummarize {
        /// Content key of the persisted record
        key: String,
    },

    /// List recently ingested records
    List {
        /// Maximum number of records
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },

    /// Register a newsletter source with its sending addresses
    RegisterSource {
        /// Canonical display name
        name: String,

        /// Publication language (ko or en)
        #[arg(short, long, default_value = "ko")]
        language: String,

        /// Known sending addresses
        #[arg(required = true)]
        addresses: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailpress=info,mailpress_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Ingest { key } => {
            let pipeline = build_pipeline(&config).await?;
            let receipt = pipeline.ingest(&key).await?;
            if receipt.duplicate {
                println!(
                    "already ingested: record {} (newsletter {})",
                    receipt.message_id, receipt.newsletter_id
                );
            } else {
                println!(
                    "ingested: record {} (newsletter {})",
                    receipt.message_id, receipt.newsletter_id
                );
            }
        }
        Commands::IngestAll => {
            let pipeline = build_pipeline(&config).await?;
            ingest_all(&pipeline).await?;
        }
        Commands::Resummarize { key } => {
            let pipeline = build_pipeline(&config).await?;
            pipeline.resummarize(&key).await?;
            println!("summary replaced for {key}");
        }
        Commands::List { limit } => {
            let mails = MailRepository::new(&config.database_path).await?;
            for record in mails.list_recent(limit).await? {
                println!(
                    "{}  {}  newsletter={}  {}",
                    record.received_at.format("%Y-%m-%d %H:%M"),
                    record.content_key,
                    record.newsletter_id,
                    record.subject.as_deref().unwrap_or("(제목 없음)"),
                );
            }
        }
        Commands::RegisterSource {
            name,
            language,
            addresses,
        } => {
            let sources = SourceRepository::new(&config.database_path).await?;
            let language = SourceLanguage::parse(&language);
            let id = sources.register(&name, language, &addresses).await?;
            println!("registered source {id}: {name} ({})", language.as_str());
        }
    }

    Ok(())
}

type ServicePipeline = Pipeline<
    FsContentStore,
    OpenAiOracle,
    WebhookTransport,
    WebhookAlertSink<WebhookTransport>,
>;

async fn build_pipeline(config: &Config) -> Result<ServicePipeline> {
    let Some(api_key) = config.openai_api_key.clone() else {
        bail!("no OpenAI API key: set OPENAI_API_KEY or add it to the config file");
    };

    let oracle = OpenAiOracle::new(api_key).with_model(config.model.clone());
    let sources = SourceRepository::new(&config.database_path)
        .await
        .context("opening source registry")?;
    let mails = MailRepository::new(&config.database_path)
        .await
        .context("opening record store")?;
    let channels = ChannelRepository::new(&config.database_path)
        .await
        .context("opening subscription index")?;

    Ok(Pipeline::new(
        FsContentStore::new(&config.mail_dir),
        Summarizer::new(oracle),
        WebhookTransport::new(),
        WebhookAlertSink::new(
            WebhookTransport::new(),
            config.log_webhook_url.clone(),
            config.unknown_sender_webhook_url.clone(),
        ),
        sources,
        mails,
        channels,
        config.read_link_base.clone(),
    ))
}

/// Walks every blob in the mail directory; duplicates and unresolved
/// senders are reported and skipped, other failures stop the walk.
async fn ingest_all(pipeline: &ServicePipeline) -> Result<()> {
    use mailpress_core::{ContentStore, Error};

    let keys = pipeline.content_store().list().await?;
    info!(total = keys.len(), "ingesting mail directory");

    let mut ingested = 0;
    let mut skipped = 0;
    for key in keys {
        match pipeline.ingest(&key).await {
            Ok(receipt) if receipt.duplicate => skipped += 1,
            Ok(_) => ingested += 1,
            Err(Error::UnknownSource { sender_email, .. }) => {
                println!("unresolved sender {sender_email} for {key}");
                skipped += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("ingesting {key}")),
        }
    }

    println!("ingested {ingested}, skipped {skipped}");
    Ok(())
}
