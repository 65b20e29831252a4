mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{ChatClient, ClientEvent, HttpGateway, Store};
use serde::Serialize;
use serde_json::json;
use shared::domain::Metadata;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::load_settings;

#[derive(Parser, Debug)]
#[command(about = "Command-line client for the RAG chat service")]
struct Args {
    /// TOML settings file; defaults to ./chat_cli.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    api_prefix: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Health check plus vector store status.
    Status,
    /// Service name, models and retrieval configuration.
    Info,
    /// Ask a question, optionally continuing a conversation.
    Chat {
        message: String,
        #[arg(long)]
        conversation: Option<String>,
    },
    Conversations,
    Show {
        conversation_id: String,
    },
    Forget {
        conversation_id: String,
    },
    ForgetAll,
    Docs,
    Doc {
        doc_id: String,
    },
    /// Index raw text, given inline or read from --file.
    AddText {
        content: Option<String>,
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        #[arg(long)]
        title: Option<String>,
        /// JSON object stored alongside the document.
        #[arg(long)]
        metadata: Option<String>,
    },
    AddWeb {
        url: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        metadata: Option<String>,
    },
    Rm {
        doc_id: String,
    },
    /// Chat and document statistics.
    Stats,
    ClearStore,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    if let Some(api_prefix) = args.api_prefix {
        settings.api_prefix = api_prefix;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        settings.request_timeout_secs = timeout_secs;
    }

    let gateway = HttpGateway::new(&settings.gateway_config())?;
    info!(api_root = %gateway.api_root(), "using RAG service");
    let client = ChatClient::new(Store::new(), Arc::new(gateway));
    let mut events = client.subscribe_events();

    let outcome = run(&client, args.command).await;
    report_events(&mut events);
    let output = outcome?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(client: &ChatClient, command: Command) -> Result<serde_json::Value> {
    let output = match command {
        Command::Status => {
            let connected = client.check_connection().await;
            if !connected {
                bail!("RAG service is unreachable");
            }
            client
                .fetch_vector_store_status()
                .await
                .context("fetching vector store status")?;
            json!({
                "connected": connected,
                "vector_store": client.snapshot().documents.vector_store_status,
            })
        }
        Command::Info => {
            client.fetch_api_info().await.context("fetching api info")?;
            to_json(&client.snapshot().app)?
        }
        Command::Chat {
            message,
            conversation,
        } => {
            if let Some(conversation_id) = conversation {
                client
                    .load_conversation(&conversation_id)
                    .await
                    .with_context(|| format!("loading conversation {conversation_id}"))?;
            }
            let response = client
                .send_message(&message)
                .await
                .context("sending message")?;
            json!({
                "reply": response,
                "chat": client.snapshot().chat,
            })
        }
        Command::Conversations => {
            client
                .fetch_conversations()
                .await
                .context("listing conversations")?;
            to_json(&client.snapshot().chat.conversations)?
        }
        Command::Show { conversation_id } => {
            client
                .load_conversation(&conversation_id)
                .await
                .with_context(|| format!("loading conversation {conversation_id}"))?;
            to_json(&client.snapshot().chat)?
        }
        Command::Forget { conversation_id } => {
            client
                .delete_conversation(&conversation_id)
                .await
                .with_context(|| format!("deleting conversation {conversation_id}"))?;
            to_json(&client.snapshot().chat.conversations)?
        }
        Command::ForgetAll => {
            client
                .clear_all_conversations()
                .await
                .context("clearing conversations")?;
            to_json(&client.snapshot().chat)?
        }
        Command::Docs => {
            client.fetch_documents().await.context("listing documents")?;
            to_json(&client.snapshot().documents)?
        }
        Command::Doc { doc_id } => {
            client
                .refresh_document(&doc_id)
                .await
                .with_context(|| format!("fetching document {doc_id}"))?;
            let state = client.snapshot();
            to_json(&state.documents.documents.iter().find(|d| d.doc_id == doc_id))?
        }
        Command::AddText {
            content,
            file,
            title,
            metadata,
        } => {
            let content = match (content, file) {
                (Some(content), _) => content,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => bail!("add-text needs CONTENT or --file"),
            };
            let created = client
                .add_text_document(&content, title, parse_metadata(metadata)?)
                .await
                .context("adding text document")?;
            json!({
                "created": created,
                "documents": client.snapshot().documents,
            })
        }
        Command::AddWeb {
            url,
            title,
            metadata,
        } => {
            let created = client
                .add_web_document(&url, title, parse_metadata(metadata)?)
                .await
                .with_context(|| format!("adding web document {url}"))?;
            json!({
                "created": created,
                "documents": client.snapshot().documents,
            })
        }
        Command::Rm { doc_id } => {
            client
                .delete_document(&doc_id)
                .await
                .with_context(|| format!("deleting document {doc_id}"))?;
            to_json(&client.snapshot().documents)?
        }
        Command::Stats => {
            let chat = client.fetch_chat_stats().await.context("fetching chat stats")?;
            client
                .fetch_document_stats()
                .await
                .context("fetching document stats")?;
            json!({
                "chat": chat,
                "documents": client.snapshot().documents.stats,
            })
        }
        Command::ClearStore => {
            client
                .clear_vector_store()
                .await
                .context("clearing vector store")?;
            to_json(&client.snapshot().documents)?
        }
    };
    Ok(output)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

fn parse_metadata(raw: Option<String>) -> Result<Option<Metadata>> {
    raw.map(|raw| {
        serde_json::from_str::<Metadata>(&raw).context("--metadata must be a JSON object")
    })
    .transpose()
}

fn report_events(events: &mut broadcast::Receiver<ClientEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            ClientEvent::OperationSucceeded {
                operation,
                notice: Some(notice),
                ..
            } => info!(operation, "{notice}"),
            ClientEvent::OperationSucceeded { .. } => {}
            ClientEvent::OperationFailed {
                section,
                operation,
                error,
            } => warn!(section = section.as_str(), operation, %error, "operation failed"),
            ClientEvent::ConnectionChanged { connected } => {
                info!(connected, "connection status changed")
            }
        }
    }
}
