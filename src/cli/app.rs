use super::fixtures::Fixtures;
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use docintegrity::{
    Collection, EntityId, ErrorKind, Filter, IntegrityConfig, IntegrityLayer, memory_store,
    parse_filter,
};
use serde_json::{Value as JsonValue, json};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "docintegrity")]
#[command(about = "Inspect fixture data through the integrity layer")]
pub struct Cli {
    /// JSON file keyed by collection name.
    #[arg(long, short)]
    pub fixtures: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch one hydrated document.
    Get {
        collection: Collection,
        id: EntityId,
    },
    /// Run a paginated query.
    Query {
        collection: Collection,
        /// JSON filter, e.g. '{"slug": "alpha"}'.
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Report which of the given ids are missing.
    CheckIds {
        collection: Collection,
        #[arg(required = true)]
        ids: Vec<EntityId>,
    },
}

pub struct App {
    layer: IntegrityLayer,
}

impl App {
    pub async fn open(fixtures: &Path, config: IntegrityConfig) -> Result<Self> {
        let store = memory_store(&config);
        Fixtures::load(fixtures)?
            .seed(&store)
            .await
            .context("failed to seed fixtures")?;
        Ok(Self {
            layer: IntegrityLayer::new(store, config),
        })
    }

    pub async fn run(&self, command: Command) -> Result<JsonValue> {
        match command {
            Command::Get { collection, id } => {
                let document = self.layer.get_document(collection, id).await?;
                Ok(JsonValue::Object(document))
            }
            Command::Query {
                collection,
                filter,
                page,
                page_size,
            } => {
                let filter = match filter {
                    Some(raw) => {
                        let value: JsonValue =
                            serde_json::from_str(&raw).context("--filter is not valid JSON")?;
                        parse_filter("Filter", &value)?
                    }
                    None => Filter::new(),
                };
                let page = self
                    .layer
                    .query_documents(collection, &filter, page, page_size)
                    .await?;
                serde_json::to_value(page).context("failed to encode page")
            }
            Command::CheckIds { collection, ids } => {
                match self.layer.all_ids_exist(collection, &ids).await {
                    Ok(()) => Ok(json!({ "allExist": true, "missing": [] })),
                    Err(err) if err.kind() == ErrorKind::NotFound => {
                        Ok(json!({ "allExist": false, "missing": err.missing_ids() }))
                    }
                    Err(err) => Err(anyhow!(err)),
                }
            }
        }
    }
}
