use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use nextcloud_picbed::config::{CONFIG_KEY, UPLOADED_KEY};
use nextcloud_picbed::{
    register, ImageItem, JsonConfigHost, PluginHost, PluginOptions, UploadContext, UserConfig,
};

const DEFAULT_CONFIG_FILE: &str = "data.json";

#[derive(Parser)]
#[command(name = "nextcloud-picbed", version, about = "Upload images to NextCloud and get public links")]
struct Cli {
    /// PicGo style config file (defaults to $NEXTCLOUD_PICBED_CONFIG or ./data.json)
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload files and print their public URLs
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Delete previously uploaded files from NextCloud
    Remove {
        #[arg(required = true)]
        file_names: Vec<String>,
    },
    /// Print the settings form as JSON
    Schema,
    /// Store the NextCloud settings
    Config {
        #[arg(long)]
        host: String,
        #[arg(long)]
        cdn: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(|| {
        std::env::var("NEXTCLOUD_PICBED_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
    });

    let host = Arc::new(JsonConfigHost::open(&config_path).await?);
    let plugin = register(Arc::clone(&host), PluginOptions::from_env());

    match cli.command {
        Command::Upload { files } => {
            let mut items = Vec::with_capacity(files.len());
            for file in &files {
                items.push(read_image(file, plugin.uploader_id()).await?);
            }

            let mut ctx = UploadContext::new(items);
            let report = plugin.handle(&mut ctx).await?;

            let shared: Vec<ImageItem> = ctx
                .output
                .into_iter()
                .filter(|item| item.img_url.is_some())
                .collect();
            for item in &shared {
                println!("{}", item.img_url.as_deref().unwrap_or_default());
            }
            append_uploaded(host.as_ref(), &shared).await?;

            if let Some(e) = report.error {
                return Err(anyhow!(e).context("Upload batch stopped early"));
            }
        }
        Command::Remove { file_names } => {
            let items = take_uploaded(host.as_ref(), &file_names, plugin.uploader_id()).await?;
            let report = plugin.on_remove(&items).await?;

            for item in &report.removed {
                println!("deleted {}", item.file_name);
            }
            if !report.failed.is_empty() {
                warn!(
                    "{} file(s) could not be deleted and were kept in the uploaded list",
                    report.failed.len()
                );
            }
        }
        Command::Schema => {
            let registration = plugin.registration().await;
            println!("{}", serde_json::to_string_pretty(&registration)?);
        }
        Command::Config {
            host: server,
            cdn,
            user,
            password,
            path,
        } => {
            let settings = UserConfig {
                host: server.trim_end_matches('/').to_string(),
                cdn: cdn.trim_end_matches('/').to_string(),
                user,
                password,
                path,
            };

            let mut values = Map::new();
            values.insert(CONFIG_KEY.to_string(), serde_json::to_value(&settings)?);
            host.save_config(values).await?;
            info!("Saved NextCloud settings to {}", host.path().display());
        }
    }

    Ok(())
}

async fn read_image(path: &Path, uploader_id: &str) -> Result<ImageItem> {
    let buffer = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Invalid file name: {}", path.display()))?;
    let extname = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    Ok(ImageItem::new(file_name, extname)
        .with_buffer(buffer)
        .with_type(uploader_id))
}

async fn uploaded_list(host: &JsonConfigHost) -> Vec<Value> {
    match host.get_config(UPLOADED_KEY).await {
        Some(Value::Array(entries)) => entries,
        _ => Vec::new(),
    }
}

async fn save_uploaded(host: &JsonConfigHost, entries: Vec<Value>) -> Result<()> {
    let mut values = Map::new();
    values.insert(UPLOADED_KEY.to_string(), Value::Array(entries));
    host.save_config(values).await
}

async fn append_uploaded(host: &JsonConfigHost, items: &[ImageItem]) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }

    let mut entries = uploaded_list(host).await;
    for item in items {
        entries.push(serde_json::to_value(item)?);
    }
    save_uploaded(host, entries).await
}

/// Pulls the named items out of the uploaded list, the way a host drops
/// them from its library before firing the removal event. Names that are
/// not in the list are still deleted remotely.
async fn take_uploaded(
    host: &JsonConfigHost,
    file_names: &[String],
    uploader_id: &str,
) -> Result<Vec<ImageItem>> {
    let mut kept = Vec::new();
    let mut taken: Vec<ImageItem> = Vec::new();

    for entry in uploaded_list(host).await {
        let item: Option<ImageItem> = serde_json::from_value(entry.clone()).ok();
        match item {
            Some(item)
                if item.belongs_to(uploader_id) && file_names.contains(&item.file_name) =>
            {
                taken.push(item)
            }
            _ => kept.push(entry),
        }
    }

    for name in file_names {
        if !taken.iter().any(|item| &item.file_name == name) {
            taken.push(ImageItem::new(name.as_str(), "").with_type(uploader_id));
        }
    }

    save_uploaded(host, kept).await?;
    Ok(taken)
}
