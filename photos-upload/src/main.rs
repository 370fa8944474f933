//! photos-upload: upload images with their EXIF captions into a Google Photos album

use anyhow::{Context, bail};
use clap::Parser;
use config::{PathManager, Settings};
use photos_upload::auth::{AccessTokenSource, Authenticator, ClientConfig, StaticToken, TokenCache};
use photos_upload::batch::{AlbumTarget, BatchUploader};
use photos_upload::discovery::collect_images;
use photos_upload::photos_api::{PHOTOS_API_BASE, PhotosClient, UPLOAD_URL};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image files or directories (directories are not searched recursively)
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Create a new album with this name
    #[arg(short, long)]
    album: Option<String>,

    /// Add to an existing album by ID
    #[arg(long)]
    album_id: Option<String>,

    /// OAuth client secrets JSON from the Google Cloud console
    #[arg(long, env = "PHOTOS_UPLOAD_CLIENT_SECRETS")]
    client_secrets: Option<PathBuf>,

    /// Where the (encrypted) OAuth token is cached
    #[arg(long, env = "PHOTOS_UPLOAD_TOKEN_PATH")]
    token_path: Option<PathBuf>,

    /// Use this bearer token instead of the OAuth flow
    #[arg(long, env = "PHOTOS_UPLOAD_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Photos Library API base URL
    #[arg(long, env = "PHOTOS_UPLOAD_API_BASE")]
    api_base: Option<String>,

    /// Configuration directory (defaults to the per-user config dir)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Log level, used when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

async fn token_source(args: &Args, settings: &Settings) -> anyhow::Result<Arc<dyn AccessTokenSource>> {
    if let Some(token) = &args.access_token {
        debug!("Using access token from the command line");
        return Ok(Arc::new(StaticToken::new(token.clone())));
    }

    PathManager::ensure_dirs_exist().context("Failed to create config directory")?;

    let secrets_path = args
        .client_secrets
        .clone()
        .or_else(|| settings.resolved_client_secrets_path())
        .context("Could not determine the config directory; pass --client-secrets")?;
    let token_path = args
        .token_path
        .clone()
        .or_else(|| settings.resolved_token_path())
        .context("Could not determine the config directory; pass --token-path")?;

    let client = ClientConfig::load(&secrets_path)?;
    let authenticator = Authenticator::resolve(client, TokenCache::new(token_path)).await?;
    Ok(Arc::new(authenticator))
}

fn endpoints(args: &Args, settings: &Settings) -> (String, String) {
    let api_base = args.api_base.clone().or_else(|| settings.api_base_url.clone());
    let upload_url = settings.upload_url.clone().unwrap_or_else(|| match &api_base {
        Some(base) => format!("{}/uploads", base.trim_end_matches('/')),
        None => UPLOAD_URL.to_string(),
    });
    (api_base.unwrap_or_else(|| PHOTOS_API_BASE.to_string()), upload_url)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_env_file();
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(dir) = &args.config_dir {
        PathManager::set_config_dir(dir.clone());
    }
    let settings = Settings::load();

    // Reject bad album options before any credential or network work
    AlbumTarget::from_options(args.album.as_deref(), args.album_id.as_deref())?;

    let images = collect_images(&args.paths);
    if images.is_empty() {
        println!("No images to upload.");
        bail!("No images found in the given paths");
    }
    println!("Found {} image(s) to upload", images.len());

    let tokens = token_source(&args, &settings).await?;
    let (api_base, upload_url) = endpoints(&args, &settings);
    debug!("API base {}, upload URL {}", api_base, upload_url);
    let client = PhotosClient::with_endpoints(tokens, api_base, upload_url);

    let summary = BatchUploader::new(&client)
        .run(&images, args.album.as_deref(), args.album_id.as_deref())
        .await?;

    println!();
    println!("{}", summary);
    Ok(())
}
