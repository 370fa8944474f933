//! OAuth credentials for the Photos Library API
//!
//! Resolves a bearer token once at startup (cached token, refresh, or the
//! installed-app consent flow) and keeps it fresh for the rest of the run.

pub mod callback;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use config::crypto::TokenCipher;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::oauth::{AUTHORIZATION_ENDPOINT, PHOTOS_SCOPES, TOKEN_ENDPOINT, scope_param};

/// Refresh this many seconds before the server-side expiry
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Anything that can hand out a currently valid bearer token.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A fixed token, e.g. from `--access-token`. Never refreshed.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

// ============================================================================
// Client secrets
// ============================================================================

/// OAuth client from the JSON downloaded in the Google Cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    AUTHORIZATION_ENDPOINT.to_string()
}

fn default_token_uri() -> String {
    TOKEN_ENDPOINT.to_string()
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    #[serde(default)]
    installed: Option<ClientConfig>,
    #[serde(default)]
    web: Option<ClientConfig>,
}

impl ClientConfig {
    /// Load the client secrets file; a missing file yields the setup instructions as error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(setup_instructions(path));
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read client secrets {}", path.display()))?;
        let file: ClientSecretsFile =
            serde_json::from_str(&content).context("Invalid client secrets file")?;

        file.installed
            .or(file.web)
            .ok_or_else(|| anyhow!("Client secrets file has neither an 'installed' nor a 'web' section"))
    }
}

/// How to obtain OAuth client credentials
pub fn setup_instructions(path: &Path) -> String {
    format!(
        "Google Photos API credentials not found.\n\n\
         To set up credentials:\n\
         1. Go to https://console.cloud.google.com/\n\
         2. Create a new project or select an existing one\n\
         3. Enable the Photos Library API\n\
         4. Go to 'Credentials' > 'Create Credentials' > 'OAuth client ID'\n\
         5. Select 'Desktop application'\n\
         6. Download the JSON file\n\
         7. Save it as: {}",
        path.display()
    )
}

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds)
    pub expires_at: Option<i64>,
}

impl Token {
    pub fn is_fresh(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - EXPIRY_MARGIN_SECS > now,
            None => true,
        }
    }
}

/// On-disk token format; both secrets are sealed with [`TokenCipher`].
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    scopes: Vec<String>,
}

/// Encrypted token file
pub struct TokenCache {
    path: PathBuf,
    cipher: TokenCipher,
}

impl TokenCache {
    pub fn new(path: PathBuf) -> Self {
        Self::with_cipher(path, TokenCipher::for_this_machine())
    }

    pub fn with_cipher(path: PathBuf, cipher: TokenCipher) -> Self {
        Self { path, cipher }
    }

    /// Cached token, or None if absent, unreadable, or granted for other scopes
    pub fn load(&self) -> Option<Token> {
        let content = fs::read_to_string(&self.path).ok()?;

        let stored: StoredToken = match serde_json::from_str(&content) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Ignoring unreadable token cache {}: {}", self.path.display(), e);
                return None;
            }
        };

        if stored.scopes.iter().map(String::as_str).ne(PHOTOS_SCOPES.iter().copied()) {
            info!("Cached token was granted for different scopes, re-authorizing");
            return None;
        }

        let access_token = match self.cipher.open(&stored.access_token) {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not decrypt cached token: {}", e);
                return None;
            }
        };
        let refresh_token = stored
            .refresh_token
            .and_then(|sealed| self.cipher.open(&sealed).ok());

        Some(Token {
            access_token,
            refresh_token,
            expires_at: stored.expires_at,
        })
    }

    pub fn save(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let seal = |value: &str| self.cipher.seal(value).map_err(|e| anyhow!(e));
        let stored = StoredToken {
            access_token: seal(&token.access_token)?,
            refresh_token: token.refresh_token.as_deref().map(seal).transpose()?,
            expires_at: token.expires_at,
            scopes: PHOTOS_SCOPES.iter().map(|s| s.to_string()).collect(),
        };

        fs::write(&self.path, serde_json::to_string_pretty(&stored)?)
            .with_context(|| format!("Failed to write token cache {}", self.path.display()))?;
        debug!("Saved token cache to {}", self.path.display());
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    /// Google omits the refresh token on refresh; keep the one we have.
    fn into_token(self, previous_refresh_token: Option<String>) -> Token {
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh_token),
            expires_at: self.expires_in.map(|secs| Utc::now().timestamp() + secs),
        }
    }
}

async fn request_token<'a>(
    http_client: &Client,
    client: &'a ClientConfig,
    mut params: Vec<(&'a str, &'a str)>,
) -> Result<TokenResponse> {
    params.push(("client_id", client.client_id.as_str()));
    if let Some(secret) = &client.client_secret {
        params.push(("client_secret", secret.as_str()));
    }

    let resp = http_client
        .post(&client.token_uri)
        .form(&params)
        .send()
        .await
        .context("Token request failed")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let error_text = resp.text().await.unwrap_or_default();
        bail!("Token request failed ({}): {}", status, error_text);
    }

    resp.json()
        .await
        .context("Failed to parse token response")
}

async fn refresh_access_token(
    http_client: &Client,
    client: &ClientConfig,
    refresh_token: &str,
) -> Result<Token> {
    let response = request_token(
        http_client,
        client,
        vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ],
    )
    .await?;
    Ok(response.into_token(Some(refresh_token.to_string())))
}

async fn exchange_code(
    http_client: &Client,
    client: &ClientConfig,
    code: &str,
    redirect_uri: &str,
    code_verifier: &str,
) -> Result<Token> {
    let response = request_token(
        http_client,
        client,
        vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ],
    )
    .await?;
    Ok(response.into_token(None))
}

// ============================================================================
// Installed-app flow
// ============================================================================

fn random_url_safe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

/// PKCE S256 challenge for a verifier
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Consent screen URL for the installed-app flow
pub fn authorization_url(
    client: &ClientConfig,
    redirect_uri: &str,
    code_challenge: &str,
    state: &str,
) -> Result<Url> {
    let mut url = Url::parse(&client.auth_uri)
        .with_context(|| format!("Invalid auth_uri {}", client.auth_uri))?;
    url.query_pairs_mut()
        .append_pair("client_id", &client.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &scope_param())
        .append_pair("code_challenge", code_challenge)
        .append_pair("code_challenge_method", "S256")
        .append_pair("state", state)
        .append_pair("access_type", "offline") // Request refresh token
        .append_pair("prompt", "consent"); // Force consent to get refresh token
    Ok(url)
}

async fn authorize_interactively(http_client: &Client, client: &ClientConfig) -> Result<Token> {
    let server = callback::start_callback_server()
        .await
        .map_err(|e| anyhow!(e))?;
    let redirect_uri = server.redirect_uri();

    let verifier = random_url_safe(32);
    let state = random_url_safe(16);
    let url = authorization_url(client, &redirect_uri, &pkce_challenge(&verifier), &state)?;

    println!("Open this URL in your browser to authorize photos-upload:\n\n{}\n", url);
    info!("Waiting for OAuth redirect on {}", redirect_uri);

    let authorization = server.wait_for_callback().await.map_err(|e| anyhow!(e))?;
    if authorization.state != state {
        bail!("OAuth state mismatch, refusing authorization code");
    }

    exchange_code(http_client, client, &authorization.code, &redirect_uri, &verifier).await
}

// ============================================================================
// Authenticator
// ============================================================================

/// The authenticated credential holder shared by every Photos API call.
pub struct Authenticator {
    http_client: Client,
    client: ClientConfig,
    cache: TokenCache,
    token: Mutex<Token>,
}

impl Authenticator {
    /// Cached token if still valid, else refresh, else the consent flow.
    /// The resulting token is written back to the cache.
    pub async fn resolve(client: ClientConfig, cache: TokenCache) -> Result<Self> {
        let http_client = Client::new();
        let now = Utc::now().timestamp();

        let token = match cache.load() {
            Some(token) if token.is_fresh(now) => {
                debug!("Using cached access token");
                token
            }
            Some(Token {
                refresh_token: Some(refresh_token),
                ..
            }) => {
                info!("Refreshing expired access token");
                match refresh_access_token(&http_client, &client, &refresh_token).await {
                    Ok(token) => token,
                    Err(e) => {
                        warn!("Token refresh failed, starting a new authorization: {}", e);
                        authorize_interactively(&http_client, &client).await?
                    }
                }
            }
            _ => authorize_interactively(&http_client, &client).await?,
        };

        cache.save(&token)?;
        Ok(Self::with_token(http_client, client, cache, token))
    }

    /// Wrap an already obtained token
    pub fn with_token(http_client: Client, client: ClientConfig, cache: TokenCache, token: Token) -> Self {
        Self {
            http_client,
            client,
            cache,
            token: Mutex::new(token),
        }
    }
}

#[async_trait]
impl AccessTokenSource for Authenticator {
    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;

        if !token.is_fresh(Utc::now().timestamp()) {
            let refresh_token = token
                .refresh_token
                .clone()
                .ok_or_else(|| anyhow!("Access token expired and no refresh token is available"))?;
            debug!("Access token near expiry, refreshing");
            let refreshed = refresh_access_token(&self.http_client, &self.client, &refresh_token).await?;
            self.cache.save(&refreshed)?;
            *token = refreshed;
        }

        Ok(token.access_token.clone())
    }
}
