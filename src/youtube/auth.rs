use reqwest::Client;
use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result, Service};

pub const YOUTUBE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const LOOPBACK_REDIRECT_URI: &str = "http://localhost";

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// OAuth client as found in a Google Cloud `client_secret*.json` download.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

#[derive(Debug, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl ClientSecret {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            AppError::Auth(format!(
                "Failed to read client secret file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_str(json)
            .map_err(|e| AppError::Auth(format!("Invalid client secret file: {}", e)))?;

        file.installed.or(file.web).ok_or_else(|| {
            AppError::Auth(
                "Client secret file has neither an 'installed' nor a 'web' section".into(),
            )
        })
    }

    /// Redirect URI to register the consent flow with. An explicit override wins over the file.
    pub fn redirect_uri(&self, redirect_override: Option<&str>) -> String {
        redirect_override
            .map(str::to_string)
            .or_else(|| self.redirect_uris.first().cloned())
            .unwrap_or_else(|| LOOPBACK_REDIRECT_URI.to_string())
    }

    pub fn authorize_url(&self, redirect_uri: &str) -> Result<Url> {
        let mut url = Url::parse(&self.auth_uri)
            .map_err(|e| AppError::Auth(format!("Invalid auth_uri: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", YOUTUBE_READONLY_SCOPE)
            .append_pair("access_type", "online");

        Ok(url)
    }
}

/// Pulls the authorization code out of what the user pasted: either the full
/// redirected URL or the bare code.
pub fn extract_authorization_code(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    match Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .filter(|code| !code.is_empty()),
        Err(_) if !input.contains(char::is_whitespace) => Some(input.to_string()),
        Err(_) => None,
    }
}

pub async fn exchange_code(
    http_client: &Client,
    secret: &ClientSecret,
    code: &str,
    redirect_uri: &str,
) -> Result<AccessToken> {
    let response = http_client
        .post(&secret.token_uri)
        .form(&[
            ("code", code),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| AppError::Auth(format!("Token request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(AppError::Auth(format!(
            "Token request failed ({}): {}",
            status, error_text
        )));
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| AppError::malformed(Service::GoogleOAuth, e))
}

/// Runs the interactive consent flow and returns a session-scoped access token.
pub async fn authenticate_source(http_client: &Client, config: &Config) -> Result<AccessToken> {
    let secret = ClientSecret::from_file(&config.youtube_client_secret_file)?;
    let redirect_uri = secret.redirect_uri(config.youtube_redirect_uri.as_deref());
    let auth_url = secret.authorize_url(&redirect_uri)?;

    println!("\nOpen this URL in your browser to authorize YouTube:");
    println!("{}\n", auth_url);

    print!("Enter the URL you were redirected to: ");
    io::stdout().flush()?;

    let mut redirect_url = String::new();
    io::stdin().read_line(&mut redirect_url)?;

    let code = extract_authorization_code(&redirect_url)
        .ok_or_else(|| AppError::Auth("Failed to parse authorization code".into()))?;

    debug!("Exchanging authorization code at {}", secret.token_uri);
    let token = exchange_code(http_client, &secret, &code, &redirect_uri).await?;

    info!("Successfully authenticated with YouTube");

    Ok(token)
}
