use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{CatalogTrack, TokenGrant, TrackArtist};
use crate::services::catalog::{CatalogClient, PlaylistPage};
use crate::services::credentials::TokenEndpoint;
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::json;

const API_BASE: &str = "https://api.spotify.com/v1";
const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

pub const SCOPES: [&str; 3] = [
    "playlist-read-private",
    "playlist-modify-private",
    "playlist-modify-public",
];

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<Paging<SpotifyTrack>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Paging<T> {
    #[serde(default)]
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    uri: String,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: u64,
}

impl From<SpotifyTrack> for CatalogTrack {
    fn from(track: SpotifyTrack) -> Self {
        CatalogTrack {
            id: track.uri,
            name: track.name,
            artists: track
                .artists
                .into_iter()
                .map(|a| TrackArtist { name: a.name })
                .collect(),
        }
    }
}

impl From<TokenResponse> for TokenGrant {
    fn from(body: TokenResponse) -> Self {
        TokenGrant {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_in: body.expires_in,
        }
    }
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            client: Client::new(),
        }
    }

    async fn search(&self, token: &str, query: &str, limit: u32) -> Result<Vec<CatalogTrack>> {
        let url = format!("{}/search", API_BASE);
        let limit = limit.to_string();
        tracing::debug!("Searching Spotify with query: {}", query);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .send()
            .await?;

        let body: SearchResponse = ensure_success(response).await?.json().await?;

        Ok(body
            .tracks
            .map(|page| page.items.into_iter().map(CatalogTrack::from).collect())
            .unwrap_or_default())
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenGrant> {
        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Authentication(format!(
                "Token endpoint returned status: {} - {}",
                status, body
            )));
        }

        let body: TokenResponse = response.json().await?;
        Ok(body.into())
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!("Spotify API error: {} - {}", status, body);
    Err(AppError::Spotify(format!(
        "API returned status: {} - {}",
        status,
        body.chars().take(200).collect::<String>()
    )))
}

#[async_trait]
impl CatalogClient for SpotifyClient {
    async fn search_exact(&self, token: &str, title: &str, artist: &str) -> Result<Vec<CatalogTrack>> {
        let query = format!("track:\"{}\" artist:\"{}\"", title, artist);
        self.search(token, &query, 1).await
    }

    async fn search_keywords(&self, token: &str, text: &str, limit: u32) -> Result<Vec<CatalogTrack>> {
        self.search(token, text, limit).await
    }

    async fn list_playlist_tracks(
        &self,
        token: &str,
        playlist_id: &str,
        offset: u32,
        page_size: u32,
    ) -> Result<PlaylistPage> {
        let url = format!("{}/playlists/{}/tracks", API_BASE, playlist_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("offset", offset), ("limit", page_size)])
            .send()
            .await?;

        let body: Paging<PlaylistItem> = ensure_success(response).await?.json().await?;

        Ok(PlaylistPage {
            next_offset: body.next.map(|_| offset + page_size),
            items: body
                .items
                .into_iter()
                .filter_map(|item| item.track)
                .map(CatalogTrack::from)
                .collect(),
        })
    }

    async fn add_track_to_playlist(&self, token: &str, playlist_id: &str, track_id: &str) -> Result<()> {
        let url = format!("{}/playlists/{}/tracks", API_BASE, playlist_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "uris": [track_id] }))
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenEndpoint for SpotifyClient {
    fn authorize_url(&self, state: &str) -> Result<String> {
        let scope = SCOPES.join(" ");
        let url = Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Config(format!("Invalid authorization URL: {}", e)))?;

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }
}
