use crate::error::Result;
use crate::models::CatalogTrack;
use async_trait::async_trait;

/// One page of playlist contents.
#[derive(Debug, Clone, Default)]
pub struct PlaylistPage {
    pub items: Vec<CatalogTrack>,
    /// Offset of the following page, if there is one.
    pub next_offset: Option<u32>,
}

/// Streaming-service operations used by the resolver and the ledger.
///
/// The bearer token is supplied by the caller on every call; implementations
/// never fetch or refresh tokens themselves.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Field-constrained search on track and artist name.
    async fn search_exact(&self, token: &str, title: &str, artist: &str) -> Result<Vec<CatalogTrack>>;

    /// Free-text search.
    async fn search_keywords(&self, token: &str, text: &str, limit: u32) -> Result<Vec<CatalogTrack>>;

    async fn list_playlist_tracks(
        &self,
        token: &str,
        playlist_id: &str,
        offset: u32,
        page_size: u32,
    ) -> Result<PlaylistPage>;

    async fn add_track_to_playlist(&self, token: &str, playlist_id: &str, track_id: &str) -> Result<()>;
}
