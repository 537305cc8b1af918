use crate::error::Result;
use crate::models::CatalogTrack;
use crate::services::catalog::CatalogClient;
use crate::services::credentials::CredentialManager;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const PAGE_SIZE: u32 = 100;

/// Local view of which tracks the target playlist already contains.
///
/// Ids are only ever added; tracks removed from the playlist elsewhere stay
/// known until the next full load.
pub struct PlaylistLedger {
    catalog: Arc<dyn CatalogClient>,
    credentials: Arc<CredentialManager>,
    playlist_id: String,
    track_ids: RwLock<HashSet<String>>,
}

impl PlaylistLedger {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        credentials: Arc<CredentialManager>,
        playlist_id: String,
    ) -> Self {
        Self {
            catalog,
            credentials,
            playlist_id,
            track_ids: RwLock::new(HashSet::new()),
        }
    }

    /// Pages through the whole playlist. A failing page ends the sweep
    /// quietly with whatever was collected so far.
    pub async fn load(&self) -> usize {
        let mut offset = 0;

        loop {
            let page = match self.credentials.access_token().await {
                Ok(token) => {
                    self.catalog
                        .list_playlist_tracks(&token, &self.playlist_id, offset, PAGE_SIZE)
                        .await
                }
                Err(e) => Err(e),
            };

            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    warn!("Stopped loading playlist at offset {}: {}", offset, e);
                    break;
                }
            };

            let mut ids = self.track_ids.write().await;
            ids.extend(page.items.into_iter().map(|t| t.id));
            drop(ids);

            match page.next_offset {
                Some(next) => offset = next,
                None => break,
            }
        }

        let count = self.len().await;
        info!("Loaded {} tracks from playlist {}", count, self.playlist_id);
        count
    }

    pub async fn contains(&self, track_id: &str) -> bool {
        self.track_ids.read().await.contains(track_id)
    }

    pub async fn len(&self) -> usize {
        self.track_ids.read().await.len()
    }

    /// Inserts the track remotely unless it is already known. Returns `true`
    /// only when an insert happened. Remote failures are logged and reported
    /// as `false`; a failure to obtain a token is returned as an error.
    pub async fn add_if_absent(&self, track: &CatalogTrack) -> Result<bool> {
        if self.contains(&track.id).await {
            debug!("'{}' is already in the playlist", track.name);
            return Ok(false);
        }

        let token = self.credentials.access_token().await?;

        match self
            .catalog
            .add_track_to_playlist(&token, &self.playlist_id, &track.id)
            .await
        {
            Ok(()) => {
                self.track_ids.write().await.insert(track.id.clone());
                info!("Added '{}' by {} to playlist", track.name, track.artist_names());
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to add '{}' to playlist: {}", track.name, e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::catalog::PlaylistPage;
    use crate::services::credentials::tests::valid_manager;
    use crate::services::resolver::tests::FakeCatalog;

    fn page(ids: &[&str], next_offset: Option<u32>) -> Result<PlaylistPage> {
        Ok(PlaylistPage {
            items: ids.iter().map(|id| CatalogTrack::new(*id, "Song", &["Artist"])).collect(),
            next_offset,
        })
    }

    #[tokio::test]
    async fn second_add_of_same_track_is_rejected_locally() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(FakeCatalog::default());
        let ledger = PlaylistLedger::new(catalog.clone(), valid_manager(&dir).await, "p".to_string());
        let track = CatalogTrack::new("spotify:track:1", "Blinding Lights", &["The Weeknd"]);

        assert!(ledger.add_if_absent(&track).await.unwrap());
        assert!(!ledger.add_if_absent(&track).await.unwrap());
        assert_eq!(*catalog.added.lock().unwrap(), vec!["spotify:track:1".to_string()]);
    }

    #[tokio::test]
    async fn remote_failure_returns_false_and_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(FakeCatalog {
            fail_adds: true,
            ..Default::default()
        });
        let ledger = PlaylistLedger::new(catalog, valid_manager(&dir).await, "p".to_string());
        let track = CatalogTrack::new("spotify:track:1", "Levels", &["Avicii"]);

        assert!(!ledger.add_if_absent(&track).await.unwrap());
        assert!(!ledger.contains(&track.id).await);
    }

    #[tokio::test]
    async fn load_follows_pages_until_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(FakeCatalog::default());
        *catalog.pages.lock().unwrap() = vec![
            page(&["a", "b"], Some(100)),
            page(&["c"], Some(200)),
            page(&["d"], None),
        ];
        let ledger = PlaylistLedger::new(catalog.clone(), valid_manager(&dir).await, "p".to_string());

        assert_eq!(ledger.load().await, 4);
        assert!(ledger.contains("d").await);

        // Known tracks are never inserted again.
        let known = CatalogTrack::new("b", "Song", &["Artist"]);
        assert!(!ledger.add_if_absent(&known).await.unwrap());
        assert!(catalog.added.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_page_stops_load_silently() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(FakeCatalog::default());
        *catalog.pages.lock().unwrap() = vec![
            page(&["a"], Some(100)),
            Err(AppError::Spotify("boom".to_string())),
            page(&["never"], None),
        ];
        let ledger = PlaylistLedger::new(catalog, valid_manager(&dir).await, "p".to_string());

        assert_eq!(ledger.load().await, 1);
        assert!(!ledger.contains("never").await);
    }
}
