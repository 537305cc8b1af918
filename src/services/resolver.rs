use crate::error::Result;
use crate::models::{CatalogTrack, RawSong};
use crate::services::catalog::CatalogClient;
use crate::services::credentials::CredentialManager;
use std::sync::Arc;
use tracing::{debug, info};

const RELAXED_LIMIT: u32 = 10;

/// Maps a scraped title/artist pair to a catalog track.
pub struct TrackResolver {
    catalog: Arc<dyn CatalogClient>,
    credentials: Arc<CredentialManager>,
}

impl TrackResolver {
    pub fn new(catalog: Arc<dyn CatalogClient>, credentials: Arc<CredentialManager>) -> Self {
        Self { catalog, credentials }
    }

    /// Exact field search first, then a keyword search filtered by title and
    /// artist. Search failures count as "no match"; only a failure to obtain
    /// an access token is returned as an error.
    pub async fn resolve(&self, song: &RawSong) -> Result<Option<CatalogTrack>> {
        let token = self.credentials.access_token().await?;

        if let Some(track) = self.search_exact(&token, song).await {
            info!("Exact match for '{}': {} ({})", song, track.name, track.id);
            return Ok(Some(track));
        }

        let track = self.search_relaxed(&token, song).await;
        match &track {
            Some(track) => info!("Relaxed match for '{}': {} ({})", song, track.name, track.id),
            None => info!("No Spotify match for '{}'", song),
        }
        Ok(track)
    }

    async fn search_exact(&self, token: &str, song: &RawSong) -> Option<CatalogTrack> {
        match self.catalog.search_exact(token, &song.title, &song.artist).await {
            Ok(tracks) => tracks.into_iter().next(),
            Err(e) => {
                debug!("Exact search failed for '{}': {}", song, e);
                None
            }
        }
    }

    async fn search_relaxed(&self, token: &str, song: &RawSong) -> Option<CatalogTrack> {
        let query = format!("{} {}", song.title, song.artist);
        match self.catalog.search_keywords(token, &query, RELAXED_LIMIT).await {
            Ok(candidates) => pick_candidate(song, candidates),
            Err(e) => {
                debug!("Relaxed search failed for '{}': {}", song, e);
                None
            }
        }
    }
}

/// Chooses among keyword-search results, in catalog order.
///
/// The first exact-title candidate that passes the artist check wins. When
/// none passes, the first exact-title candidate is re-checked and, failing
/// that, nothing is returned; later exact-title candidates are not tried.
pub fn pick_candidate(song: &RawSong, candidates: Vec<CatalogTrack>) -> Option<CatalogTrack> {
    let title = song.title.to_lowercase();
    let title_matches = |t: &CatalogTrack| t.name.to_lowercase() == title;

    if let Some(idx) = candidates
        .iter()
        .position(|t| title_matches(t) && artist_matches(song, t))
    {
        return candidates.into_iter().nth(idx);
    }

    candidates
        .into_iter()
        .find(|t| title_matches(t))
        .filter(|t| artist_matches(song, t))
}

/// Any credited artist contains the first word of the scraped artist, or the
/// scraped artist contains a credited artist, ignoring case.
pub fn artist_matches(song: &RawSong, track: &CatalogTrack) -> bool {
    let scraped = song.artist.to_lowercase();
    let first_word = scraped.split(' ').next().unwrap_or_default();

    track.artists.iter().any(|artist| {
        let name = artist.name.to_lowercase();
        name.contains(first_word) || scraped.contains(&name)
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::catalog::PlaylistPage;
    use crate::services::credentials::tests::valid_manager;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Catalog double with canned search results and call counters.
    #[derive(Default)]
    pub(crate) struct FakeCatalog {
        pub exact: Mutex<Vec<CatalogTrack>>,
        pub keywords: Mutex<Vec<CatalogTrack>>,
        pub fail_searches: bool,
        pub exact_calls: AtomicUsize,
        pub keyword_calls: AtomicUsize,
        pub pages: Mutex<Vec<Result<PlaylistPage>>>,
        pub added: Mutex<Vec<String>>,
        pub fail_adds: bool,
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        async fn search_exact(&self, _token: &str, _title: &str, _artist: &str) -> Result<Vec<CatalogTrack>> {
            self.exact_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_searches {
                return Err(AppError::Spotify("search unavailable".to_string()));
            }
            Ok(self.exact.lock().unwrap().clone())
        }

        async fn search_keywords(&self, _token: &str, _text: &str, _limit: u32) -> Result<Vec<CatalogTrack>> {
            self.keyword_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_searches {
                return Err(AppError::Spotify("search unavailable".to_string()));
            }
            Ok(self.keywords.lock().unwrap().clone())
        }

        async fn list_playlist_tracks(
            &self,
            _token: &str,
            _playlist_id: &str,
            _offset: u32,
            _page_size: u32,
        ) -> Result<PlaylistPage> {
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() {
                return Ok(PlaylistPage::default());
            }
            pages.remove(0)
        }

        async fn add_track_to_playlist(&self, _token: &str, _playlist_id: &str, track_id: &str) -> Result<()> {
            if self.fail_adds {
                return Err(AppError::Spotify("insert rejected".to_string()));
            }
            self.added.lock().unwrap().push(track_id.to_string());
            Ok(())
        }
    }

    fn song(title: &str, artist: &str) -> RawSong {
        RawSong::new(title, artist)
    }

    #[test]
    fn artist_gate_accepts_containment_either_way() {
        let levels = song("Levels", "Avicii");
        assert!(artist_matches(&levels, &CatalogTrack::new("1", "Levels", &["Avicii, Skrillex"])));
        assert!(artist_matches(&levels, &CatalogTrack::new("1", "Levels", &["Skrillex", "Avicii"])));
        assert!(!artist_matches(&levels, &CatalogTrack::new("1", "Levels", &["Coldplay"])));

        let feat = song("Stay", "The Kid LAROI & Justin Bieber");
        assert!(artist_matches(&feat, &CatalogTrack::new("2", "Stay", &["Justin Bieber"])));
    }

    #[test]
    fn first_title_and_artist_match_wins() {
        let candidates = vec![
            CatalogTrack::new("a", "Levels - Radio Edit", &["Avicii"]),
            CatalogTrack::new("b", "LEVELS", &["Coldplay"]),
            CatalogTrack::new("c", "levels", &["Avicii"]),
            CatalogTrack::new("d", "Levels", &["Avicii"]),
        ];

        let picked = pick_candidate(&song("Levels", "Avicii"), candidates).unwrap();
        assert_eq!(picked.id, "c");
    }

    #[test]
    fn unrelated_artist_with_same_title_is_rejected() {
        let candidates = vec![CatalogTrack::new("b", "Levels", &["Coldplay"])];
        assert!(pick_candidate(&song("Levels", "Avicii"), candidates).is_none());
    }

    #[test]
    fn no_title_match_yields_nothing() {
        let candidates = vec![CatalogTrack::new("a", "Levels (Remix)", &["Avicii"])];
        assert!(pick_candidate(&song("Levels", "Avicii"), candidates).is_none());
    }

    #[tokio::test]
    async fn exact_hit_skips_relaxed_search() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(FakeCatalog::default());
        *catalog.exact.lock().unwrap() = vec![CatalogTrack::new("spotify:track:1", "Levels", &["Avicii"])];

        let resolver = TrackResolver::new(catalog.clone(), valid_manager(&dir).await);
        let track = resolver.resolve(&song("Levels", "Avicii")).await.unwrap().unwrap();

        assert_eq!(track.id, "spotify:track:1");
        assert_eq!(catalog.exact_calls.load(Ordering::SeqCst), 1);
        assert_eq!(catalog.keyword_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_exact_result_falls_back_to_relaxed() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(FakeCatalog::default());
        *catalog.keywords.lock().unwrap() = vec![
            CatalogTrack::new("x", "Levels", &["Coldplay"]),
            CatalogTrack::new("y", "Levels", &["Avicii"]),
        ];

        let resolver = TrackResolver::new(catalog.clone(), valid_manager(&dir).await);
        let track = resolver.resolve(&song("Levels", "Avicii")).await.unwrap().unwrap();

        assert_eq!(track.id, "y");
        assert_eq!(catalog.keyword_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn search_errors_mean_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(FakeCatalog {
            fail_searches: true,
            ..Default::default()
        });

        let resolver = TrackResolver::new(catalog.clone(), valid_manager(&dir).await);
        assert!(resolver.resolve(&song("Levels", "Avicii")).await.unwrap().is_none());
        assert_eq!(catalog.exact_calls.load(Ordering::SeqCst), 1);
        assert_eq!(catalog.keyword_calls.load(Ordering::SeqCst), 1);
    }
}
