use crate::models::{RawSong, StationProfile};
use crate::services::stations::SongSource;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Chooses between the primary and secondary fetch strategy of one station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchBreaker {
    consecutive_failures: u32,
    threshold: u32,
}

impl FetchBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive_failures: 0,
            threshold,
        }
    }

    pub fn use_primary(&self) -> bool {
        self.consecutive_failures < self.threshold
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

/// Last song seen on a station.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationState {
    pub last_seen_key: String,
}

/// Polls one station and reports when its current song changes.
pub struct SourceWatcher {
    profile: StationProfile,
    primary: Box<dyn SongSource>,
    secondary: Box<dyn SongSource>,
    breaker: FetchBreaker,
    state: StationState,
    fetch_timeout: Duration,
}

impl SourceWatcher {
    pub fn new(
        profile: StationProfile,
        primary: Box<dyn SongSource>,
        secondary: Box<dyn SongSource>,
        failure_threshold: u32,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            profile,
            primary,
            secondary,
            breaker: FetchBreaker::new(failure_threshold),
            state: StationState::default(),
            fetch_timeout,
        }
    }

    pub fn profile(&self) -> &StationProfile {
        &self.profile
    }

    pub fn breaker(&self) -> &FetchBreaker {
        &self.breaker
    }

    pub fn state(&self) -> &StationState {
        &self.state
    }

    /// Current song, or `None` when nothing could be read. Errors and
    /// timeouts are logged here and never leave the watcher.
    pub async fn fetch(&mut self) -> Option<RawSong> {
        if !self.breaker.use_primary() {
            return self.fetch_secondary().await;
        }

        match self.attempt(self.primary.as_ref(), "primary").await {
            Some(song) => {
                self.breaker.record_success();
                Some(song)
            }
            None => {
                self.breaker.record_failure();
                if !self.breaker.use_primary() {
                    warn!(
                        "{}: primary fetch failed {} times, using fallback until it recovers",
                        self.profile.name,
                        self.breaker.consecutive_failures()
                    );
                }
                self.fetch_secondary().await
            }
        }
    }

    async fn fetch_secondary(&self) -> Option<RawSong> {
        self.attempt(self.secondary.as_ref(), "fallback").await
    }

    async fn attempt(&self, source: &dyn SongSource, label: &str) -> Option<RawSong> {
        match tokio::time::timeout(self.fetch_timeout, source.fetch_song()).await {
            Ok(Ok(Some(song))) => Some(song),
            Ok(Ok(None)) => {
                debug!("{}: {} fetch found no song on the page", self.profile.name, label);
                None
            }
            Ok(Err(e)) => {
                debug!("{}: {} fetch failed: {}", self.profile.name, label, e);
                None
            }
            Err(_) => {
                debug!(
                    "{}: {} fetch timed out after {:?}",
                    self.profile.name, label, self.fetch_timeout
                );
                None
            }
        }
    }

    /// True when `song` differs from the last one seen. An absent song never
    /// counts as a change and leaves the state untouched.
    pub fn has_changed(&mut self, song: Option<&RawSong>) -> bool {
        let Some(song) = song else {
            return false;
        };

        let key = song.key();
        let changed = key != self.state.last_seen_key;
        if changed {
            info!("{}: now playing {}", self.profile.name, key);
        }
        self.state.last_seen_key = key;
        changed
    }
}
