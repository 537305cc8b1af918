use serde::{Deserialize, Serialize};
use std::fmt;

/// Title and artist as scraped from a station page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSong {
    pub title: String,
    pub artist: String,
}

impl RawSong {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }

    /// Key used for change detection. Case is preserved.
    pub fn key(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

impl fmt::Display for RawSong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)
    }
}
