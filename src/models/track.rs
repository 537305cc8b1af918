use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackArtist {
    pub name: String,
}

/// A track from the streaming catalog. `id` is the track URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<TrackArtist>,
}

impl CatalogTrack {
    pub fn new(id: impl Into<String>, name: impl Into<String>, artists: &[&str]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            artists: artists
                .iter()
                .map(|name| TrackArtist {
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
