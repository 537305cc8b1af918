pub mod credentials;
pub mod song;
pub mod station;
pub mod track;

pub use credentials::{Credentials, TokenGrant};
pub use song::RawSong;
pub use station::{ArtistLocator, StationProfile};
pub use track::{CatalogTrack, TrackArtist};
