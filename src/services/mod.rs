pub mod catalog;
pub mod credentials;
pub mod ledger;
pub mod orchestrator;
pub mod resolver;
pub mod spotify;
pub mod stations;
pub mod watcher;

pub use credentials::{AuthorizationOptions, CredentialManager, CredentialStore};
pub use ledger::PlaylistLedger;
pub use orchestrator::Orchestrator;
pub use resolver::TrackResolver;
pub use spotify::SpotifyClient;
pub use stations::{BrowserSource, MarkupSource};
pub use watcher::SourceWatcher;
