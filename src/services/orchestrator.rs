use crate::error::Result;
use crate::services::ledger::PlaylistLedger;
use crate::services::resolver::TrackResolver;
use crate::services::watcher::SourceWatcher;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// What one station check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationOutcome {
    /// The previous check of this station had not finished.
    Busy,
    Unchanged,
    Unmatched,
    AlreadyPresent,
    Added,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub checked: usize,
    pub changed: usize,
    pub added: usize,
    pub failed: usize,
}

struct WatchedStation {
    name: &'static str,
    watcher: Arc<Mutex<SourceWatcher>>,
}

/// Drives all station watchers on a fixed interval.
#[derive(Clone)]
pub struct Orchestrator {
    stations: Arc<Vec<WatchedStation>>,
    resolver: Arc<TrackResolver>,
    ledger: Arc<PlaylistLedger>,
    interval: Duration,
}

impl Orchestrator {
    pub fn new(
        watchers: Vec<SourceWatcher>,
        resolver: Arc<TrackResolver>,
        ledger: Arc<PlaylistLedger>,
        interval: Duration,
    ) -> Self {
        Self {
            stations: Arc::new(
                watchers
                    .into_iter()
                    .map(|w| WatchedStation {
                        name: w.profile().name,
                        watcher: Arc::new(Mutex::new(w)),
                    })
                    .collect(),
            ),
            resolver,
            ledger,
            interval,
        }
    }

    /// Runs forever. The first tick fires immediately; each tick is spawned
    /// so a slow one does not hold back the next.
    pub async fn run(self) {
        info!(
            "Monitoring {} stations every {:?}",
            self.stations.len(),
            self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let orchestrator = self.clone();
            tokio::spawn(async move {
                let report = orchestrator.tick().await;
                debug!("Tick finished: {:?}", report);
            });
        }
    }

    /// Checks every station concurrently. One station failing or panicking
    /// does not affect the others.
    pub async fn tick(&self) -> TickReport {
        let handles = self.stations.iter().map(|station| {
            let watcher = station.watcher.clone();
            let resolver = self.resolver.clone();
            let ledger = self.ledger.clone();
            tokio::spawn(async move { check_station(&watcher, &resolver, &ledger).await })
        });

        let mut report = TickReport::default();
        let results = join_all(handles).await;
        for (station, result) in self.stations.iter().zip(results) {
            report.checked += 1;
            match result {
                Ok(Ok(outcome)) => match outcome {
                    StationOutcome::Added => {
                        report.changed += 1;
                        report.added += 1;
                    }
                    StationOutcome::Unmatched | StationOutcome::AlreadyPresent => {
                        report.changed += 1;
                    }
                    StationOutcome::Busy => {
                        debug!("{}: previous check still running, skipped", station.name);
                    }
                    StationOutcome::Unchanged => {}
                },
                Ok(Err(e)) => {
                    report.failed += 1;
                    error!("{}: station check failed: {}", station.name, e);
                }
                Err(e) => {
                    report.failed += 1;
                    error!("{}: station check aborted: {}", station.name, e);
                }
            }
        }
        report
    }
}

async fn check_station(
    watcher: &Mutex<SourceWatcher>,
    resolver: &TrackResolver,
    ledger: &PlaylistLedger,
) -> Result<StationOutcome> {
    let Ok(mut watcher) = watcher.try_lock() else {
        return Ok(StationOutcome::Busy);
    };

    let song = watcher.fetch().await;
    if !watcher.has_changed(song.as_ref()) {
        return Ok(StationOutcome::Unchanged);
    }
    let Some(song) = song else {
        return Ok(StationOutcome::Unchanged);
    };

    let Some(track) = resolver.resolve(&song).await? else {
        return Ok(StationOutcome::Unmatched);
    };

    if ledger.add_if_absent(&track).await? {
        Ok(StationOutcome::Added)
    } else {
        Ok(StationOutcome::AlreadyPresent)
    }
}
