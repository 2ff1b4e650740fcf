//! SelectionController: owns the explored country and fans out the two
//! per-country fetches.
//!
//! Each `select_country` bumps a generation counter. The station and insight
//! fetches run as independent tasks and report back tagged with the
//! generation they were started for; `apply` drops anything that is not for
//! the current generation, so a slow answer for a previous country can never
//! overwrite the current one.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use world_radio_proto::directory::StationDirectory;
use world_radio_proto::insight::InsightSource;
use world_radio_proto::protocol::{SelectionState, Station};

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    StationsLoaded { generation: u64, stations: Vec<Station> },
    InsightLoaded { generation: u64, text: String },
}

impl SelectionEvent {
    pub fn generation(&self) -> u64 {
        match self {
            SelectionEvent::StationsLoaded { generation, .. }
            | SelectionEvent::InsightLoaded { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("country code and name must both be non-empty")]
    EmptyCountry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Fetches launched for this generation.
    Started(u64),
    /// Already the selected country; nothing happened.
    Unchanged,
}

pub struct SelectionController {
    state: SelectionState,
    generation: u64,
    directory: Arc<dyn StationDirectory>,
    insight: Arc<dyn InsightSource>,
    events: mpsc::UnboundedSender<SelectionEvent>,
}

impl SelectionController {
    pub fn new(
        directory: Arc<dyn StationDirectory>,
        insight: Arc<dyn InsightSource>,
        events: mpsc::UnboundedSender<SelectionEvent>,
    ) -> Self {
        Self {
            state: SelectionState::default(),
            generation: 0,
            directory,
            insight,
            events,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn select_country(&mut self, code: &str, name: &str) -> Result<SelectOutcome, SelectionError> {
        let code = code.trim().to_ascii_uppercase();
        let name = name.trim().to_string();
        if code.is_empty() || name.is_empty() {
            return Err(SelectionError::EmptyCountry);
        }
        if self.state.country_code.as_deref() == Some(code.as_str()) {
            debug!("selection: {} already selected", code);
            return Ok(SelectOutcome::Unchanged);
        }

        self.generation += 1;
        let generation = self.generation;
        info!("selection: {} ({}) gen={}", name, code, generation);

        self.state = SelectionState {
            country_code: Some(code.clone()),
            country_name: Some(name.clone()),
            stations: Vec::new(),
            insight: None,
            loading_stations: true,
            loading_insight: true,
        };

        let directory = Arc::clone(&self.directory);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let stations = directory.list_stations(&code).await;
            let _ = tx.send(SelectionEvent::StationsLoaded { generation, stations });
        });

        let insight = Arc::clone(&self.insight);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let text = insight.get_insight(&name).await;
            let _ = tx.send(SelectionEvent::InsightLoaded { generation, text });
        });

        Ok(SelectOutcome::Started(generation))
    }

    /// Fold a fetch result into the state. Returns `false` for stale results.
    pub fn apply(&mut self, event: SelectionEvent) -> bool {
        if event.generation() != self.generation {
            debug!(
                "selection: dropping stale result gen={} (current {})",
                event.generation(),
                self.generation
            );
            return false;
        }
        match event {
            SelectionEvent::StationsLoaded { stations, .. } => {
                debug!("selection: {} stations", stations.len());
                self.state.stations = stations;
                self.state.loading_stations = false;
            }
            SelectionEvent::InsightLoaded { text, .. } => {
                self.state.insight = Some(text);
                self.state.loading_insight = false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;
    use world_radio_proto::insight::failure_fallback;

    /// Canned stations per code; codes listed in `gated` wait for `gate`.
    #[derive(Default)]
    struct FakeDirectory {
        calls: AtomicUsize,
        stations: HashMap<String, Vec<Station>>,
        gated: Vec<String>,
        gate: Notify,
    }

    #[async_trait]
    impl StationDirectory for FakeDirectory {
        async fn list_stations(&self, country_code: &str) -> Vec<Station> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.gated.iter().any(|c| c == country_code) {
                self.gate.notified().await;
            }
            self.stations.get(country_code).cloned().unwrap_or_default()
        }
    }

    /// Always "fails", answering with the neutral fallback.
    #[derive(Default)]
    struct FailingInsight {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InsightSource for FailingInsight {
        async fn get_insight(&self, country_name: &str) -> String {
            self.calls.lock().unwrap().push(country_name.to_string());
            failure_fallback(country_name)
        }
    }

    fn station(id: &str) -> Station {
        Station {
            id: id.into(),
            name: id.into(),
            url_resolved: format!("https://{id}.example/"),
            ..Default::default()
        }
    }

    fn setup(
        directory: FakeDirectory,
    ) -> (
        SelectionController,
        Arc<FakeDirectory>,
        Arc<FailingInsight>,
        mpsc::UnboundedReceiver<SelectionEvent>,
    ) {
        let directory = Arc::new(directory);
        let insight = Arc::new(FailingInsight::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = SelectionController::new(directory.clone(), insight.clone(), tx);
        (controller, directory, insight, rx)
    }

    #[tokio::test]
    async fn france_scenario() {
        let mut directory = FakeDirectory::default();
        directory
            .stations
            .insert("FR".into(), vec![station("fip"), station("inter")]);
        let (mut sc, _dir, _ins, mut rx) = setup(directory);

        assert_eq!(sc.select_country("FR", "France"), Ok(SelectOutcome::Started(1)));
        let s = sc.state();
        assert!(s.loading_stations && s.loading_insight);
        assert!(s.stations.is_empty());
        assert_eq!(s.insight, None);
        assert_eq!(s.country_name.as_deref(), Some("France"));

        for _ in 0..2 {
            let event = rx.recv().await.unwrap();
            assert!(sc.apply(event));
        }

        let s = sc.state();
        assert_eq!(s.stations.len(), 2);
        assert!(!s.loading_stations);
        assert_eq!(s.insight.as_deref(), Some("Discover the sounds of France."));
        assert!(!s.loading_insight);
    }

    #[tokio::test]
    async fn same_country_twice_fetches_once() {
        let (mut sc, dir, ins, mut rx) = setup(FakeDirectory::default());

        assert!(matches!(sc.select_country("de", "Germany"), Ok(SelectOutcome::Started(_))));
        assert_eq!(sc.select_country("DE", "Germany"), Ok(SelectOutcome::Unchanged));

        for _ in 0..2 {
            sc.apply(rx.recv().await.unwrap());
        }
        assert_eq!(dir.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ins.calls.lock().unwrap().len(), 1);
        assert_eq!(sc.generation(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_country_is_rejected() {
        let (mut sc, dir, _ins, _rx) = setup(FakeDirectory::default());
        assert_eq!(sc.select_country("", "Nowhere"), Err(SelectionError::EmptyCountry));
        assert_eq!(sc.select_country("XX", "  "), Err(SelectionError::EmptyCountry));
        assert!(!sc.state().has_selection());
        assert_eq!(dir.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_stations_are_discarded() {
        let mut directory = FakeDirectory::default();
        directory.stations.insert("AR".into(), vec![station("old")]);
        directory.stations.insert("BR".into(), vec![station("new")]);
        directory.gated.push("AR".into());
        let (mut sc, dir, _ins, mut rx) = setup(directory);

        sc.select_country("AR", "Argentina").unwrap();
        sc.select_country("BR", "Brazil").unwrap();

        // Argentina's stations are held back; everything else arrives.
        let mut applied = 0;
        let mut stale = 0;
        for _ in 0..3 {
            if sc.apply(rx.recv().await.unwrap()) {
                applied += 1;
            } else {
                stale += 1;
            }
        }
        assert_eq!((applied, stale), (2, 1));

        dir.gate.notify_one();
        let late = rx.recv().await.unwrap();
        assert_eq!(late.generation(), 1);
        assert!(!sc.apply(late));

        let s = sc.state();
        assert_eq!(s.country_code.as_deref(), Some("BR"));
        assert_eq!(s.stations, vec![station("new")]);
        assert_eq!(s.insight.as_deref(), Some("Discover the sounds of Brazil."));
    }

    #[tokio::test]
    async fn sections_load_independently() {
        let mut directory = FakeDirectory::default();
        directory.gated.push("JP".into());
        let (mut sc, dir, _ins, mut rx) = setup(directory);

        sc.select_country("JP", "Japan").unwrap();

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, SelectionEvent::InsightLoaded { .. }));
        assert!(sc.apply(first));
        assert!(!sc.state().loading_insight);
        assert!(sc.state().loading_stations);

        dir.gate.notify_one();
        assert!(sc.apply(rx.recv().await.unwrap()));
        assert!(!sc.state().loading_stations);
        assert!(sc.state().stations.is_empty());
    }
}
