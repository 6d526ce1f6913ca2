use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

use eframe::egui;

use super::routes::Route;
use super::view_state::{FetchTicket, Payload};
use crate::api::{LookupSource, SearchEntry};
use crate::error::Result;

/// Runs a lookup for `route`. A pair is fetched in both directions.
pub fn fetch(source: &dyn LookupSource, route: &Route) -> Result<Payload> {
    match route {
        Route::Word { word, lang } => source.word(word, lang).map(Payload::Word),
        Route::Language(iso) => source.language(iso).map(Payload::Language),
        Route::Pair(src, dst) => {
            let forward = source.pair(src, dst)?;
            let backward = source.pair(dst, src)?;
            Ok(Payload::Pair(forward, backward))
        }
    }
}

/// Runs lookups off the UI thread. Results come back tagged with the
/// generation of the navigation that asked for them.
pub struct FetchWorker {
    source: Arc<dyn LookupSource>,
    tx: Sender<(u64, Result<Payload>)>,
    rx: Receiver<(u64, Result<Payload>)>,
    search_tx: Sender<(u64, Result<Vec<SearchEntry>>)>,
    search_rx: Receiver<(u64, Result<Vec<SearchEntry>>)>,
    search_generation: u64,
}

impl FetchWorker {
    pub fn new(source: Arc<dyn LookupSource>) -> Self {
        let (tx, rx) = channel();
        let (search_tx, search_rx) = channel();
        Self { source, tx, rx, search_tx, search_rx, search_generation: 0 }
    }

    pub fn spawn(&self, ticket: FetchTicket, ctx: &egui::Context) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = fetch(source.as_ref(), &ticket.route);
            // the receiver is gone only when the app is closing
            let _ = tx.send((ticket.generation, result));
            ctx.request_repaint();
        });
    }

    /// Responses received since the last call.
    pub fn poll(&self) -> Vec<(u64, Result<Payload>)> {
        self.rx.try_iter().collect()
    }

    /// Starts a suggestion lookup; older suggestion requests are superseded.
    pub fn search(&mut self, query: &str, ctx: &egui::Context) {
        self.search_generation += 1;
        let generation = self.search_generation;
        let source = Arc::clone(&self.source);
        let tx = self.search_tx.clone();
        let ctx = ctx.clone();
        let query = query.to_string();
        std::thread::spawn(move || {
            let _ = tx.send((generation, source.search(&query)));
            ctx.request_repaint();
        });
    }

    /// Drops whatever suggestion request is still in flight.
    pub fn cancel_search(&mut self) {
        self.search_generation += 1;
    }

    /// Latest current suggestion result, if one arrived.
    pub fn poll_search(&self) -> Option<Result<Vec<SearchEntry>>> {
        self.search_rx
            .try_iter()
            .filter(|(g, _)| *g == self.search_generation)
            .last()
            .map(|(_, r)| r)
    }
}
