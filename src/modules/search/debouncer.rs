//! Search-as-you-type with a quiet period and stale-result suppression.
//!
//! Every text change bumps a generation counter and aborts the pending
//! task. A task only touches state while its generation is still current,
//! so a superseded request can never overwrite newer state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::client::BookSearch;
use super::error::SearchError;
use super::models::BookCandidate;

/// What the search field currently shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchState {
    Idle,
    Debouncing {
        query: String,
    },
    Searching {
        query: String,
    },
    Results {
        query: String,
        candidates: Vec<BookCandidate>,
    },
    Empty {
        query: String,
    },
    Failed {
        query: String,
        error: SearchError,
    },
    Selected {
        candidate: BookCandidate,
    },
}

impl SearchState {
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            SearchState::Debouncing { .. } | SearchState::Searching { .. }
        )
    }
}

#[derive(Default)]
struct Control {
    text: String,
    generation: u64,
    task: Option<JoinHandle<()>>,
    selected: Option<BookCandidate>,
}

struct Shared {
    client: Arc<dyn BookSearch>,
    quiet_period: Duration,
    state: watch::Sender<SearchState>,
    control: Mutex<Control>,
}

/// Debounced search driver for one text field. Clones share the field.
///
/// Methods that schedule work spawn onto the ambient Tokio runtime.
#[derive(Clone)]
pub struct SearchDebouncer {
    shared: Arc<Shared>,
}

impl SearchDebouncer {
    pub fn new(client: Arc<dyn BookSearch>, quiet_period: Duration) -> Self {
        let (state, _) = watch::channel(SearchState::Idle);
        Self {
            shared: Arc::new(Shared {
                client,
                quiet_period,
                state,
                control: Mutex::new(Control::default()),
            }),
        }
    }

    pub fn state(&self) -> SearchState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.shared.state.subscribe()
    }

    pub fn text(&self) -> String {
        self.shared.lock().text.clone()
    }

    pub fn selected(&self) -> Option<BookCandidate> {
        self.shared.lock().selected.clone()
    }

    /// Record a keystroke. While a candidate is selected only the text is kept.
    pub fn on_text_changed(&self, text: impl Into<String>) {
        let mut control = self.shared.lock();
        control.text = text.into();
        if control.selected.is_some() {
            return;
        }
        self.shared.debounce(&mut control);
    }

    /// Pick a candidate from the current results. Unknown ids are ignored.
    pub fn select(&self, candidate_id: &str) -> Option<BookCandidate> {
        let mut control = self.shared.lock();
        let candidate = match &*self.shared.state.borrow() {
            SearchState::Results { candidates, .. } => candidates
                .iter()
                .find(|candidate| candidate.id == candidate_id)
                .cloned(),
            _ => None,
        }?;

        self.shared.cancel_pending(&mut control);
        control.selected = Some(candidate.clone());
        tracing::debug!(target: "lectern::search", candidate = %candidate.id, "candidate selected");
        self.shared.publish(SearchState::Selected {
            candidate: candidate.clone(),
        });
        Some(candidate)
    }

    /// Drop the selection and search again for the current text.
    pub fn clear_selection(&self) {
        let mut control = self.shared.lock();
        if control.selected.take().is_none() {
            return;
        }
        self.shared.debounce(&mut control);
    }

    /// Re-issue the failed query immediately. Returns whether a retry started.
    pub fn retry(&self) -> bool {
        let mut control = self.shared.lock();
        let query = match &*self.shared.state.borrow() {
            SearchState::Failed { query, .. } => query.clone(),
            _ => return false,
        };

        self.shared.cancel_pending(&mut control);
        tracing::debug!(target: "lectern::search", %query, "retrying search");
        Shared::schedule(&self.shared, &mut control, query, Duration::ZERO);
        true
    }

    /// Empty the field, dropping results and any selection.
    pub fn clear(&self) {
        let mut control = self.shared.lock();
        control.text.clear();
        control.selected = None;
        self.shared.cancel_pending(&mut control);
        self.shared.publish(SearchState::Idle);
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: SearchState) {
        self.state.send_replace(state);
    }

    fn cancel_pending(&self, control: &mut Control) {
        control.generation += 1;
        if let Some(task) = control.task.take() {
            task.abort();
        }
    }

    fn debounce(self: &Arc<Self>, control: &mut Control) {
        self.cancel_pending(control);

        let query = control.text.trim().to_string();
        if query.is_empty() {
            self.publish(SearchState::Idle);
            return;
        }

        self.publish(SearchState::Debouncing {
            query: query.clone(),
        });
        Shared::schedule(self, control, query, self.quiet_period);
    }

    fn schedule(this: &Arc<Self>, control: &mut Control, query: String, delay: Duration) {
        let generation = control.generation;
        let shared = Arc::clone(this);

        control.task = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if !shared.begin_search(generation, &query) {
                return;
            }
            let result = shared.client.search(&query).await;
            shared.finish_search(generation, query, result);
        }));
    }

    fn begin_search(&self, generation: u64, query: &str) -> bool {
        let control = self.lock();
        if control.generation != generation {
            return false;
        }
        self.publish(SearchState::Searching {
            query: query.to_string(),
        });
        true
    }

    fn finish_search(
        &self,
        generation: u64,
        query: String,
        result: Result<Vec<BookCandidate>, SearchError>,
    ) {
        let mut control = self.lock();
        if control.generation != generation {
            tracing::debug!(target: "lectern::search", %query, "discarding superseded search result");
            return;
        }
        control.task = None;

        let state = match result {
            Ok(candidates) if candidates.is_empty() => SearchState::Empty { query },
            Ok(candidates) => SearchState::Results { query, candidates },
            Err(error) => {
                tracing::warn!(target: "lectern::search", %query, %error, "search failed");
                SearchState::Failed { query, error }
            }
        };
        self.publish(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    const QUIET: Duration = Duration::from_millis(300);

    struct FakeSearch {
        calls: Mutex<Vec<String>>,
        latency: Duration,
        response: Mutex<Result<Vec<BookCandidate>, SearchError>>,
    }

    impl FakeSearch {
        fn new(latency: Duration, response: Result<Vec<BookCandidate>, SearchError>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                latency,
                response: Mutex::new(response),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn respond_with(&self, response: Result<Vec<BookCandidate>, SearchError>) {
            *self.response.lock().unwrap() = response;
        }
    }

    #[async_trait]
    impl BookSearch for FakeSearch {
        async fn search(&self, query: &str) -> Result<Vec<BookCandidate>, SearchError> {
            self.calls.lock().unwrap().push(query.to_string());
            tokio::time::sleep(self.latency).await;
            self.response.lock().unwrap().clone()
        }
    }

    fn candidate(id: &str, title: &str) -> BookCandidate {
        BookCandidate {
            id: id.into(),
            title: title.into(),
            authors: vec!["Someone".into()],
            page_count: 200,
            thumbnail_url: None,
            description: None,
            published_date: None,
            categories: None,
        }
    }

    fn debouncer(client: &Arc<FakeSearch>) -> SearchDebouncer {
        SearchDebouncer::new(client.clone(), QUIET)
    }

    async fn settled(rx: &mut watch::Receiver<SearchState>) -> SearchState {
        rx.wait_for(|state| !state.is_loading())
            .await
            .unwrap()
            .clone()
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_issues_one_request() {
        let client = FakeSearch::new(Duration::ZERO, Ok(vec![candidate("1", "abc")]));
        let search = debouncer(&client);
        let mut rx = search.subscribe();

        search.on_text_changed("a");
        tokio::time::advance(Duration::from_millis(100)).await;
        search.on_text_changed("ab");
        tokio::time::advance(Duration::from_millis(100)).await;
        search.on_text_changed("abc");

        let state = settled(&mut rx).await;
        assert!(matches!(state, SearchState::Results { ref query, .. } if query == "abc"));
        assert_eq!(client.calls(), vec!["abc"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_field_ignores_late_result() {
        let client = FakeSearch::new(Duration::from_secs(2), Ok(vec![candidate("1", "abc")]));
        let search = debouncer(&client);
        let mut rx = search.subscribe();

        search.on_text_changed("abc");
        rx.wait_for(|state| matches!(state, SearchState::Searching { .. }))
            .await
            .unwrap();

        search.on_text_changed("");
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(search.state(), SearchState::Idle);
        assert_eq!(client.calls(), vec!["abc"]);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_text_never_searches() {
        let client = FakeSearch::new(Duration::ZERO, Ok(vec![]));
        let search = debouncer(&client);

        search.on_text_changed("   ");
        assert_eq!(search.state(), SearchState::Idle);

        tokio::time::sleep(QUIET * 3).await;
        assert!(client.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn no_results_is_empty_state() {
        let client = FakeSearch::new(Duration::ZERO, Ok(vec![]));
        let search = debouncer(&client);
        let mut rx = search.subscribe();

        search.on_text_changed("zzzz");

        assert_eq!(
            settled(&mut rx).await,
            SearchState::Empty {
                query: "zzzz".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_retryable() {
        let client = FakeSearch::new(
            Duration::ZERO,
            Err(SearchError::ServerError { status: 500 }),
        );
        let search = debouncer(&client);
        let mut rx = search.subscribe();

        search.on_text_changed("dune");
        let failed = settled(&mut rx).await;
        assert!(matches!(failed, SearchState::Failed { .. }));

        client.respond_with(Ok(vec![candidate("d1", "Dune")]));
        assert!(search.retry());
        rx.wait_for(|state| matches!(state, SearchState::Results { .. }))
            .await
            .unwrap();

        assert_eq!(client.calls(), vec!["dune", "dune"]);
        assert!(!search.retry());
    }

    #[tokio::test(start_paused = true)]
    async fn selection_suppresses_searches_until_cleared() {
        let client = FakeSearch::new(Duration::ZERO, Ok(vec![candidate("d1", "Dune")]));
        let search = debouncer(&client);
        let mut rx = search.subscribe();

        search.on_text_changed("dune");
        settled(&mut rx).await;

        assert!(search.select("missing").is_none());
        let picked = search.select("d1").unwrap();
        assert_eq!(picked.title, "Dune");
        assert!(matches!(search.state(), SearchState::Selected { .. }));

        search.on_text_changed("dune messiah");
        tokio::time::sleep(QUIET * 3).await;
        assert_eq!(client.calls(), vec!["dune"]);
        assert_eq!(search.text(), "dune messiah");

        search.clear_selection();
        assert!(search.selected().is_none());
        rx.wait_for(
            |state| matches!(state, SearchState::Results { query, .. } if query == "dune messiah"),
        )
        .await
        .unwrap();
        assert_eq!(client.calls(), vec!["dune", "dune messiah"]);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_resets_everything() {
        let client = FakeSearch::new(Duration::ZERO, Ok(vec![candidate("d1", "Dune")]));
        let search = debouncer(&client);
        let mut rx = search.subscribe();

        search.on_text_changed("dune");
        settled(&mut rx).await;
        search.select("d1");

        search.clear();
        assert_eq!(search.state(), SearchState::Idle);
        assert!(search.selected().is_none());
        assert!(search.text().is_empty());
    }
}
