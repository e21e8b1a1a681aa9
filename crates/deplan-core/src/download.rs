//! Concurrent artifact fetching with a completion barrier
//!
//! Every fetch runs on its own tokio task. Completion callbacks may dispatch
//! further fetches; [`Downloader::await_all`] keeps draining the task list
//! until nothing is left in flight.

use futures_util::future;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::PlannerConfig;
use crate::error::{FetchError, PlanError};
use crate::lock;
use crate::traits::{FetchedArtifact, Fetcher, ProtocolHandlers};

/// Progress callback: the artifact that just arrived and how many fetches
/// are still pending
pub type DownloadListener = Arc<dyn Fn(&FetchedArtifact, usize) + Send + Sync>;

/// How a failed fetch affects the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPolicy {
    /// Failure aborts the plan
    Required,
    /// Failure is logged and dropped
    BestEffort,
}

type Completion = Box<dyn FnOnce(FetchedArtifact) -> Result<(), PlanError> + Send>;

struct HandlerWait {
    protocols: Vec<String>,
    timeout: Option<Duration>,
    poll: Duration,
}

pub struct Downloader {
    fetcher: Arc<dyn Fetcher>,
    handlers: Option<Arc<dyn ProtocolHandlers>>,
    wait: HandlerWait,
    listener: Option<DownloadListener>,
    pending: AtomicUsize,
    /// Policy per dispatched key; the strictest request wins
    dispatched: Mutex<HashMap<String, DownloadPolicy>>,
    tasks: Mutex<Vec<(String, JoinHandle<Result<(), PlanError>>)>>,
}

impl Downloader {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        handlers: Option<Arc<dyn ProtocolHandlers>>,
        config: &PlannerConfig,
        listener: Option<DownloadListener>,
    ) -> Self {
        Self {
            fetcher,
            handlers,
            wait: HandlerWait {
                protocols: config.dynamic_protocols.clone(),
                timeout: config.handler_timeout(),
                poll: config.poll_interval(),
            },
            listener,
            pending: AtomicUsize::new(0),
            dispatched: Mutex::new(HashMap::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Fetch `url` in the background and hand the artifact to `on_complete`.
    ///
    /// `key` identifies the pool location the fetch is for; each key is
    /// dispatched at most once per downloader and later calls for it return
    /// `false` and drop their callback. A later [`DownloadPolicy::Required`]
    /// call still makes a failure of that key fatal.
    pub fn download<F>(
        self: &Arc<Self>,
        key: &str,
        url: &str,
        policy: DownloadPolicy,
        on_complete: F,
    ) -> bool
    where
        F: FnOnce(FetchedArtifact) -> Result<(), PlanError> + Send + 'static,
    {
        {
            let mut dispatched = lock(&self.dispatched);
            if let Some(existing) = dispatched.get_mut(key) {
                if policy == DownloadPolicy::Required && *existing == DownloadPolicy::BestEffort {
                    tracing::debug!("Already downloading {}, now required", key);
                    *existing = DownloadPolicy::Required;
                } else {
                    tracing::debug!("Already downloading {}", key);
                }
                return false;
            }
            dispatched.insert(key.to_string(), policy);
        }

        self.pending.fetch_add(1, Ordering::SeqCst);
        let this = Arc::clone(self);
        let location = key.to_string();
        let url = url.to_string();
        let on_complete: Completion = Box::new(on_complete);
        let handle = tokio::spawn(async move { this.run(location, url, on_complete).await });

        lock(&self.tasks).push((key.to_string(), handle));
        true
    }

    async fn run(
        &self,
        location: String,
        url: String,
        on_complete: Completion,
    ) -> Result<(), PlanError> {
        let fetched = self.fetch_when_ready(&url).await;
        let remaining = self.pending.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);

        match fetched {
            Ok(artifact) => {
                tracing::debug!("Downloaded {} ({} pending)", location, remaining);
                if let Some(listener) = &self.listener {
                    listener(&artifact, remaining);
                }
                on_complete(artifact)
            }
            Err(source) => Err(PlanError::Fetch { location, source }),
        }
    }

    /// Policy of `key` at the time its outcome is collected
    fn policy_of(&self, key: &str) -> DownloadPolicy {
        lock(&self.dispatched)
            .get(key)
            .copied()
            .unwrap_or(DownloadPolicy::Required)
    }

    async fn fetch_when_ready(&self, url: &str) -> Result<FetchedArtifact, FetchError> {
        self.wait_for_handlers(url).await?;
        self.fetcher.fetch(url).await
    }

    /// Dynamic protocols `url` is wrapped in, outermost first (`wrap:mvn:...` → `["wrap"]`)
    fn dynamic_protocols_of(&self, url: &str) -> Vec<String> {
        let mut found = Vec::new();
        let mut rest = url;
        while let Some((scheme, tail)) = rest.split_once(':') {
            if !self.wait.protocols.iter().any(|p| p == scheme) {
                break;
            }
            found.push(scheme.to_string());
            rest = tail;
        }
        found
    }

    async fn wait_for_handlers(&self, url: &str) -> Result<(), FetchError> {
        let (Some(handlers), Some(timeout)) = (&self.handlers, self.wait.timeout) else {
            return Ok(());
        };
        let protocols = self.dynamic_protocols_of(url);
        if protocols.is_empty() {
            return Ok(());
        }

        let deadline = Instant::now() + timeout;
        loop {
            let missing: Vec<String> = protocols
                .iter()
                .filter(|p| !handlers.is_registered(p))
                .cloned()
                .collect();
            if missing.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(FetchError::HandlerTimeout { protocols: missing });
            }
            tracing::debug!("Waiting for URL handlers {:?} before fetching {}", missing, url);
            tokio::time::sleep(self.wait.poll).await;
        }
    }

    /// Fetches dispatched but not yet finished
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait until every dispatched fetch, including fetches dispatched by
    /// completion callbacks, has finished.
    ///
    /// Failures of best-effort keys are logged and dropped here, so a key
    /// upgraded to required while in flight still reports its failure.
    pub async fn await_all(&self) -> Result<(), PlanError> {
        let mut failures = Vec::new();

        loop {
            let batch = std::mem::take(&mut *lock(&self.tasks));
            if batch.is_empty() {
                break;
            }
            let (locations, handles): (Vec<String>, Vec<_>) = batch.into_iter().unzip();
            let results = future::join_all(handles).await;

            for (location, joined) in locations.into_iter().zip(results) {
                let outcome = match joined {
                    Ok(outcome) => outcome,
                    Err(e) => Err(PlanError::Fetch {
                        location: location.clone(),
                        source: FetchError::Aborted(e.to_string()),
                    }),
                };
                match (outcome, self.policy_of(&location)) {
                    (Ok(()), _) => {}
                    (Err(e), DownloadPolicy::BestEffort) => {
                        tracing::warn!("Ignoring {}: {}", location, e);
                    }
                    (Err(e), DownloadPolicy::Required) => failures.push(e),
                }
            }
        }

        if failures.len() > 1 {
            return Err(PlanError::Multiple(failures));
        }
        match failures.pop() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
