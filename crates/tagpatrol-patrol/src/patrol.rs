//! The scan orchestrator.
//!
//! A run puts every resource definition on a shared job queue and spawns
//! `min(concurrent_workers, definitions)` workers. Each worker pops a
//! definition, asks the [`ResourceFinder`] for its resources, hands them to
//! the [`Ruler`] and sends the [`ScanResult`] back over a channel. Results
//! therefore arrive in completion order, not input order. Each definition is
//! scanned on its own task; a panic there becomes a failed result for that
//! definition and the worker moves on.
//!
//! The caller's [`CancellationToken`] is checked before each definition is
//! dispatched and raced against every result the run waits for. Once it fires
//! the run returns immediately with whatever results have arrived;
//! definitions already in flight finish in the background and are discarded.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tagpatrol_core::{PolicyDocument, ResourceDefinition};
use tagpatrol_policy::PolicyParser;
use tagpatrol_ruler::{DefaultRuler, Ruler};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::PatrolConfig;
use crate::error::{FetchError, FinderError, PatrolError, Result};
use crate::finder::ResourceFinder;
use crate::report::{ScanOutcome, ScanReport};
use crate::scan::ScanResult;

type JobQueue = Arc<Mutex<VecDeque<ResourceDefinition>>>;

/// Scans cloud resources against resolved tag policies.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
///
/// use tagpatrol_core::TaggedResource;
/// use tagpatrol_patrol::{Patrol, PatrolConfig, StaticFinder};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let finder = StaticFinder::new()
///     .with_resource(TaggedResource::new("i-1", "ec2", "instance").with_tag("owner", "ops"));
/// let patrol = Patrol::new(Arc::new(finder), PatrolConfig::default())?;
///
/// let policy = "resources:\n  ec2:\n    instance:\n      mandatoryKeys: [owner]\n";
/// let results = patrol
///     .run_from_bytes(&CancellationToken::new(), policy.as_bytes())
///     .await?;
///
/// assert_eq!(results[0].compliant_count, 1);
/// # Ok(())
/// # }
/// ```
pub struct Patrol {
    finder: Arc<dyn ResourceFinder>,
    ruler: Arc<dyn Ruler>,
    parser: PolicyParser,
    config: PatrolConfig,
}

impl std::fmt::Debug for Patrol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Patrol")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Patrol {
    /// Creates a patrol using the default rule engine.
    ///
    /// # Errors
    ///
    /// Returns [`PatrolError::InvalidConfig`] if the configuration is invalid.
    pub fn new(finder: Arc<dyn ResourceFinder>, config: PatrolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            finder,
            ruler: Arc::new(DefaultRuler::new()),
            parser: PolicyParser::new(),
            config,
        })
    }

    /// Replaces the rule engine.
    #[must_use]
    pub fn with_ruler(mut self, ruler: Arc<dyn Ruler>) -> Self {
        self.ruler = ruler;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PatrolConfig {
        &self.config
    }

    /// Loads a policy file and scans every definition in it.
    ///
    /// # Errors
    ///
    /// Returns [`PatrolError::Policy`] if the policy cannot be loaded, or any
    /// error of [`Patrol::run`].
    pub async fn run_from_file(
        &self,
        cancel: &CancellationToken,
        path: impl AsRef<Path>,
    ) -> Result<Vec<ScanResult>> {
        let definitions = self.parser.parse_file(path)?;
        self.run(cancel, definitions).await
    }

    /// Decodes a policy held in memory and scans every definition in it.
    ///
    /// # Errors
    ///
    /// Same as [`Patrol::run_from_file`].
    pub async fn run_from_bytes(
        &self,
        cancel: &CancellationToken,
        policy: &[u8],
    ) -> Result<Vec<ScanResult>> {
        let definitions = self.parser.parse_bytes(policy)?;
        self.run(cancel, definitions).await
    }

    /// Resolves a decoded policy document and scans every definition in it.
    ///
    /// # Errors
    ///
    /// Same as [`Patrol::run_from_file`].
    pub async fn run_from_document(
        &self,
        cancel: &CancellationToken,
        document: &PolicyDocument,
    ) -> Result<Vec<ScanResult>> {
        let definitions = self.parser.parse_document(document)?;
        self.run(cancel, definitions).await
    }

    /// Scans the definitions and wraps the outcome in a [`ScanReport`].
    ///
    /// The report carries the scan id recorded on the run's `scan` span. A
    /// cancelled or stopped run still yields a report over the results that
    /// arrived, with the reason kept in [`ScanOutcome::aborted`].
    pub async fn scan(
        &self,
        cancel: &CancellationToken,
        definitions: Vec<ResourceDefinition>,
    ) -> ScanOutcome {
        let scan_id = Uuid::now_v7();
        let started_at = Utc::now();

        match self.run_with_id(scan_id, cancel, definitions).await {
            Ok(results) => ScanOutcome {
                report: ScanReport::new(scan_id, started_at, Utc::now(), &results),
                aborted: None,
            },
            Err(e) => ScanOutcome {
                report: ScanReport::new(scan_id, started_at, Utc::now(), e.partial_results()),
                aborted: Some(e),
            },
        }
    }

    /// Scans every definition and returns the results in completion order.
    ///
    /// Discovery failures are recorded on the affected [`ScanResult`] and do
    /// not fail the run unless `stop_on_error` is set.
    ///
    /// # Errors
    ///
    /// - [`PatrolError::Cancelled`] if `cancel` fires before every definition
    ///   is done
    /// - [`PatrolError::StoppedOnError`] on the first discovery failure when
    ///   `stop_on_error` is set
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        definitions: Vec<ResourceDefinition>,
    ) -> Result<Vec<ScanResult>> {
        self.run_with_id(Uuid::now_v7(), cancel, definitions).await
    }

    async fn run_with_id(
        &self,
        scan_id: Uuid,
        cancel: &CancellationToken,
        definitions: Vec<ResourceDefinition>,
    ) -> Result<Vec<ScanResult>> {
        let span = info_span!("scan", scan_id = %scan_id);
        self.dispatch(cancel, definitions).instrument(span).await
    }

    async fn dispatch(
        &self,
        cancel: &CancellationToken,
        definitions: Vec<ResourceDefinition>,
    ) -> Result<Vec<ScanResult>> {
        if cancel.is_cancelled() {
            warn!("Scan cancelled before dispatch");
            return Err(PatrolError::Cancelled {
                partial: Vec::new(),
            });
        }

        let total = definitions.len();
        let workers = self.config.concurrent_workers.min(total);
        info!(definitions = total, workers, "Starting scan");

        let queue: JobQueue = Arc::new(Mutex::new(definitions.into()));
        // Stops dispatch without touching the caller's token.
        let halt = cancel.child_token();
        let (tx, mut rx) = mpsc::channel(total.max(1));

        let mut join_set = JoinSet::new();
        for id in 0..workers {
            let worker = Worker {
                queue: Arc::clone(&queue),
                scanner: Scanner {
                    worker: id,
                    finder: Arc::clone(&self.finder),
                    ruler: Arc::clone(&self.ruler),
                    cancel: cancel.clone(),
                },
                halt: halt.clone(),
                tx: tx.clone(),
            };
            join_set.spawn(worker.run().in_current_span());
        }
        drop(tx);

        let mut results = Vec::with_capacity(total);
        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    halt.cancel();
                    join_set.detach_all();
                    warn!(completed = results.len(), total, "Scan cancelled");
                    return Err(PatrolError::Cancelled { partial: results });
                }

                received = rx.recv() => {
                    let Some(result) = received else { break };

                    let failure = result.error.clone();
                    results.push(result);

                    if let Some(source) = failure.filter(|_| self.config.stop_on_error) {
                        halt.cancel();
                        join_set.detach_all();
                        error!(error = %source, completed = results.len(), total, "Stopping scan on error");
                        return Err(PatrolError::StoppedOnError { source, partial: results });
                    }
                }
            }
        }

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Scan worker failed");
            }
        }

        info!(completed = results.len(), total, "Scan finished");
        Ok(results)
    }
}

struct Worker {
    queue: JobQueue,
    scanner: Scanner,
    halt: CancellationToken,
    tx: mpsc::Sender<ScanResult>,
}

impl Worker {
    async fn run(self) {
        loop {
            if self.halt.is_cancelled() {
                debug!(worker = self.scanner.worker, "Worker halted");
                return;
            }

            let Some(definition) = self.queue.lock().pop_front() else {
                return;
            };

            let result = self.scan_isolated(definition).await;
            if self.tx.send(result).await.is_err() {
                return;
            }
        }
    }

    /// Scans one definition on its own task so a panicking finder or ruler
    /// fails that definition only.
    async fn scan_isolated(&self, definition: ResourceDefinition) -> ScanResult {
        let name = definition.name();
        let fallback = definition.clone();
        let task = tokio::spawn(self.scanner.clone().scan(definition).in_current_span());

        match task.await {
            Ok(result) => result,
            Err(e) => {
                let reason = if e.is_panic() {
                    let payload = e.into_panic();
                    panic_message(&*payload)
                } else {
                    e.to_string()
                };
                error!(worker = self.scanner.worker, definition = %name, %reason, "Scan task failed");
                ScanResult::failed(
                    fallback,
                    FetchError {
                        definition: name,
                        source: FinderError::Panicked { reason },
                    },
                )
            }
        }
    }
}

#[derive(Clone)]
struct Scanner {
    worker: usize,
    finder: Arc<dyn ResourceFinder>,
    ruler: Arc<dyn Ruler>,
    cancel: CancellationToken,
}

impl Scanner {
    async fn scan(self, definition: ResourceDefinition) -> ScanResult {
        let service = definition.service.as_str();
        let resource_type = definition.resource_type.as_str();
        debug!(worker = self.worker, service, resource_type, "Fetching resources");

        match self
            .finder
            .find_resources(&self.cancel, service, resource_type)
            .await
        {
            Ok(mut resources) => {
                let count = self.ruler.validate_all(&mut resources, &definition.policy);
                debug!(
                    worker = self.worker,
                    service,
                    resource_type,
                    compliant = count.compliant,
                    non_compliant = count.non_compliant,
                    "Evaluated resources"
                );
                ScanResult {
                    resources,
                    compliant_count: count.compliant,
                    non_compliant_count: count.non_compliant,
                    error: None,
                    definition,
                }
            }
            Err(source) => {
                let error = FetchError {
                    definition: definition.name(),
                    source,
                };
                warn!(worker = self.worker, error = %error, "Resource discovery failed");
                ScanResult::failed(definition, error)
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
