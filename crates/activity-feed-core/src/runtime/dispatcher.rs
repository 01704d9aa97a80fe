// crates/activity-feed-core/src/runtime/dispatcher.rs
// ============================================================================
// Module: Activity Dispatcher
// Description: Per-event fan-out state machine.
// Purpose: Validate, resolve, authorize, and deliver one activity event.
// Dependencies: crate::{core, interfaces, runtime}, serde, thiserror
// ============================================================================

//! ## Overview
//! One event moves through `Received -> Validated -> Resolved -> Done`. Each
//! destination then ends as delivered, denied, or failed, independently of
//! its siblings. Delivery within one event is sequential.
//!
//! Security posture: event payloads are untrusted; only the activity path
//! property is read and the activity itself is loaded from the store.
//!
//! Invariants:
//! - The administrative session is released exactly once per event, on every
//!   exit path.
//! - Partial failure is never surfaced through [`EventHandler`]; it is
//!   recorded in the audit sink and in [`FanoutSummary`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::core::ACTIVITY_PATH_PROPERTY;
use crate::core::ActivityError;
use crate::core::ActivityEvent;
use crate::core::ActivityRecord;
use crate::core::Destination;
use crate::core::FeedLayout;
use crate::core::Privilege;
use crate::interfaces::ConnectionGraph;
use crate::interfaces::ContentRepository;
use crate::interfaces::ContentSession;
use crate::interfaces::EventHandler;
use crate::interfaces::SiteLookup;
use crate::interfaces::StoreError;
use crate::runtime::access::AccessDecision;
use crate::runtime::access::AccessFilter;
use crate::runtime::access::DenialReason;
use crate::runtime::audit::FanoutAuditEvent;
use crate::runtime::audit::FanoutAuditKind;
use crate::runtime::audit::FanoutAuditSink;
use crate::runtime::audit::StderrAuditSink;
use crate::runtime::feed_store::FeedStore;
use crate::runtime::resolver::RecipientResolver;
use crate::runtime::resolver::ResolutionError;
use crate::runtime::session::ScopedSession;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Dispatcher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutSettings {
    /// Feed naming conventions.
    pub layout: FeedLayout,
    /// Event property naming the activity location.
    pub activity_path_property: String,
    /// Privilege a connection recipient must hold on the activity.
    pub privilege: Privilege,
}

impl Default for FanoutSettings {
    fn default() -> Self {
        Self {
            layout: FeedLayout::default(),
            activity_path_property: ACTIVITY_PATH_PROPERTY.to_string(),
            privilege: Privilege::Read,
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Per-event processing stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutStage {
    /// The event arrived.
    Received,
    /// The activity was loaded and has an actor.
    Validated,
    /// Destinations were computed.
    Resolved,
    /// Every destination reached a terminal outcome.
    Done,
}

/// Fatal per-event failures; the event is dropped without retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FanoutError {
    /// The event carries no activity location.
    #[error("event has no activity location")]
    MissingActivityPath,
    /// The administrative session could not be opened.
    #[error("administrative session unavailable: {0}")]
    Session(StoreError),
    /// Loading the activity failed.
    #[error("activity {path} could not be loaded: {source}")]
    LoadFailed {
        /// Activity location.
        path: String,
        /// Underlying store error.
        source: StoreError,
    },
    /// No activity exists at the location.
    #[error("activity {0} not found")]
    ActivityNotFound(String),
    /// The activity has no actor.
    #[error("activity {0} has no actor")]
    MissingActor(String),
}

impl FanoutError {
    /// Returns true for malformed events and invalid activities.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingActivityPath | Self::ActivityNotFound(_) | Self::MissingActor(_)
        )
    }

    /// Returns the stage the event failed to complete.
    #[must_use]
    pub const fn stage(&self) -> FanoutStage {
        match self {
            Self::MissingActivityPath => FanoutStage::Received,
            Self::Session(_)
            | Self::LoadFailed {
                ..
            }
            | Self::ActivityNotFound(_)
            | Self::MissingActor(_) => FanoutStage::Validated,
        }
    }
}

/// Terminal outcome for one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationOutcome {
    /// A copy was delivered.
    Delivered {
        /// Path of the delivered copy.
        copy_path: String,
    },
    /// The recipient was not authorized; not an error.
    Denied {
        /// Why the recipient was skipped.
        reason: DenialReason,
    },
    /// Authorization or delivery failed.
    Failed {
        /// Error description.
        error: String,
    },
}

/// Outcome report for one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationReport {
    /// Destination considered.
    pub destination: Destination,
    /// Terminal outcome.
    pub outcome: DestinationOutcome,
}

/// Result of processing one event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FanoutSummary {
    /// Activity location.
    pub activity_path: String,
    /// Absorbed resolution failures.
    pub resolution_failures: Vec<ResolutionError>,
    /// Per-destination reports in processing order.
    pub reports: Vec<DestinationReport>,
}

impl FanoutSummary {
    /// Returns the number of delivered copies.
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.count(|outcome| matches!(outcome, DestinationOutcome::Delivered { .. }))
    }

    /// Returns the number of denied recipients.
    #[must_use]
    pub fn denied(&self) -> usize {
        self.count(|outcome| matches!(outcome, DestinationOutcome::Denied { .. }))
    }

    /// Returns the number of failed destinations.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, DestinationOutcome::Failed { .. }))
    }

    /// Returns the paths of every delivered copy.
    #[must_use]
    pub fn delivered_paths(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter_map(|report| match &report.outcome {
                DestinationOutcome::Delivered {
                    copy_path,
                } => Some(copy_path.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Counts reports whose outcome matches `predicate`.
    fn count(&self, predicate: impl Fn(&DestinationOutcome) -> bool) -> usize {
        self.reports.iter().filter(|report| predicate(&report.outcome)).count()
    }
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Fans one activity out to every authorized destination.
pub struct ActivityDispatcher<R, L, G> {
    /// Content repository.
    repository: R,
    /// Recipient resolver.
    resolver: RecipientResolver<L, G>,
    /// Access filter for connection recipients.
    access: AccessFilter,
    /// Feed store adapter.
    feed_store: FeedStore,
    /// Event property naming the activity location.
    activity_path_property: String,
    /// Audit sink.
    audit: Arc<dyn FanoutAuditSink>,
}

impl<R, L, G> ActivityDispatcher<R, L, G>
where
    R: ContentRepository,
    L: SiteLookup,
    G: ConnectionGraph,
{
    /// Creates a dispatcher that audits to stderr.
    #[must_use]
    pub fn new(repository: R, sites: L, connections: G, settings: FanoutSettings) -> Self {
        Self {
            repository,
            resolver: RecipientResolver::new(sites, connections, settings.layout.clone()),
            access: AccessFilter::new(settings.privilege),
            feed_store: FeedStore::new(settings.layout),
            activity_path_property: settings.activity_path_property,
            audit: Arc::new(StderrAuditSink),
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn FanoutAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the content repository.
    #[must_use]
    pub const fn repository(&self) -> &R {
        &self.repository
    }

    /// Returns the recipient resolver.
    #[must_use]
    pub const fn resolver(&self) -> &RecipientResolver<L, G> {
        &self.resolver
    }

    /// Processes one event to completion.
    ///
    /// # Errors
    ///
    /// Returns [`FanoutError`] when the event is dropped before resolution.
    /// Per-destination failures are reported in the summary, not as errors.
    pub fn process(&self, event: &ActivityEvent) -> Result<FanoutSummary, FanoutError> {
        let activity_path = event.property_str(&self.activity_path_property).map(str::to_string);
        match self.run(event) {
            Ok(summary) => {
                self.audit.record(
                    &FanoutAuditEvent::new(FanoutAuditKind::FanoutCompleted)
                        .activity(summary.activity_path.clone())
                        .detail(format!(
                            "delivered={} denied={} failed={}",
                            summary.delivered(),
                            summary.denied(),
                            summary.failed()
                        )),
                );
                Ok(summary)
            }
            Err(err) => {
                let mut record =
                    FanoutAuditEvent::new(FanoutAuditKind::EventRejected).detail(err.to_string());
                if let Some(path) = activity_path {
                    record = record.activity(path);
                }
                self.audit.record(&record);
                Err(err)
            }
        }
    }

    /// Runs the state machine; the session guard releases on every return.
    fn run(&self, event: &ActivityEvent) -> Result<FanoutSummary, FanoutError> {
        let activity_path = event
            .property_str(&self.activity_path_property)
            .filter(|path| !path.is_empty())
            .ok_or(FanoutError::MissingActivityPath)?;

        let session = self.repository.login_administrative().map_err(FanoutError::Session)?;
        let mut session = ScopedSession::new(session);
        let activity = self.load_activity(&*session, activity_path)?;

        let resolution = self.resolver.resolve(&*session, &activity);
        for failure in &resolution.failures {
            let kind = match failure {
                ResolutionError::SiteLookup(_) => FanoutAuditKind::SiteLookupFailed,
                ResolutionError::Connections(_) => FanoutAuditKind::ConnectionsLookupFailed,
            };
            self.audit.record(
                &FanoutAuditEvent::new(kind).activity(activity.path()).detail(failure.to_string()),
            );
        }
        self.audit.record(
            &FanoutAuditEvent::new(FanoutAuditKind::ActivityResolved)
                .activity(activity.path())
                .detail(format!("destinations={}", resolution.destinations.len())),
        );

        let mut summary = FanoutSummary {
            activity_path: activity.path().to_string(),
            resolution_failures: resolution.failures,
            reports: Vec::with_capacity(resolution.destinations.len()),
        };
        for destination in resolution.destinations {
            let outcome = self.handle_destination(&mut *session, &activity, &destination);
            self.audit_outcome(&activity, &destination, &outcome);
            summary.reports.push(DestinationReport {
                destination,
                outcome,
            });
        }
        session.release();
        Ok(summary)
    }

    /// Loads and validates the activity at `path`.
    fn load_activity(
        &self,
        session: &R::Session,
        path: &str,
    ) -> Result<ActivityRecord, FanoutError> {
        let node = session
            .load(path)
            .map_err(|source| FanoutError::LoadFailed {
                path: path.to_string(),
                source,
            })?
            .ok_or_else(|| FanoutError::ActivityNotFound(path.to_string()))?;
        ActivityRecord::from_properties(&node.path, node.properties, self.feed_store.layout())
            .map_err(|ActivityError::MissingActor {
                 path,
             }| FanoutError::MissingActor(path))
    }

    /// Authorizes (connections only) and delivers to one destination.
    fn handle_destination(
        &self,
        session: &mut R::Session,
        activity: &ActivityRecord,
        destination: &Destination,
    ) -> DestinationOutcome {
        if let Some(recipient) = destination.recipient() {
            match self.access.authorize(&*session, recipient, activity.path()) {
                Ok(AccessDecision::Allowed) => {}
                Ok(AccessDecision::Denied(reason)) => {
                    return DestinationOutcome::Denied {
                        reason,
                    };
                }
                Err(err) => {
                    return DestinationOutcome::Failed {
                        error: err.to_string(),
                    };
                }
            }
        }
        match self.feed_store.deliver(session, activity, &destination.root_path) {
            Ok(copy) => DestinationOutcome::Delivered {
                copy_path: copy.path,
            },
            Err(err) => DestinationOutcome::Failed {
                error: err.to_string(),
            },
        }
    }

    /// Records the audit entry for one destination outcome.
    fn audit_outcome(
        &self,
        activity: &ActivityRecord,
        destination: &Destination,
        outcome: &DestinationOutcome,
    ) {
        let (kind, detail) = match outcome {
            DestinationOutcome::Delivered {
                copy_path,
            } => (FanoutAuditKind::DestinationDelivered, copy_path.clone()),
            DestinationOutcome::Denied {
                reason,
            } => (FanoutAuditKind::DestinationDenied, denial_label(reason)),
            DestinationOutcome::Failed {
                error,
            } => (FanoutAuditKind::DestinationFailed, error.clone()),
        };
        let mut record = FanoutAuditEvent::new(kind)
            .activity(activity.path())
            .destination(destination.root_path.clone())
            .detail(detail);
        if let Some(recipient) = destination.recipient() {
            record = record.recipient(recipient.as_str());
        }
        self.audit.record(&record);
    }
}

impl<R, L, G> EventHandler for ActivityDispatcher<R, L, G>
where
    R: ContentRepository,
    L: SiteLookup,
    G: ConnectionGraph,
{
    fn handle_event(&self, event: &ActivityEvent) {
        let _ = self.process(event);
    }
}

/// Returns a stable label for a denial.
fn denial_label(reason: &DenialReason) -> String {
    match reason {
        DenialReason::MissingPrivilege => "missing_privilege".to_string(),
        DenialReason::ImpersonationFailed(detail) => format!("impersonation_failed: {detail}"),
    }
}
