//! The audit client: log, search, and root calls with verification.
//!
//! `AuditClient` wires the collaborators to the verification engine and
//! owns the client's `VerificationSession`. Every log call with
//! `verify` set runs as one session cycle: the stored root goes out as
//! `prev_root`, the response is verified against it, and the session moves
//! to the new root only once the new root is proven to extend the stored
//! one. The first cycle, with nothing stored, adopts any root that did not
//! fail.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use trellis_config::{ClientConfig, SearchSettings};
use trellis_contracts::{
    error::{TrellisError, TrellisResult},
    event::Event,
    options::{LogOptions, SearchOptions},
    record::{LogRequest, LogResponse, ResultsRequest, SearchRequest, SearchResponse},
    root::{Root, RootRequest, TreeHead},
    verification::{Verification, VerificationOutcome},
};
use trellis_core::{
    traits::{EventSigner, LogService, PublishedRootSource, RootLookup, SearchService},
    VerificationSession,
};

use crate::{
    engine::VerificationEngine,
    reconcile::RootReconciler,
    signature::{sign_event, SignatureVerifier},
};

/// The response to a log call and what the engine made of it.
#[derive(Debug, Clone)]
pub struct LogResult {
    pub response: LogResponse,
    pub outcome: VerificationOutcome,
}

/// A search or results page with outcomes attached to every record.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub response: SearchResponse,
    /// One outcome per record, in record order.
    pub outcomes: Vec<VerificationOutcome>,
}

impl SearchResult {
    /// The worst outcome across the page; `NotVerified` for an empty page.
    pub fn summary(&self) -> Verification {
        self.outcomes
            .iter()
            .map(VerificationOutcome::summary)
            .reduce(Verification::worst)
            .unwrap_or(Verification::NotVerified)
    }
}

pub struct AuditClient {
    log_service: Arc<dyn LogService>,
    search_service: Arc<dyn SearchService>,
    root_lookup: Arc<dyn RootLookup>,
    anchor: Option<Arc<dyn PublishedRootSource>>,
    engine: VerificationEngine,
    session: VerificationSession,
    signer: Option<Box<dyn EventSigner>>,
    key_info: BTreeMap<String, Value>,
    tenant_id: Option<String>,
    fallback_to_root_lookup: bool,
    search_settings: SearchSettings,
    log_defaults: LogOptions,
    search_defaults: SearchOptions,
}

impl AuditClient {
    /// A client whose three service endpoints are one object.
    pub fn new<S>(service: Arc<S>) -> Self
    where
        S: LogService + SearchService + RootLookup + 'static,
    {
        Self::from_parts(service.clone(), service.clone(), service)
    }

    pub fn from_parts(
        log_service: Arc<dyn LogService>,
        search_service: Arc<dyn SearchService>,
        root_lookup: Arc<dyn RootLookup>,
    ) -> Self {
        Self {
            log_service,
            search_service,
            root_lookup,
            anchor: None,
            engine: VerificationEngine::new(SignatureVerifier::new()),
            session: VerificationSession::new(),
            signer: None,
            key_info: BTreeMap::new(),
            tenant_id: None,
            fallback_to_root_lookup: true,
            search_settings: SearchSettings::default(),
            log_defaults: LogOptions::default(),
            search_defaults: SearchOptions::default(),
        }
    }

    /// Apply a loaded configuration.
    pub fn configure(mut self, config: &ClientConfig) -> Self {
        self.tenant_id = config.tenant_id.clone();
        self.fallback_to_root_lookup = config.anchor.fallback_to_root_lookup;
        self.search_settings = config.search.clone();
        self.log_defaults = config.log_options();
        self.search_defaults = config.search_options();
        self.rebuild_reconciler();
        self
    }

    /// Reconcile search results against `anchor`.
    pub fn with_anchor(mut self, anchor: Arc<dyn PublishedRootSource>) -> Self {
        self.anchor = Some(anchor);
        self.rebuild_reconciler();
        self
    }

    pub fn with_signer(mut self, signer: Box<dyn EventSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Extra members merged into the public key object of signed events.
    pub fn with_key_info(mut self, name: impl Into<String>, value: Value) -> Self {
        self.key_info.insert(name.into(), value);
        self
    }

    /// Stamp `tenant_id` onto every submitted event.
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Continue from a previously observed root.
    pub fn with_session(mut self, session: VerificationSession) -> Self {
        self.session = session;
        self
    }

    /// Verify signatures with `signatures` instead of the Ed25519 default.
    pub fn with_signatures(mut self, signatures: SignatureVerifier) -> Self {
        self.engine = VerificationEngine::new(signatures);
        self.rebuild_reconciler();
        self
    }

    pub fn session(&self) -> &VerificationSession {
        &self.session
    }

    /// Log options from the loaded configuration.
    pub fn log_defaults(&self) -> LogOptions {
        self.log_defaults
    }

    /// Search options from the loaded configuration.
    pub fn search_defaults(&self) -> SearchOptions {
        self.search_defaults
    }

    fn rebuild_reconciler(&mut self) {
        let reconciler = self.anchor.clone().map(|anchor| {
            let reconciler = RootReconciler::new(anchor);
            if self.fallback_to_root_lookup {
                reconciler.with_fallback(self.root_lookup.clone())
            } else {
                reconciler
            }
        });
        self.engine.set_reconciler(reconciler);
    }

    // ── Log ───────────────────────────────────────────────────────────────────

    /// Submit one event.
    ///
    /// The configured tenant overwrites `event.tenant_id`. With
    /// `sign_local`, the event is signed before submission. With `verify`,
    /// the call runs as a session cycle.
    pub fn log(&self, mut event: Event, options: &LogOptions) -> TrellisResult<LogResult> {
        if let Some(tenant_id) = &self.tenant_id {
            event.tenant_id = Some(tenant_id.clone());
        }

        let signed = if options.sign_local {
            let signer = self
                .signer
                .as_deref()
                .ok_or_else(|| TrellisError::SignatureError {
                    reason: "local signing requested but no signer is configured".to_string(),
                })?;
            Some(sign_event(signer, &event, &self.key_info)?)
        } else {
            None
        };

        // Held until the session has been advanced (or left alone).
        let mut cycle = if options.verify {
            Some(self.session.begin()?)
        } else {
            None
        };
        let prev = cycle.as_ref().and_then(|c| c.prev_root());

        let (signature, public_key) = match signed {
            Some(s) => (Some(s.signature), Some(s.public_key)),
            None => (None, None),
        };
        let request = LogRequest {
            event,
            signature,
            public_key,
            prev_root: prev.map(|head| head.root_hash),
            verbose: options.wants_verbose(),
        };

        let response = self.log_service.log(&request)?;
        let outcome = self.engine.verify_log_response(&response, prev, options)?;

        if let Some(cycle) = cycle.as_mut() {
            // Once a root is held, only a proven extension of it may replace it.
            let chained = match prev {
                Some(_) => outcome.consistency.is_pass(),
                None => !outcome.consistency.is_fail(),
            };
            match (response.unpublished_root, response.tree_size) {
                (Some(root_hash), Some(size)) if chained && !outcome.membership.is_fail() => {
                    cycle.advance(TreeHead { root_hash, size });
                }
                (Some(_), Some(size)) => warn!(
                    tree_size = size,
                    %outcome,
                    "new root not proven to extend the session root; session left unchanged"
                ),
                _ => debug!("log response carried no root; session left unchanged"),
            }
        }

        Ok(LogResult { response, outcome })
    }

    // ── Search ────────────────────────────────────────────────────────────────

    /// Search and verify the first page of results.
    ///
    /// `verify_consistency` forces a verbose search. Unset paging and
    /// ordering fields take their configured defaults.
    pub fn search(
        &self,
        mut request: SearchRequest,
        options: &SearchOptions,
    ) -> TrellisResult<SearchResult> {
        if options.verify_consistency {
            request.verbose = true;
        }
        request.limit.get_or_insert(self.search_settings.limit);
        request
            .order
            .get_or_insert_with(|| self.search_settings.order.clone());
        request
            .order_by
            .get_or_insert_with(|| self.search_settings.order_by.clone());

        let response = self.search_service.search(&request)?;
        self.verify_page(response, options)
    }

    /// Fetch and verify a further page of an earlier search.
    pub fn results(
        &self,
        id: &str,
        limit: u32,
        offset: u32,
        options: &SearchOptions,
    ) -> TrellisResult<SearchResult> {
        let request = ResultsRequest {
            id: id.to_string(),
            limit,
            offset,
        };
        let response = self.search_service.results(&request)?;
        self.verify_page(response, options)
    }

    fn verify_page(
        &self,
        mut response: SearchResponse,
        options: &SearchOptions,
    ) -> TrellisResult<SearchResult> {
        let roots = response.roots();
        let outcomes = self.engine.verify_batch(&response.events, &roots, options)?;
        for (record, outcome) in response.events.iter_mut().zip(&outcomes) {
            record.apply(outcome);
        }
        Ok(SearchResult { response, outcomes })
    }

    // ── Roots ─────────────────────────────────────────────────────────────────

    /// The service's root at `tree_size`, or its current root.
    pub fn root(&self, tree_size: Option<u64>) -> TrellisResult<Root> {
        self.root_lookup.root(&RootRequest { tree_size })
    }
}
