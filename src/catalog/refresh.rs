//! Cooperative catalog refresh: a single in-flight session advanced one step
//! per frame by [`advance_model_refresh`], probing bundles in small chunks so
//! a large model directory never stalls the frame loop.

use super::{ModelBundleInfo, ModelCatalog, ModelDirectory, ModelInfo};
use crate::bundle::BundleCache;
use bevy::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Prefab probes performed per frame before yielding with a progress message.
pub const PROBE_CHUNK_SIZE: usize = 10;

#[derive(Message, Debug, Clone, Copy)]
pub struct RefreshStarted;

#[derive(Message, Debug, Clone)]
pub struct RefreshProgress {
    pub message: String,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct RefreshCompleted;

/// Cloneable handle that resolves when its session finishes or is superseded.
#[derive(Debug, Clone)]
pub struct RefreshCompletion {
    finished: Arc<AtomicBool>,
}

impl RefreshCompletion {
    fn pending() -> Self {
        Self {
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    fn resolved() -> Self {
        Self {
            finished: Arc::new(AtomicBool::new(true)),
        }
    }

    fn fulfill(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
enum RefreshPhase {
    Rescan,
    WarmPriority,
    ProbePriority,
    Probe,
    FinalYield,
}

#[derive(Debug)]
pub struct RefreshSession {
    priority_model_id: Option<String>,
    phase: RefreshPhase,
    started_emitted: bool,
    cancel: CancelToken,
    completion: RefreshCompletion,
    pairs: Vec<(usize, usize)>,
    priority_pair: Option<(usize, usize)>,
    probe_cursor: usize,
    valid: Vec<(usize, usize)>,
}

impl RefreshSession {
    fn new(priority_model_id: Option<String>) -> Self {
        Self {
            priority_model_id,
            phase: RefreshPhase::Rescan,
            started_emitted: false,
            cancel: CancelToken::new(),
            completion: RefreshCompletion::pending(),
            pairs: Vec::new(),
            priority_pair: None,
            probe_cursor: 0,
            valid: Vec::new(),
        }
    }
}

/// Refresh state machine resource. At most one live session; requesting a new
/// refresh supersedes the old one immediately, and the step system settles
/// superseded sessions before the replacement emits its start event.
#[derive(Resource, Debug, Default)]
pub struct ModelRefresh {
    session: Option<RefreshSession>,
    superseded: Vec<RefreshCompletion>,
}

impl ModelRefresh {
    /// Starts a refresh, cancelling any in-flight session. The returned
    /// handle resolves once the new session settles (or is itself
    /// superseded).
    pub fn refresh_model_list(&mut self, priority_model_id: Option<String>) -> RefreshCompletion {
        if let Some(previous) = self.session.take() {
            previous.cancel.cancel();
            self.superseded.push(previous.completion);
        }
        let session = RefreshSession::new(priority_model_id);
        let completion = session.completion.clone();
        self.session = Some(session);
        completion
    }

    pub fn is_refreshing(&self) -> bool {
        self.session.is_some()
    }

    /// Handle for the current session, or an already-resolved handle when no
    /// refresh is running.
    pub fn completion_handle(&self) -> RefreshCompletion {
        match &self.session {
            Some(session) => session.completion.clone(),
            None => RefreshCompletion::resolved(),
        }
    }

    pub fn cancel_token(&self) -> Option<CancelToken> {
        self.session.as_ref().map(|session| session.cancel.clone())
    }

    /// Requests cancellation of the current session without starting a new
    /// one. The session still runs its finalization on the next step.
    pub fn cancel_refresh(&self) {
        if let Some(session) = &self.session {
            session.cancel.cancel();
        }
    }
}

/// Advances the active refresh session by one yield-unit per frame.
pub fn advance_model_refresh(
    mut refresh: ResMut<ModelRefresh>,
    mut catalog: ResMut<ModelCatalog>,
    directory: Res<ModelDirectory>,
    mut bundles: ResMut<BundleCache>,
    mut started: MessageWriter<RefreshStarted>,
    mut progress: MessageWriter<RefreshProgress>,
    mut completed: MessageWriter<RefreshCompleted>,
) {
    // Superseded sessions settle first so their completion events always
    // precede the replacement's start event.
    for completion in refresh.superseded.drain(..) {
        completion.fulfill();
        completed.write(RefreshCompleted);
    }

    let Some(mut session) = refresh.session.take() else {
        return;
    };
    if session.cancel.is_cancelled() {
        session.completion.fulfill();
        completed.write(RefreshCompleted);
        return;
    }
    if !session.started_emitted {
        session.started_emitted = true;
        started.write(RefreshStarted);
    }

    match session.phase {
        RefreshPhase::Rescan => {
            bundles.unload_all(false);
            catalog.rescan(&directory.root);
            session.pairs = catalog.model_pairs();
            session.priority_pair = session
                .priority_model_id
                .as_deref()
                .and_then(|id| catalog.find_model(id));
            session.phase = match session.priority_pair {
                Some(_) => RefreshPhase::WarmPriority,
                None => RefreshPhase::Probe,
            };
        }
        RefreshPhase::WarmPriority => {
            if let Some((bundle, model)) = priority_model(&catalog, &session) {
                let bundle = bundle.clone();
                progress.write(RefreshProgress {
                    message: format!("Loading priority model: {}", model.name),
                });
                bundles.get_or_load(&bundle, false);
            }
            session.phase = RefreshPhase::ProbePriority;
        }
        RefreshPhase::ProbePriority => {
            if let Some(pair) = session.priority_pair {
                if let Some((bundle, model)) = catalog.model(pair) {
                    let bundle = bundle.clone();
                    let model = model.clone();
                    if bundles.check_prefab_exists(&bundle, &model) {
                        session.valid.push(pair);
                    } else {
                        warn!("priority model '{}' has no loadable prefab", model.id);
                    }
                }
            }
            session.phase = RefreshPhase::Probe;
        }
        RefreshPhase::Probe => {
            let total = session.pairs.len();
            let chunk_end = (session.probe_cursor + PROBE_CHUNK_SIZE).min(total);
            for pair_index in session.probe_cursor..chunk_end {
                let pair = session.pairs[pair_index];
                // The priority pair was already probed ahead of the sweep.
                if session.priority_pair == Some(pair) {
                    continue;
                }
                let Some((bundle, model)) = catalog.model(pair) else {
                    continue;
                };
                let bundle = bundle.clone();
                let model = model.clone();
                if bundles.check_prefab_exists(&bundle, &model) {
                    session.valid.push(pair);
                }
            }
            session.probe_cursor = chunk_end;
            progress.write(RefreshProgress {
                message: format!("Loading... ({}/{})", session.probe_cursor, total),
            });
            if session.probe_cursor >= total {
                apply_probe_results(&mut catalog, &session.valid);
                session.phase = RefreshPhase::FinalYield;
            }
        }
        RefreshPhase::FinalYield => {
            session.completion.fulfill();
            completed.write(RefreshCompleted);
            return;
        }
    }
    refresh.session = Some(session);
}

fn priority_model<'a>(
    catalog: &'a ModelCatalog,
    session: &RefreshSession,
) -> Option<(&'a ModelBundleInfo, &'a ModelInfo)> {
    let id = session.priority_model_id.as_deref()?;
    catalog.model(catalog.find_model(id)?)
}

/// Rewrites the catalog keeping only models whose prefab probe succeeded.
fn apply_probe_results(catalog: &mut ModelCatalog, valid: &[(usize, usize)]) {
    let filtered = catalog
        .bundles
        .iter()
        .enumerate()
        .map(|(bundle_index, bundle)| {
            let kept = bundle
                .models
                .iter()
                .enumerate()
                .filter(|(model_index, _)| valid.contains(&(bundle_index, *model_index)))
                .map(|(_, model)| model.clone())
                .collect();
            bundle.filtered_copy(kept)
        })
        .filter(|bundle| !bundle.models.is_empty())
        .collect();
    catalog.bundles = filtered;
}
