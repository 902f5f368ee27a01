//! Analysis orchestration for one document.
//!
//! An [`AnalysisContext`] owns everything that used to be page-global: the
//! document, the surfaces discovered in it, the single pending debounce
//! timer, the text each surface had at its last pass, and the overlay. Hosts
//! feed it events ([`AnalysisContext::handle_event`]) and advance its clock
//! ([`AnalysisContext::tick`]); passes run when their timers fire.
//!
//! Surface lifecycle: a node is attached once when discovery first sees it,
//! then alternates between analyzing and idle. Nothing detaches it
//! explicitly; once the host removes the node, the next discovery or pass
//! notices and forgets it.

use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use serde::Serialize;

use crate::config::Config;
use crate::error::ApplyError;
use crate::locator::locate;
use crate::markdown::{self, InputFormat};
use crate::messaging::KeyUpdate;
use crate::overlay::{HighlightMarker, MarkerId, Overlay};
use crate::readability::{self, Band, Tier};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::surface::{ReplaceStrategy, Surface, SurfaceKind};
use crate::text::{SegmenterKind, segment_with};
use crate::tree::{Document, HostEvent, Layout, LayoutMetrics, NodeId, Point, Rect};

/// Timing and filtering knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Quiet period after the last edit before a pass runs.
    pub debounce: Duration,
    /// Delay between a successful replacement and the follow-up pass.
    pub reanalyze_delay: Duration,
    /// Quiet period after scroll or resize before a rendered document is
    /// re-laid out.
    pub scroll_debounce: Duration,
    /// Period of the discovery scan.
    pub discovery_interval: Duration,
    /// Sentence units shorter than this many characters are skipped.
    pub min_text_length: usize,
    /// Segmentation strategy.
    pub segmenter: SegmenterKind,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1200),
            reanalyze_delay: Duration::from_millis(500),
            scroll_debounce: Duration::from_millis(500),
            discovery_interval: Duration::from_millis(1500),
            min_text_length: readability::MIN_TEXT_CHARS,
            segmenter: SegmenterKind::Locale,
        }
    }
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            reanalyze_delay: Duration::from_millis(config.reanalyze_delay_ms),
            scroll_debounce: Duration::from_millis(config.scroll_debounce_ms),
            discovery_interval: Duration::from_millis(config.discovery_interval_ms),
            min_text_length: config.min_text_length,
            segmenter: config.segmenter,
        }
    }
}

/// Where a discovered surface is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceState {
    /// Discovered, never analyzed.
    Attached,
    /// A pass is running.
    Analyzing,
    /// The last pass finished.
    Idle,
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    surface: Surface,
    state: SurfaceState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Discover,
    Analyze { node: NodeId, force: bool },
}

/// Where a flagged unit ended up on the overlay.
enum Placement {
    Drawn(MarkerId),
    NotLocated,
    Invisible,
    NotHighlightable,
}

/// A sentence that scored below the easy tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedSentence {
    /// The sentence, verbatim.
    pub text: String,
    /// Reading-ease score.
    pub score: f64,
    /// Severity tier.
    pub tier: Tier,
    /// Five-way band.
    pub band: Band,
    /// The marker drawn for it; `None` for form fields, whose text cannot
    /// be highlighted, or when the sentence could not be located.
    pub marker: Option<MarkerId>,
}

/// Summary of one analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    /// Surface that was analyzed.
    pub surface: NodeId,
    /// Its kind.
    pub kind: SurfaceKind,
    /// Overlay generation the pass drew into.
    pub generation: u64,
    /// Units considered (sentences or rendered fragments).
    pub units: usize,
    /// Units shorter than the minimum length.
    pub skipped_short: usize,
    /// Units the scorer declined to score.
    pub unscored: usize,
    /// Flagged units that could not be located in the tree.
    pub locator_misses: usize,
    /// Flagged units that were located but had no visible rectangle.
    pub undrawn: usize,
    /// Flagged units in source order.
    pub flagged: Vec<FlaggedSentence>,
}

/// What kind of user-visible notice was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoticeKind {
    /// A suggestion could not be applied.
    ReplacementMiss,
}

/// A non-fatal message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Category.
    pub kind: NoticeKind,
    /// Text to show.
    pub message: String,
}

/// Result of a successful [`AnalysisContext::apply_suggestion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Surface that accepted the edit.
    pub surface: NodeId,
    /// How the text was replaced.
    pub strategy: ReplaceStrategy,
}

/// Per-document analysis state.
#[derive(Debug)]
pub struct AnalysisContext {
    doc: Document,
    settings: OrchestratorSettings,
    scheduler: Scheduler<Task>,
    surfaces: Vec<Tracked>,
    pending_analysis: Option<TimerHandle>,
    last_text: HashMap<NodeId, String>,
    overlay: Overlay,
    notices: Vec<Notice>,
    api_key: Option<String>,
    key_updates: Option<Receiver<KeyUpdate>>,
}

impl AnalysisContext {
    /// A context over `doc` with nothing discovered yet.
    pub fn new(doc: Document, settings: OrchestratorSettings) -> Self {
        Self {
            doc,
            settings,
            scheduler: Scheduler::new(),
            surfaces: Vec::new(),
            pending_analysis: None,
            last_text: HashMap::new(),
            overlay: Overlay::new(),
            notices: Vec::new(),
            api_key: None,
            key_updates: None,
        }
    }

    /// The document.
    pub const fn document(&self) -> &Document {
        &self.doc
    }

    /// The document, for host-side edits. Follow edits with an event so the
    /// context can schedule a pass.
    pub const fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// The overlay layer.
    pub const fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Current settings.
    pub const fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Current virtual time.
    pub const fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Attached surfaces with their states, in discovery order.
    pub fn surfaces(&self) -> impl Iterator<Item = (Surface, SurfaceState)> + '_ {
        self.surfaces.iter().map(|t| (t.surface, t.state))
    }

    /// State of the surface rooted at `node`.
    pub fn state_of(&self, node: NodeId) -> Option<SurfaceState> {
        self.tracked(node).map(|t| t.state)
    }

    /// Whether an analysis pass is waiting on the debounce timer.
    pub fn has_pending_analysis(&self) -> bool {
        self.pending_analysis
            .is_some_and(|h| self.scheduler.is_pending(h))
    }

    /// Drain the notices raised so far.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// The API key currently in effect.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Replace the API key in effect.
    pub fn set_api_key(&mut self, key: Option<String>) {
        self.api_key = key;
    }

    /// Follow key updates from a settings broker. Updates are applied on
    /// every [`tick`](Self::tick).
    pub fn listen(&mut self, updates: Receiver<KeyUpdate>) {
        self.key_updates = Some(updates);
    }

    /// Run discovery now and keep running it every discovery interval.
    pub fn start(&mut self) -> usize {
        let attached = self.discover();
        self.scheduler
            .schedule(self.settings.discovery_interval, Task::Discover);
        attached
    }

    fn tracked(&self, node: NodeId) -> Option<&Tracked> {
        self.surfaces.iter().find(|t| t.surface.node() == node)
    }

    fn set_state(&mut self, node: NodeId, state: SurfaceState) {
        if let Some(t) = self.surfaces.iter_mut().find(|t| t.surface.node() == node) {
            t.state = state;
        }
    }

    /// Scan the document for surfaces, attaching each new one exactly once.
    /// Surfaces whose nodes left the document are forgotten. Returns the
    /// number of newly attached surfaces.
    #[tracing::instrument(skip_all)]
    pub fn discover(&mut self) -> usize {
        self.prune_abandoned();
        let mut attached = 0;
        for node in self.doc.descendants(self.doc.root()) {
            if self.tracked(node).is_some() || self.doc.is_hidden(node) {
                continue;
            }
            let Some(surface) = Surface::detect(&self.doc, node) else {
                continue;
            };
            if self.inside_rich_text(node) {
                continue;
            }
            tracing::info!(?node, kind = ?surface.kind(), "attached surface");
            self.surfaces.push(Tracked {
                surface,
                state: SurfaceState::Attached,
            });
            attached += 1;
        }
        attached
    }

    /// Whether an ancestor of `node` is itself a rich-text surface; nested
    /// editable descendants belong to that surface.
    fn inside_rich_text(&self, node: NodeId) -> bool {
        let mut current = self.doc.parent(node);
        while let Some(n) = current {
            if Surface::detect(&self.doc, n).is_some_and(|s| s.kind() == SurfaceKind::RichText) {
                return true;
            }
            current = self.doc.parent(n);
        }
        false
    }

    fn prune_abandoned(&mut self) {
        let doc = &self.doc;
        let last_text = &mut self.last_text;
        self.surfaces.retain(|t| {
            let alive = doc.is_connected(t.surface.node());
            if !alive {
                tracing::debug!(node = ?t.surface.node(), "surface abandoned");
                last_text.remove(&t.surface.node());
            }
            alive
        });
    }

    /// Surface that owns `node`, if any.
    fn owning_surface(&self, node: NodeId) -> Option<Surface> {
        self.surfaces
            .iter()
            .map(|t| t.surface)
            .find(|s| self.doc.contains(s.node(), node))
    }

    /// React to a host event on `target`.
    pub fn handle_event(&mut self, target: NodeId, event: HostEvent) {
        match event {
            HostEvent::FocusIn | HostEvent::Click => {
                self.discover();
            }
            HostEvent::Input | HostEvent::KeyUp | HostEvent::Paste | HostEvent::Change => {
                if let Some(surface) = self.owning_surface(target) {
                    self.schedule_analysis(surface.node(), self.settings.debounce, false);
                }
            }
            HostEvent::Scroll | HostEvent::Resize => {
                let rendered = self
                    .surfaces
                    .iter()
                    .map(|t| t.surface)
                    .find(|s| s.kind() == SurfaceKind::RenderedDocument);
                if let Some(surface) = rendered {
                    self.schedule_analysis(surface.node(), self.settings.scroll_debounce, true);
                }
            }
            HostEvent::ContextMenu => {}
        }
    }

    /// Start the debounce timer for `node`, cancelling whatever pass was
    /// pending. With `force`, the pass runs even if the text is unchanged.
    pub fn schedule_analysis(&mut self, node: NodeId, delay: Duration, force: bool) {
        if let Some(handle) = self.pending_analysis.take() {
            self.scheduler.cancel(handle);
        }
        let handle = self.scheduler.schedule(delay, Task::Analyze { node, force });
        self.pending_analysis = Some(handle);
        tracing::trace!(?node, ?delay, force, "scheduled analysis");
    }

    /// Advance the clock by `delta`; see [`tick`](Self::tick).
    pub fn advance_by(&mut self, delta: Duration) -> Vec<PassReport> {
        self.tick(self.scheduler.now() + delta)
    }

    /// Advance the clock to `now`, apply key updates and run every task that
    /// became due. Returns the reports of the passes that ran.
    pub fn tick(&mut self, now: Duration) -> Vec<PassReport> {
        self.apply_key_updates();
        let mut reports = Vec::new();
        for (handle, task) in self.scheduler.advance_to(now) {
            match task {
                Task::Discover => {
                    self.discover();
                    self.scheduler
                        .schedule(self.settings.discovery_interval, Task::Discover);
                }
                Task::Analyze { node, force } => {
                    if self.pending_analysis == Some(handle) {
                        self.pending_analysis = None;
                    }
                    reports.extend(self.run_pass(node, force));
                }
            }
        }
        reports
    }

    fn apply_key_updates(&mut self) {
        let Some(rx) = &self.key_updates else {
            return;
        };
        let mut latest = None;
        while let Ok(update) = rx.try_recv() {
            latest = Some(update);
        }
        if let Some(update) = latest {
            tracing::debug!(present = update.api_key.is_some(), "API key updated");
            self.api_key = update.api_key;
        }
    }

    /// Run one analysis pass over `node` now, unless its text is what the
    /// previous pass saw. Returns `None` when nothing ran.
    pub fn analyze(&mut self, node: NodeId) -> Option<PassReport> {
        self.run_pass(node, false)
    }

    #[tracing::instrument(skip(self), fields(generation = tracing::field::Empty))]
    fn run_pass(&mut self, node: NodeId, force: bool) -> Option<PassReport> {
        let surface = self.tracked(node)?.surface;
        if !self.doc.is_connected(node) {
            self.prune_abandoned();
            return None;
        }
        let text = surface.get_text(&self.doc);
        if !force && self.last_text.get(&node) == Some(&text) {
            tracing::debug!("text unchanged since last pass");
            return None;
        }

        self.set_state(node, SurfaceState::Analyzing);
        self.overlay.clear();
        let generation = self.overlay.generation();
        tracing::Span::current().record("generation", generation);

        let mut report = PassReport {
            surface: node,
            kind: surface.kind(),
            generation,
            units: 0,
            skipped_short: 0,
            unscored: 0,
            locator_misses: 0,
            undrawn: 0,
            flagged: Vec::new(),
        };

        match surface.kind() {
            SurfaceKind::FormField => {
                for unit in segment_with(&text, self.settings.segmenter) {
                    self.consider(&mut report, &unit.text, |_, _| Placement::NotHighlightable);
                }
            }
            SurfaceKind::RichText => self.analyze_tree(&mut report, node),
            SurfaceKind::RenderedDocument => {
                let fragments = surface.fragments(&self.doc);
                if fragments.is_empty() {
                    let lines = surface.lines(&self.doc);
                    if lines.is_empty() {
                        self.analyze_tree(&mut report, node);
                    }
                    for line in lines {
                        self.analyze_tree(&mut report, line);
                    }
                } else {
                    let scroll = self.doc.scroll_offset();
                    for fragment in fragments {
                        self.consider(&mut report, &fragment.text, |overlay, tier| {
                            overlay
                                .draw(&[fragment.bounds], scroll, tier, &fragment.text)
                                .map_or(Placement::Invisible, Placement::Drawn)
                        });
                    }
                }
            }
        }

        self.last_text.insert(node, text);
        self.set_state(node, SurfaceState::Idle);
        tracing::info!(
            units = report.units,
            flagged = report.flagged.len(),
            markers = self.overlay.len(),
            misses = report.locator_misses,
            "analysis pass complete"
        );
        Some(report)
    }

    /// Segment the text under `root`, then locate and draw each flagged unit.
    fn analyze_tree(&mut self, report: &mut PassReport, root: NodeId) {
        let text = self.doc.inner_text(root);
        let doc = &self.doc;
        let scroll = doc.scroll_offset();
        for unit in segment_with(&text, self.settings.segmenter) {
            Self::consider_in(
                &self.settings,
                &mut self.overlay,
                report,
                &unit.text,
                |overlay, tier| {
                    let Some(range) = locate(doc, root, &unit.text) else {
                        return Placement::NotLocated;
                    };
                    let rects: Vec<Rect> = doc.client_rects(range.node, range.start..range.end);
                    overlay
                        .draw(&rects, scroll, tier, &unit.text)
                        .map_or(Placement::Invisible, Placement::Drawn)
                },
            );
        }
    }

    fn consider<F>(&mut self, report: &mut PassReport, text: &str, draw: F)
    where
        F: FnOnce(&mut Overlay, Tier) -> Placement,
    {
        Self::consider_in(&self.settings, &mut self.overlay, report, text, draw);
    }

    /// Score one unit and, if it is not easy, draw it.
    fn consider_in<F>(
        settings: &OrchestratorSettings,
        overlay: &mut Overlay,
        report: &mut PassReport,
        text: &str,
        draw: F,
    ) where
        F: FnOnce(&mut Overlay, Tier) -> Placement,
    {
        report.units += 1;
        if text.chars().count() < settings.min_text_length {
            report.skipped_short += 1;
            return;
        }
        let Some(result) = readability::score(text) else {
            report.unscored += 1;
            return;
        };
        if result.tier == Tier::Easy {
            return;
        }
        let marker = match draw(overlay, result.tier) {
            Placement::Drawn(id) => Some(id),
            Placement::NotLocated => {
                tracing::debug!(sentence = text, "flagged sentence not located");
                report.locator_misses += 1;
                None
            }
            Placement::Invisible => {
                tracing::debug!(sentence = text, "flagged sentence has no visible rectangle");
                report.undrawn += 1;
                None
            }
            Placement::NotHighlightable => None,
        };
        tracing::debug!(score = result.score, tier = %result.tier, "flagged sentence");
        report.flagged.push(FlaggedSentence {
            text: text.to_string(),
            score: result.score,
            tier: result.tier,
            band: result.band,
            marker,
        });
    }

    /// The marker under a viewport point, as a click or secondary click
    /// would hit it.
    pub fn activate(&self, viewport_point: Point) -> Option<&HighlightMarker> {
        let scroll = self.doc.scroll_offset();
        self.overlay
            .hit_test(Point::new(viewport_point.x + scroll.x, viewport_point.y + scroll.y))
    }

    /// Replace `old` with `new` in the first surface that contains it.
    ///
    /// The focused editable element is tried first, then every attached
    /// surface in discovery order. On success a forced pass over the edited
    /// surface is scheduled after the re-analysis delay. On failure a
    /// notice asks the user to refocus the editor.
    #[tracing::instrument(skip_all, fields(old_len = old.len(), new_len = new.len()))]
    pub fn apply_suggestion(&mut self, old: &str, new: &str) -> Result<ApplyOutcome, ApplyError> {
        if old.is_empty() || new.is_empty() {
            return Err(ApplyError::EmptyReplacement);
        }

        let mut candidates: Vec<Surface> = Vec::new();
        if let Some(active) = self.doc.active_element() {
            let focused = Surface::detect(&self.doc, active)
                .filter(|s| s.kind().is_editable())
                .or_else(|| self.owning_surface(active));
            candidates.extend(focused);
        }
        for t in &self.surfaces {
            if !candidates.contains(&t.surface) {
                candidates.push(t.surface);
            }
        }

        for surface in candidates {
            match surface.set_text(&mut self.doc, old, new) {
                Ok(strategy) => {
                    if self.tracked(surface.node()).is_none() {
                        self.surfaces.push(Tracked {
                            surface,
                            state: SurfaceState::Attached,
                        });
                    }
                    self.schedule_analysis(surface.node(), self.settings.reanalyze_delay, true);
                    tracing::info!(node = ?surface.node(), ?strategy, "applied suggestion");
                    return Ok(ApplyOutcome {
                        surface: surface.node(),
                        strategy,
                    });
                }
                Err(e) => tracing::debug!(node = ?surface.node(), error = %e, "surface rejected edit"),
            }
        }

        let error = ApplyError::NotFound;
        tracing::warn!("{error}");
        self.notices.push(Notice {
            kind: NoticeKind::ReplacementMiss,
            message: error.to_string(),
        });
        Err(error)
    }
}

/// Load `text` into a fresh document holding one rich-text editor, attach
/// it and run a single pass. Returns the context, so callers can inspect
/// its overlay, together with the editor node and the pass report.
pub fn analyze_text(
    text: &str,
    format: InputFormat,
    metrics: LayoutMetrics,
    settings: OrchestratorSettings,
) -> (AnalysisContext, NodeId, Option<PassReport>) {
    let (doc, editor) = markdown::rich_text(text, format, metrics);
    let mut ctx = AnalysisContext::new(doc, settings);
    ctx.discover();
    let report = ctx.analyze(editor);
    (ctx, editor, report)
}
