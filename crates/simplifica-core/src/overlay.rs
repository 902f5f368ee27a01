//! Highlight overlay: positioned markers over hard-to-read sentences.
//!
//! Markers live in page coordinates (client rectangle plus scroll offset),
//! so they stay put when the page scrolls. There is no incremental
//! update: every analysis pass starts with [`Overlay::clear`] and redraws
//! from scratch, and the generation counter makes that observable.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::readability::Tier;
use crate::tree::{Point, Rect};

/// Rectangles thinner than this (in either dimension) are not drawn.
pub const MIN_RECT_EXTENT: f64 = 0.5;

/// Unique identifier of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct MarkerId(Uuid);

impl MarkerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sai-{}", self.0.simple())
    }
}

/// One highlighted sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HighlightMarker {
    /// Marker identifier.
    pub id: MarkerId,
    /// The sentence, verbatim. Used later to look the text up for replacement.
    pub text: String,
    /// Severity used for styling.
    pub tier: Tier,
    /// Page-coordinate boxes, one per visual line.
    pub boxes: Vec<Rect>,
}

impl HighlightMarker {
    /// Whether any of the marker's boxes contains `point` (page coordinates).
    pub fn contains(&self, point: Point) -> bool {
        self.boxes.iter().any(|b| b.contains(point))
    }
}

/// The single overlay layer of a document.
#[derive(Debug, Default, Clone)]
pub struct Overlay {
    markers: Vec<HighlightMarker>,
    generation: u64,
}

impl Overlay {
    /// An empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every marker and start a new generation.
    pub fn clear(&mut self) {
        if !self.markers.is_empty() {
            tracing::trace!(removed = self.markers.len(), "cleared overlay");
        }
        self.markers.clear();
        self.generation += 1;
    }

    /// Draw a marker from viewport rectangles.
    ///
    /// Degenerate rectangles are dropped; when none remain, nothing is drawn
    /// and `None` is returned.
    pub fn draw(&mut self, rects: &[Rect], scroll: Point, tier: Tier, text: &str) -> Option<MarkerId> {
        let boxes: Vec<Rect> = rects
            .iter()
            .filter(|r| r.width >= MIN_RECT_EXTENT && r.height >= MIN_RECT_EXTENT)
            .map(|r| r.translate(scroll))
            .collect();
        if boxes.is_empty() {
            tracing::debug!(%tier, "no visible rectangles, marker skipped");
            return None;
        }
        let id = MarkerId::new();
        self.markers.push(HighlightMarker {
            id,
            text: text.to_string(),
            tier,
            boxes,
        });
        Some(id)
    }

    /// Current markers in draw order.
    pub fn markers(&self) -> &[HighlightMarker] {
        &self.markers
    }

    /// Look a marker up by id.
    pub fn marker(&self, id: MarkerId) -> Option<&HighlightMarker> {
        self.markers.iter().find(|m| m.id == id)
    }

    /// The topmost marker under `point` (page coordinates). Later markers
    /// are drawn over earlier ones.
    pub fn hit_test(&self, point: Point) -> Option<&HighlightMarker> {
        self.markers.iter().rev().find(|m| m.contains(point))
    }

    /// Number of `clear` calls so far.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of markers.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether there are no markers.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
