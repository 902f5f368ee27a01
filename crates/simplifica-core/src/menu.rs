//! State of the suggestion panel.
//!
//! Opening the panel bumps a generation counter. A response is rendered
//! only if it belongs to the current generation; anything older was asked
//! for by a panel the user has since re-opened, and is dropped on arrival.
//! Requests are never aborted.

use serde::Serialize;

use crate::error::{SuggestError, SuggestResult};
use crate::readability::{self, ReadabilityResult};
use crate::suggest::{ScoredSuggestion, score_suggestions};
use crate::tree::Point;

/// Panel width in CSS pixels.
pub const PANEL_WIDTH: f64 = 360.0;
/// Panel height in CSS pixels.
pub const PANEL_HEIGHT: f64 = 300.0;
/// Gap kept between a clamped panel and the viewport edge.
pub const PANEL_MARGIN: f64 = 10.0;

/// Shown instead of a request when no key is configured.
pub const MISSING_KEY_MESSAGE: &str = "API Key não configurada. Clique no ícone da extensão.";
/// Shown while a request is in flight.
pub const LOADING_MESSAGE: &str = "Consultando IA...";
/// Shown when the model returned nothing usable.
pub const EMPTY_MESSAGE: &str = "Nenhuma sugestão";

/// The visible part of the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
    /// Scroll offset.
    pub scroll: Point,
}

/// Keep a panel anchored at `anchor` (page coordinates) inside the
/// viewport: when it would overflow the right or bottom edge, it is pulled
/// back to sit [`PANEL_MARGIN`] inside that edge.
pub fn clamp_position(anchor: Point, viewport: Viewport) -> Point {
    let right = viewport.width + viewport.scroll.x;
    let bottom = viewport.height + viewport.scroll.y;
    let x = if anchor.x + PANEL_WIDTH > right {
        right - PANEL_WIDTH - PANEL_MARGIN
    } else {
        anchor.x
    };
    let y = if anchor.y + PANEL_HEIGHT > bottom {
        bottom - PANEL_HEIGHT - PANEL_MARGIN
    } else {
        anchor.y
    };
    Point::new(x, y)
}

/// What the panel body shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum PanelContent {
    /// Nothing opened yet.
    Closed,
    /// No key configured; no request was made.
    MissingKey,
    /// Waiting for the response.
    Loading,
    /// Rewrites, each with its own score.
    Suggestions {
        /// The rewrites.
        items: Vec<ScoredSuggestion>,
    },
    /// The response held no usable rewrite.
    Empty,
    /// The request failed.
    Error {
        /// Error text for the user.
        message: String,
    },
}

impl PanelContent {
    /// Body for the outcome of a suggestion request.
    pub fn from_result(result: SuggestResult<Vec<String>>) -> Self {
        match result {
            Ok(items) if items.is_empty() => Self::Empty,
            Ok(items) => Self::Suggestions {
                items: score_suggestions(items),
            },
            Err(SuggestError::MissingCredential) => Self::MissingKey,
            Err(e) => Self::Error {
                message: format!("Erro: {e}"),
            },
        }
    }

    /// Text to show for states without structured content.
    pub const fn message(&self) -> Option<&'static str> {
        match self {
            Self::MissingKey => Some(MISSING_KEY_MESSAGE),
            Self::Loading => Some(LOADING_MESSAGE),
            Self::Empty => Some(EMPTY_MESSAGE),
            Self::Closed | Self::Suggestions { .. } | Self::Error { .. } => None,
        }
    }
}

/// A request the host should send on the panel's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRequest {
    /// Generation to deliver the result to.
    pub generation: u64,
    /// Sentence to rewrite.
    pub sentence: String,
}

/// The suggestion panel.
#[derive(Debug, Clone)]
pub struct SuggestionPanel {
    visible: bool,
    position: Point,
    sentence: String,
    original: Option<ReadabilityResult>,
    content: PanelContent,
    generation: u64,
}

impl Default for SuggestionPanel {
    fn default() -> Self {
        Self {
            visible: false,
            position: Point::default(),
            sentence: String::new(),
            original: None,
            content: PanelContent::Closed,
            generation: 0,
        }
    }
}

impl SuggestionPanel {
    /// A hidden, empty panel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the panel for `sentence` at `anchor`.
    ///
    /// Without a usable key the panel shows the missing-key message and no
    /// request is returned. Otherwise it shows the loading state and returns
    /// the request to send.
    pub fn open(
        &mut self,
        sentence: &str,
        anchor: Point,
        viewport: Viewport,
        api_key: Option<&str>,
    ) -> Option<PanelRequest> {
        self.generation += 1;
        self.visible = true;
        self.position = clamp_position(anchor, viewport);
        self.sentence = sentence.to_string();
        self.original = readability::score(sentence);

        if api_key.is_none_or(|k| k.trim().is_empty()) {
            self.content = PanelContent::MissingKey;
            return None;
        }
        self.content = PanelContent::Loading;
        Some(PanelRequest {
            generation: self.generation,
            sentence: self.sentence.clone(),
        })
    }

    /// Render the result of request `generation`. Returns `false`, leaving
    /// the panel untouched, when a newer request has superseded it.
    pub fn deliver(&mut self, generation: u64, result: SuggestResult<Vec<String>>) -> bool {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "discarded stale suggestions");
            return false;
        }
        self.content = PanelContent::from_result(result);
        true
    }

    /// Hide the panel. A response still in flight renders into it unseen.
    pub fn dismiss(&mut self) {
        self.visible = false;
    }

    /// Whether the panel is showing.
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Top-left corner in page coordinates.
    pub const fn position(&self) -> Point {
        self.position
    }

    /// The sentence the panel was opened for.
    pub fn sentence(&self) -> &str {
        &self.sentence
    }

    /// Score of that sentence.
    pub const fn original_score(&self) -> Option<&ReadabilityResult> {
        self.original.as_ref()
    }

    /// Current body.
    pub const fn content(&self) -> &PanelContent {
        &self.content
    }

    /// Generation of the latest open.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Text of the `index`-th rewrite, for applying it.
    pub fn choice(&self, index: usize) -> Option<&str> {
        match &self.content {
            PanelContent::Suggestions { items } => items.get(index).map(|s| s.text.as_str()),
            _ => None,
        }
    }
}
