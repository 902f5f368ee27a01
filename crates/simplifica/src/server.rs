//! MCP (Model Context Protocol) server implementation.
//!
//! Exposes scoring, segmentation, highlighting and suggestions over the MCP
//! protocol via stdio transport.
//!
//! # Architecture
//!
//! The MCP server is a presentation layer: it wraps the same core library
//! the CLI commands use. Each `#[tool]` method delegates to core library
//! functions rather than implementing business logic directly.

use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use serde::Serialize;

use simplifica_core::config::Config;
use simplifica_core::markdown::{InputFormat, form_field_from_text, strip_to_prose};
use simplifica_core::orchestrator::{AnalysisContext, OrchestratorSettings, analyze_text};
use simplifica_core::readability;
use simplifica_core::suggest::{SuggestionClient, parse_suggestions, score_suggestions};
use simplifica_core::text::{SegmenterKind, segment_with};
use simplifica_core::tree::LayoutMetrics;

use crate::commands::key::resolve_api_key;

/// Parameters for the `get_info` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct GetInfoParams {
    /// Output format: "text" or "json"
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "text".to_string()
}

/// Parameters for the `score_readability` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ScoreReadabilityParams {
    /// The Portuguese text to score.
    pub text: String,
    /// Whether to strip markdown formatting before scoring.
    #[serde(default)]
    pub strip_markdown: bool,
}

/// Parameters for the `segment_sentences` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SegmentSentencesParams {
    /// The text to segment.
    pub text: String,
    /// Strategy: "locale" (default) or "simple".
    pub segmenter: Option<SegmenterKind>,
}

/// Parameters for the `highlight_text` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct HighlightTextParams {
    /// The text to analyze.
    pub text: String,
    /// Treat the text as markdown.
    #[serde(default)]
    pub markdown: bool,
    /// Characters per line when laying the text out (default 80).
    pub width: Option<usize>,
}

/// Parameters for the `apply_suggestion` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ApplySuggestionParams {
    /// The full text to edit.
    pub text: String,
    /// Sentence to replace, verbatim.
    pub old: String,
    /// Replacement sentence.
    pub new: String,
}

/// Parameters for the `parse_suggestions` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ParseSuggestionsParams {
    /// Raw model output: a JSON array, a fenced block, quoted lines or plain lines.
    pub content: String,
}

/// Parameters for the `suggest_rewrites` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SuggestRewritesParams {
    /// The sentence to rewrite.
    pub sentence: String,
}

#[derive(Serialize)]
struct HighlightOutput<'a> {
    units: usize,
    flagged: &'a [simplifica_core::orchestrator::FlaggedSentence],
    markers: &'a [simplifica_core::overlay::HighlightMarker],
}

fn to_json<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("serialization error: {e}"), None))
}

/// MCP server exposing simplifica to AI assistants.
#[derive(Clone)]
pub struct ProjectServer {
    tool_router: rmcp::handler::server::router::tool::ToolRouter<Self>,
    config: Config,
    max_input_bytes: Option<usize>,
}

impl Default for ProjectServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_router]
impl ProjectServer {
    /// Create a server with default configuration.
    pub fn new() -> Self {
        let config = Config::default();
        let limit = config.input_limit();
        Self::with_config(config, limit)
    }

    /// Create a server using `config`, rejecting text larger than
    /// `max_input_bytes`.
    pub fn with_config(config: Config, max_input_bytes: Option<usize>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            config,
            max_input_bytes,
        }
    }

    fn check_size(&self, text: &str) -> Result<(), McpError> {
        match self.max_input_bytes {
            Some(max) if text.len() > max => Err(McpError::invalid_params(
                format!("input too large: {} bytes (limit: {max} bytes)", text.len()),
                None,
            )),
            _ => Ok(()),
        }
    }

    /// Get project information.
    #[tool(description = "Get project name, version, and description")]
    #[tracing::instrument(skip(self), fields(otel.kind = "server"))]
    fn get_info(
        &self,
        Parameters(params): Parameters<GetInfoParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = "get_info", format = %params.format, "executing MCP tool");

        let info = serde_json::json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION"),
        });

        let text = if params.format == "json" {
            to_json(&info)?
        } else {
            format!(
                "{} v{}\n{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                env!("CARGO_PKG_DESCRIPTION"),
            )
        };

        tracing::info!(tool = "get_info", "MCP tool completed");
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// Score readability with the Portuguese Flesch formula.
    #[tool(
        description = "Score the readability of Portuguese text (Flesch reading ease, 0-100, higher is easier). Returns null when the text is too short."
    )]
    #[tracing::instrument(skip(self, params), fields(otel.kind = "server"))]
    fn score_readability(
        &self,
        Parameters(params): Parameters<ScoreReadabilityParams>,
    ) -> Result<CallToolResult, McpError> {
        self.check_size(&params.text)?;
        let text = if params.strip_markdown {
            strip_to_prose(&params.text)
        } else {
            params.text
        };
        let result = readability::score(&text);
        tracing::info!(
            tool = "score_readability",
            score = result.as_ref().map(|r| r.score),
            "MCP tool completed"
        );
        Ok(CallToolResult::success(vec![Content::text(to_json(&result)?)]))
    }

    /// Split text into sentence units.
    #[tool(description = "Split Portuguese text into sentences with byte offsets.")]
    #[tracing::instrument(skip(self, params), fields(otel.kind = "server"))]
    fn segment_sentences(
        &self,
        Parameters(params): Parameters<SegmentSentencesParams>,
    ) -> Result<CallToolResult, McpError> {
        self.check_size(&params.text)?;
        let kind = params.segmenter.unwrap_or(self.config.segmenter);
        let units = segment_with(&params.text, kind);
        tracing::info!(tool = "segment_sentences", units = units.len(), "MCP tool completed");
        Ok(CallToolResult::success(vec![Content::text(to_json(&units)?)]))
    }

    /// Run one analysis pass and report flagged sentences with their boxes.
    #[tool(
        description = "Find the hard-to-read sentences in a text. Returns each flagged sentence with its score, tier and highlight boxes."
    )]
    #[tracing::instrument(skip(self, params), fields(otel.kind = "server"))]
    fn highlight_text(
        &self,
        Parameters(params): Parameters<HighlightTextParams>,
    ) -> Result<CallToolResult, McpError> {
        self.check_size(&params.text)?;
        let format = if params.markdown {
            InputFormat::Markdown
        } else {
            InputFormat::Plain
        };
        let metrics = LayoutMetrics {
            wrap_columns: params.width.unwrap_or(80).max(1),
            ..LayoutMetrics::default()
        };
        let (ctx, _, report) = analyze_text(
            &params.text,
            format,
            metrics,
            OrchestratorSettings::from(&self.config),
        );
        let report = report
            .ok_or_else(|| McpError::internal_error("no analysis pass ran", None))?;
        let output = HighlightOutput {
            units: report.units,
            flagged: &report.flagged,
            markers: ctx.overlay().markers(),
        };
        tracing::info!(
            tool = "highlight_text",
            flagged = report.flagged.len(),
            "MCP tool completed"
        );
        Ok(CallToolResult::success(vec![Content::text(to_json(&output)?)]))
    }

    /// Replace a sentence in a text.
    #[tool(description = "Replace the first occurrence of a sentence in a text and return the edited text.")]
    #[tracing::instrument(skip(self, params), fields(otel.kind = "server"))]
    fn apply_suggestion(
        &self,
        Parameters(params): Parameters<ApplySuggestionParams>,
    ) -> Result<CallToolResult, McpError> {
        self.check_size(&params.text)?;
        let (doc, field) = form_field_from_text(&params.text, LayoutMetrics::default());
        let mut ctx = AnalysisContext::new(doc, OrchestratorSettings::from(&self.config));
        ctx.discover();
        ctx.apply_suggestion(&params.old, &params.new)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        let edited = ctx.document().value(field).unwrap_or_default().to_string();
        tracing::info!(tool = "apply_suggestion", "MCP tool completed");
        Ok(CallToolResult::success(vec![Content::text(edited)]))
    }

    /// Parse raw model output into scored rewrites.
    #[tool(
        description = "Parse a language model's rewrite suggestions (JSON array, fenced block or lines) and score each one."
    )]
    #[tracing::instrument(skip(self, params), fields(otel.kind = "server"))]
    fn parse_suggestions(
        &self,
        Parameters(params): Parameters<ParseSuggestionsParams>,
    ) -> Result<CallToolResult, McpError> {
        let scored = score_suggestions(parse_suggestions(&params.content));
        tracing::info!(tool = "parse_suggestions", count = scored.len(), "MCP tool completed");
        Ok(CallToolResult::success(vec![Content::text(to_json(&scored)?)]))
    }

    /// Ask the configured model for rewrites.
    #[tool(
        description = "Ask the configured language model for up to three simpler rewrites of a Portuguese sentence. Requires an API key."
    )]
    #[tracing::instrument(skip(self, params), fields(otel.kind = "server"))]
    async fn suggest_rewrites(
        &self,
        Parameters(params): Parameters<SuggestRewritesParams>,
    ) -> Result<CallToolResult, McpError> {
        self.check_size(&params.sentence)?;
        let api_key = resolve_api_key(&self.config)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let client = SuggestionClient::new(&self.config)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let suggestions = client
            .suggest(api_key.as_deref(), &params.sentence)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let scored = score_suggestions(suggestions);
        tracing::info!(tool = "suggest_rewrites", count = scored.len(), "MCP tool completed");
        Ok(CallToolResult::success(vec![Content::text(to_json(&scored)?)]))
    }
}

#[tool_handler]
impl ServerHandler for ProjectServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(format!(
                "{} MCP server. Scores Portuguese text for readability, flags hard sentences and suggests simpler rewrites.",
                env!("CARGO_PKG_NAME"),
            )),
        }
    }
}
