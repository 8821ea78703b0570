//! Text summarization.

use quartet_event::EventBus;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

const SOURCE: &str = "insight_engine";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsightResult {
    pub status: String,
    pub summary: String,
    pub patterns: Vec<String>,
    pub highlights: Vec<String>,
}

impl InsightResult {
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Produces an [`InsightResult`] from free text.
pub trait InsightEngine: Send + Sync {
    fn analyze(&self, text: Option<&str>) -> InsightResult;
}

/// Reports input presence and size only.
pub struct SummaryInsightEngine {
    bus: Arc<EventBus>,
}

impl SummaryInsightEngine {
    #[must_use]
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl InsightEngine for SummaryInsightEngine {
    fn analyze(&self, text: Option<&str>) -> InsightResult {
        let text = text.filter(|t| !t.is_empty());
        self.bus.publish(
            "insight.requested",
            json!({"has_text": text.is_some()}),
            SOURCE,
        );

        let (patterns, highlights) = match text {
            Some(t) => (
                vec!["Text input provided".to_string()],
                vec![format!("Text chars: {}", t.chars().count())],
            ),
            None => (vec!["No inputs provided".to_string()], Vec::new()),
        };
        let result = InsightResult {
            status: "ok".into(),
            summary: "Insight summary of the supplied input.".into(),
            patterns,
            highlights,
        };

        self.bus.publish(
            "insight.produced",
            json!({
                "status": result.status,
                "patterns": result.patterns.len(),
                "highlights": result.highlights.len(),
            }),
            SOURCE,
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quartet_event::Board;

    #[test]
    fn text_is_measured_in_chars() {
        let bus = Arc::new(EventBus::new());
        let board = Board::attach(&bus, "insight.*").expect("valid pattern");
        let result = SummaryInsightEngine::new(bus).analyze(Some("héllo"));
        assert_eq!(result.patterns, ["Text input provided"]);
        assert_eq!(result.highlights, ["Text chars: 5"]);
        assert_eq!(board.names(), ["insight.requested", "insight.produced"]);
        assert_eq!(board.all()[1].payload["highlights"], json!(1));
    }

    #[test]
    fn empty_text_counts_as_no_input() {
        let engine = SummaryInsightEngine::new(Arc::new(EventBus::new()));
        for text in [None, Some("")] {
            let result = engine.analyze(text);
            assert_eq!(result.patterns, ["No inputs provided"]);
            assert!(result.highlights.is_empty());
        }
    }
}
