use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::assembler::AssembledText;
use super::capability::{CapabilityError, EvaluationCapability, PromptTemplate, PromptVariables};
use super::rubric::Rubric;

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+(?:\.\d+)?\s*(?:-|–|to)\s*\d+(?:\.\d+)?\s*/\s*10\b").expect("valid regex")
});
static OUT_OF_TEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*/\s*10\b").expect("valid regex"));
static LABELLED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)score\s*(?:of|is|:|=)?\s*(\d+(?:\.\d+)?)").expect("valid regex")
});
static SCORE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[^0-9]*?\d+(?:\.\d+)?\s*/\s*10\b[\s\-–—:.,;)*]*").expect("valid regex")
});
static JUSTIFICATION_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[*_\s]*justification[*_\s]*:[*_\s]*").expect("valid regex")
});

/// Output of a single pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage_name: String,
    pub raw_output: String,
    /// Best-effort score in [1, 10]; `None` when the output did not carry exactly one.
    pub numeric_score: Option<f64>,
    pub justification: String,
}

impl StageResult {
    pub fn from_output(stage_name: &str, raw_output: String) -> Self {
        let numeric_score = extract_score(&raw_output);
        let justification = extract_justification(&raw_output);
        Self {
            stage_name: stage_name.to_string(),
            raw_output,
            numeric_score,
            justification,
        }
    }
}

/// Stage-level failure. Always fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("{stage} stage failed: {source}")]
    Capability {
        stage: String,
        #[source]
        source: CapabilityError,
    },
    #[error("{stage} stage produced a malformed response: {reason}")]
    Malformed { stage: String, reason: String },
    #[error("{stage} stage output carries no usable score")]
    MissingScore { stage: String },
    #[error("{stage} stage is missing the output of its {dependency} dependency")]
    MissingInput { stage: String, dependency: String },
}

/// Scores the assembled CV against one rubric through the injected capability.
pub struct ScoringStage {
    rubric: Rubric,
    prompt: PromptTemplate,
    variables: PromptVariables,
    capability: Arc<dyn EvaluationCapability>,
}

impl ScoringStage {
    pub fn new(rubric: Rubric, capability: Arc<dyn EvaluationCapability>) -> Self {
        let prompt = rubric.prompt();
        Self {
            rubric,
            prompt,
            variables: PromptVariables::new(),
            capability,
        }
    }

    /// Adds a fixed prompt variable (e.g. the `as_of` reference date).
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.rubric.stage_name
    }

    pub async fn evaluate(&self, text: &AssembledText) -> Result<StageResult, StageError> {
        let mut variables = self.variables.clone();
        variables.insert("cv_text".to_string(), text.as_str().to_string());

        let raw_output = self
            .capability
            .respond(&self.prompt, &variables)
            .await
            .map_err(|source| StageError::Capability {
                stage: self.name().to_string(),
                source,
            })?;

        if raw_output.trim().is_empty() {
            return Err(StageError::Malformed {
                stage: self.name().to_string(),
                reason: "empty response".to_string(),
            });
        }

        let result = StageResult::from_output(self.name(), raw_output);
        match result.numeric_score {
            Some(score) => debug!(
                stage = self.name(),
                score,
                tier = self.rubric.tier_for(score).map(|tier| tier.label.as_str()),
                "stage scored"
            ),
            None => warn!(stage = self.name(), "stage output carries no single score"),
        }

        Ok(result)
    }
}

/// Extracts exactly one score in [1, 10] from free text.
///
/// `N/10` mentions win over `Score: N` mentions. Ranges, several distinct values or
/// out-of-scale values yield `None`.
pub fn extract_score(raw: &str) -> Option<f64> {
    if RANGE_RE.is_match(raw) {
        return None;
    }

    let mut values = capture_values(&OUT_OF_TEN_RE, raw);
    if values.is_empty() {
        values = capture_values(&LABELLED_RE, raw);
    }

    values.dedup_by(|a, b| a == b);
    let first = *values.first()?;
    if values.iter().any(|value| *value != first) {
        return None;
    }

    (1.0..=10.0).contains(&first).then_some(first)
}

fn capture_values(pattern: &Regex, raw: &str) -> Vec<f64> {
    pattern
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .filter_map(|value| value.as_str().parse::<f64>().ok())
        .collect()
}

/// Non-score prose of a stage output, collapsed onto one line.
pub fn extract_justification(raw: &str) -> String {
    let prose = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let without_score = SCORE_PREFIX_RE.replace(line, "");
            JUSTIFICATION_LABEL_RE
                .replace(without_score.trim(), "")
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if prose.is_empty() {
        raw.trim().to_string()
    } else {
        prose
    }
}
