use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::capability::{EvaluationCapability, PromptTemplate, PromptVariables};
use super::stage::{StageError, StageResult};

pub const CREDENTIALS_WEIGHT: f64 = 0.6;
pub const IMPORTANCE_WEIGHT: f64 = 0.4;
const MAX_JUSTIFICATION_LINES: usize = 3;
const STAGE_NAME: &str = "synthesis";
const SNAP_SCALE: f64 = 1_000_000.0;

/// Categorical recommendation derived from the weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Strong,
    Moderate,
    Weak,
}

impl Rating {
    /// `> 7` is Strong, `[5, 7]` is Moderate, `< 5` is Weak.
    ///
    /// The score is snapped to six decimals first so float noise such as
    /// `7.4 * 0.6 + 6.4 * 0.4 == 7.000000000000001` rates like the exact 7.0 it prints as.
    pub fn from_score(final_score: f64) -> Self {
        let final_score = (final_score * SNAP_SCALE).round() / SNAP_SCALE;
        if final_score > 7.0 {
            Rating::Strong
        } else if final_score >= 5.0 {
            Rating::Moderate
        } else {
            Rating::Weak
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Strong => "Strong",
            Rating::Moderate => "Moderate",
            Rating::Weak => "Weak",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn weighted_score(credentials: f64, importance: f64) -> f64 {
    credentials * CREDENTIALS_WEIGHT + importance * IMPORTANCE_WEIGHT
}

/// Join point of the graph: combines both analyst reports into the final recommendation.
///
/// The score and rating are computed here; the capability only writes the short
/// justification paragraph.
pub struct SynthesisStage {
    prompt: PromptTemplate,
    capability: Arc<dyn EvaluationCapability>,
}

impl SynthesisStage {
    pub fn new(capability: Arc<dyn EvaluationCapability>) -> Self {
        Self {
            prompt: synthesis_prompt(),
            capability,
        }
    }

    pub fn name(&self) -> &str {
        STAGE_NAME
    }

    pub async fn synthesize(
        &self,
        credentials: &StageResult,
        importance: &StageResult,
    ) -> Result<StageResult, StageError> {
        let credentials_score = required_score(credentials)?;
        let importance_score = required_score(importance)?;

        let final_score = weighted_score(credentials_score, importance_score);
        let rating = Rating::from_score(final_score);
        debug!(final_score, %rating, "synthesized weighted score");

        let mut variables = PromptVariables::new();
        variables.insert("credentials_report".to_string(), credentials.raw_output.clone());
        variables.insert("importance_report".to_string(), importance.raw_output.clone());
        variables.insert(
            "credentials_justification".to_string(),
            credentials.justification.clone(),
        );
        variables.insert(
            "importance_justification".to_string(),
            importance.justification.clone(),
        );
        variables.insert("credentials_score".to_string(), format_score(credentials_score));
        variables.insert("importance_score".to_string(), format_score(importance_score));
        variables.insert("final_score".to_string(), format_score(final_score));
        variables.insert("rating".to_string(), rating.label().to_string());

        let response = self
            .capability
            .respond(&self.prompt, &variables)
            .await
            .map_err(|source| StageError::Capability {
                stage: STAGE_NAME.to_string(),
                source,
            })?;

        let justification = response
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(MAX_JUSTIFICATION_LINES)
            .collect::<Vec<_>>();

        if justification.is_empty() {
            return Err(StageError::Malformed {
                stage: STAGE_NAME.to_string(),
                reason: "empty justification".to_string(),
            });
        }

        let raw_output = format!(
            "{}\n{}",
            rating_line(rating, final_score),
            justification.join("\n")
        );

        Ok(StageResult {
            stage_name: STAGE_NAME.to_string(),
            raw_output,
            numeric_score: Some(final_score),
            justification: justification.join(" "),
        })
    }
}

pub fn rating_line(rating: Rating, final_score: f64) -> String {
    format!(
        "Overall Rating: {rating} Candidate for NIW (Final Score: {}/10)",
        format_score(final_score)
    )
}

fn required_score(result: &StageResult) -> Result<f64, StageError> {
    result.numeric_score.ok_or_else(|| StageError::MissingScore {
        stage: result.stage_name.clone(),
    })
}

fn format_score(score: f64) -> String {
    format!("{score:.1}")
}

fn synthesis_prompt() -> PromptTemplate {
    PromptTemplate {
        name: STAGE_NAME.to_string(),
        system: "You are the Chief Immigration Adjudicator for NIW Cases.\nGoal: Synthesize the \
                 analyses on credentials and national importance into a concise final \
                 recommendation.\nBackground: A senior officer making final decisions on \
                 National Interest Waiver petitions, integrating specialist findings into a \
                 holistic, evidence-based judgment."
            .to_string(),
        body: "Credentials Analyst report (score {credentials_score}/10):\n{credentials_report}\n\n\
               National Importance Analyst report (score {importance_score}/10):\n\
               {importance_report}\n\n\
               The weighted final score is {final_score}/10 (credentials x 0.6 + national \
               importance x 0.4), which rates the candidate as {rating}.\n\
               Credentials justification: {credentials_justification}\n\
               National importance justification: {importance_justification}\n\
               Write a 1-3 line paragraph explaining the reasons for this rating. Reference \
               both justifications above and summarize the key strengths and weaknesses from \
               the two reports. Do not restate the rating line or change the score."
            .to_string(),
        expected_output: "A 1-3 line justification paragraph.".to_string(),
    }
}
