use super::capability::PromptTemplate;

/// Analyst persona the capability is asked to adopt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl Persona {
    fn system_prompt(&self) -> String {
        format!(
            "You are the {}.\nGoal: {}\nBackground: {}",
            self.role, self.goal, self.backstory
        )
    }
}

/// One scoring bucket (high, medium, low) bound to an inclusive score range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubricTier {
    pub label: String,
    pub min: u8,
    pub max: u8,
    pub criteria: String,
}

/// Fixed tier-based scoring criteria assigned to a scoring stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rubric {
    pub stage_name: String,
    pub score_label: String,
    pub persona: Persona,
    pub instruction: String,
    pub tiers: Vec<RubricTier>,
}

impl Rubric {
    pub fn credentials() -> Self {
        Self {
            stage_name: "credentials".to_string(),
            score_label: "Credentials Score".to_string(),
            persona: Persona {
                role: "Expert Academic & Professional Credentials Analyst".to_string(),
                goal: "Evaluate a candidate's CV on academic degrees, publications, citation \
                       record, and awards, and score their credentials from 1-10."
                    .to_string(),
                backstory: "A seasoned evaluator for prestigious grant committees and top-tier \
                            university admissions with a keen eye for quantifying a track \
                            record and professional standing."
                    .to_string(),
            },
            instruction: "Analyze the provided CV text and score the candidate's credentials \
                          on a 1-10 scale."
                .to_string(),
            tiers: vec![
                tier(
                    "High",
                    8,
                    10,
                    "PhD from a reputable university, numerous publications in top-tier \
                     journals, high citation count (top 5-10%), major awards, or significant \
                     grant funding.",
                ),
                tier(
                    "Medium",
                    5,
                    7,
                    "Master's or PhD, solid publication record, moderate citations, some minor \
                     awards.",
                ),
                tier(
                    "Low",
                    1,
                    4,
                    "Basic advanced degree, minimal publications, low citations, no significant \
                     awards.",
                ),
            ],
        }
    }

    pub fn national_importance() -> Self {
        Self {
            stage_name: "national_importance".to_string(),
            score_label: "National Importance Score".to_string(),
            persona: Persona {
                role: "U.S. Strategic Interest & Policy Analyst".to_string(),
                goal: "Analyze a candidate's field of work and its alignment with the current \
                       national interests of the United States, and score it from 1-10."
                    .to_string(),
                backstory: "A policy advisor who monitors governmental reports and strategic \
                            initiatives from the White House, NSF, DOE, and DHS to identify \
                            critical fields like AI, semiconductors, clean energy, and national \
                            security."
                    .to_string(),
            },
            instruction: "Analyze the candidate's field of endeavor described in the CV and \
                          score its national importance to the U.S. on a 1-10 scale. Consider \
                          the current date is {as_of}."
                .to_string(),
            tiers: vec![
                tier(
                    "High",
                    8,
                    10,
                    "Work directly addresses critical U.S. priorities like AI development, \
                     semiconductor manufacturing, national security, specific cancer research, \
                     or clean energy.",
                ),
                tier(
                    "Medium",
                    5,
                    7,
                    "Work contributes to an important field like general healthcare, economic \
                     growth, or education, but the impact is less immediate.",
                ),
                tier(
                    "Low",
                    1,
                    4,
                    "The benefit to the U.S. is abstract, indirect, or not clearly articulated.",
                ),
            ],
        }
    }

    /// Tier whose inclusive range contains `score`.
    pub fn tier_for(&self, score: f64) -> Option<&RubricTier> {
        self.tiers
            .iter()
            .find(|tier| score >= f64::from(tier.min) && score <= f64::from(tier.max))
    }

    /// Prompt asking for exactly one `X/10` score and a one-sentence justification.
    pub fn prompt(&self) -> PromptTemplate {
        let tiers = self
            .tiers
            .iter()
            .map(|tier| {
                format!(
                    "- {} Score ({}-{}): {}",
                    tier.label, tier.min, tier.max, tier.criteria
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let body = format!(
            "{}\nUse the following scoring model:\n{}\n\nProvide ONLY one score (never a range) \
             and a 1-sentence justification.\n\nCandidate CV:\n---\n{{cv_text}}\n---",
            self.instruction, tiers
        );

        PromptTemplate {
            name: self.stage_name.clone(),
            system: self.persona.system_prompt(),
            body,
            expected_output: format!(
                "A score (e.g., '{}: 8/10') and a single-sentence justification for the rating.",
                self.score_label
            ),
        }
    }
}

fn tier(label: &str, min: u8, max: u8, criteria: &str) -> RubricTier {
    RubricTier {
        label: label.to_string(),
        min,
        max,
        criteria: criteria.to_string(),
    }
}
