use std::fmt;

use super::domain::{CandidateRecord, Education, Publication, WorkExperience};

const PLACEHOLDER: &str = "N/A";

/// Canonical narrative text shared by every scoring stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledText(String);

impl AssembledText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AssembledText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders a candidate record into the markdown-flavoured CV text.
///
/// Sections are emitted in a fixed order (summary, work experience, education,
/// publications, skills) and only when they carry data. Missing sub-fields of an
/// entry render as `N/A`.
pub fn assemble(record: &CandidateRecord) -> AssembledText {
    let cv = &record.cv_info;
    let mut parts = vec![header(record)];

    if let Some(summary) = non_blank(cv.summary.as_deref()) {
        parts.push(format!("\n## Professional Summary\n{summary}"));
    }

    if !cv.work_experience.is_empty() {
        parts.push("\n## Work Experience".to_string());
        parts.extend(cv.work_experience.iter().map(work_line));
    }

    if !cv.education.is_empty() {
        parts.push("\n## Education".to_string());
        parts.extend(cv.education.iter().map(education_line));
    }

    if !cv.publications.is_empty() {
        parts.push("\n## Publications".to_string());
        parts.extend(cv.publications.iter().map(publication_line));
    }

    if !cv.skills.is_empty() {
        parts.push(format!("\n## Skills\n{}", cv.skills.join(", ")));
    }

    AssembledText(parts.join("\n"))
}

fn header(record: &CandidateRecord) -> String {
    match non_blank(record.name.as_deref()) {
        Some(name) => format!("Curriculum Vitae for {name}"),
        None => "Curriculum Vitae".to_string(),
    }
}

fn work_line(job: &WorkExperience) -> String {
    format!(
        "- **{}** at {} ({})\n  {}",
        field(&job.title),
        field(&job.company),
        field(&job.date_range),
        field(&job.description),
    )
}

fn education_line(entry: &Education) -> String {
    format!(
        "- {}, {} ({})",
        field(&entry.degree),
        field(&entry.institution),
        field(&entry.date_range),
    )
}

fn publication_line(entry: &Publication) -> String {
    format!("- {} - *{}*", field(&entry.title), field(&entry.venue))
}

fn field(value: &Option<String>) -> &str {
    non_blank(value.as_deref()).unwrap_or(PLACEHOLDER)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
