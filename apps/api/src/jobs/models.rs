use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::store::Filter;

/// Fields that must be present and non-empty on a job before it is created,
/// checked in this order.
pub const REQUIRED_JOB_FIELDS: [&str; 5] =
    ["title", "industry_id", "description", "average_salary", "id"];

/// Presence check used for every optional request field: null, false, zero,
/// empty strings, empty arrays and empty objects all count as absent.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn put(target: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        target.insert(key.to_string(), value);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// POST /create/jobPost
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct EmploymentDetailsInput {
    pub employment_type: Option<Value>,
    pub average_salary: Option<Value>,
    pub benefits: Option<Value>,
    pub remote: Option<Value>,
    pub job_posting_url: Option<Value>,
    pub posting_date: Option<Value>,
    pub closing_date: Option<Value>,
}

/// A nested job document as submitted by clients.
#[derive(Debug, Default, Deserialize)]
pub struct CreateJobPostRequest {
    pub id: Option<Value>,
    pub title: Option<Value>,
    pub description: Option<Value>,
    pub industry_id: Option<Value>,
    pub years_of_experience: Option<Value>,
    pub detailed_description: Option<Value>,
    pub responsibilities: Option<Value>,
    pub requirements: Option<Value>,
    pub education_and_skills: Option<Value>,
    pub industry_skills: Option<Value>,
    pub employment_details: Option<EmploymentDetailsInput>,
    pub industry: Option<Map<String, Value>>,
    pub company: Option<Map<String, Value>>,
}

/// A create request split into the flat job record and the related records
/// to upsert alongside it.
#[derive(Debug, PartialEq)]
pub struct JobPost {
    pub job: Map<String, Value>,
    pub industry: Option<Map<String, Value>>,
    pub company: Option<Map<String, Value>>,
}

impl CreateJobPostRequest {
    /// Flattens `employment_details` into the job and links the job to any
    /// `industry`/`company` sub-object that carries an `id`. Sub-objects
    /// without an `id` are dropped.
    pub fn into_job_post(self) -> JobPost {
        let mut job = Map::new();
        put(&mut job, "id", self.id);
        put(&mut job, "title", self.title);
        put(&mut job, "description", self.description);
        put(&mut job, "industry_id", self.industry_id);
        put(&mut job, "years_of_experience", self.years_of_experience);
        put(&mut job, "detailed_description", self.detailed_description);
        put(&mut job, "responsibilities", self.responsibilities);
        put(&mut job, "requirements", self.requirements);
        put(&mut job, "education_and_skills", self.education_and_skills);
        put(&mut job, "industry_skills", self.industry_skills);

        if let Some(details) = self.employment_details {
            put(&mut job, "average_salary", details.average_salary);
            put(&mut job, "employment_type", details.employment_type);
            put(&mut job, "benefits", details.benefits);
            put(&mut job, "job_posting_url", details.job_posting_url);
            put(&mut job, "posting_date", details.posting_date);
            put(&mut job, "closing_date", details.closing_date);
            put(&mut job, "remote", details.remote);
        }

        let industry = self.industry.filter(|related| related.contains_key("id"));
        if let Some(related) = &industry {
            job.insert("industry_id".to_string(), related["id"].clone());
        }

        let company = self.company.filter(|related| related.contains_key("id"));
        if let Some(related) = &company {
            job.insert("company_id".to_string(), related["id"].clone());
        }

        JobPost {
            job,
            industry,
            company,
        }
    }
}

impl JobPost {
    /// Fails on the first required field that is missing or empty.
    pub fn validate(&self) -> Result<(), AppError> {
        for field in REQUIRED_JOB_FIELDS {
            if !self.job.get(field).is_some_and(is_truthy) {
                return Err(AppError::Validation(format!(
                    "'{field}' is required and cannot be empty"
                )));
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PUT /update_by_job_title
// ────────────────────────────────────────────────────────────────────────────

/// Partial update addressed by job title. Only the whitelisted fields below
/// can change; anything else in the body is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateJobRequest {
    pub title: Option<Value>,
    pub description: Option<Value>,
    pub average_salary: Option<Value>,
    pub years_of_experience: Option<Value>,
    pub detailed_description: Option<Value>,
    pub responsibilities: Option<Value>,
    pub requirements: Option<Value>,
    pub education_and_skills: Option<Value>,
    pub industry_skills: Option<Value>,
    pub employment_type: Option<Value>,
    pub benefits: Option<Value>,
    pub job_posting_url: Option<Value>,
    pub posting_date: Option<Value>,
    pub closing_date: Option<Value>,
    pub remote: Option<Value>,
    pub industry: Option<Map<String, Value>>,
    pub company: Option<Map<String, Value>>,
}

impl UpdateJobRequest {
    /// The truthy whitelisted fields, ready to be merged into the job.
    pub fn job_updates(&self) -> Map<String, Value> {
        let candidates = [
            ("description", &self.description),
            ("average_salary", &self.average_salary),
            ("years_of_experience", &self.years_of_experience),
            ("detailed_description", &self.detailed_description),
            ("responsibilities", &self.responsibilities),
            ("requirements", &self.requirements),
            ("education_and_skills", &self.education_and_skills),
            ("industry_skills", &self.industry_skills),
            ("employment_type", &self.employment_type),
            ("benefits", &self.benefits),
            ("job_posting_url", &self.job_posting_url),
            ("posting_date", &self.posting_date),
            ("closing_date", &self.closing_date),
            ("remote", &self.remote),
        ];

        candidates
            .into_iter()
            .filter_map(|(key, value)| {
                value
                    .as_ref()
                    .filter(|v| is_truthy(v))
                    .map(|v| (key.to_string(), v.clone()))
            })
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// DELETE /delete_by_job_title
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct DeleteJobRequest {
    pub title: Option<Value>,
    pub confirm: Option<Value>,
}

impl DeleteJobRequest {
    pub fn is_confirmed(&self) -> bool {
        self.confirm.as_ref().is_some_and(is_truthy)
    }
}

/// Returns the title when it is present and truthy. Any JSON type is
/// accepted; a non-string title simply matches no job.
pub fn required_title<'a>(title: &'a Option<Value>, action: &str) -> Result<&'a Value, AppError> {
    match title {
        Some(t) if is_truthy(t) => Ok(t),
        _ => Err(AppError::Validation(format!(
            "'title' is required to {action} a job"
        ))),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Query endpoints
// ────────────────────────────────────────────────────────────────────────────

/// Raw query parameters. Values are parsed by hand so a non-integer bound
/// reports the same error as a missing one.
#[derive(Debug, Default, Deserialize)]
pub struct SalaryRangeQuery {
    pub min_salary: Option<String>,
    pub max_salary: Option<String>,
}

impl SalaryRangeQuery {
    pub fn bounds(&self) -> Result<(i64, i64), AppError> {
        let parse = |raw: &Option<String>| raw.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        match (parse(&self.min_salary), parse(&self.max_salary)) {
            (Some(min), Some(max)) => Ok((min, max)),
            _ => Err(AppError::Validation(
                "Both min_salary and max_salary are required.".to_string(),
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExperienceLevelQuery {
    pub experience_level: Option<String>,
}

/// Experience buckets over `years_of_experience`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
}

impl ExperienceLevel {
    const YEARS_PATH: &'static [&'static str] = &["years_of_experience"];

    /// Case-insensitive: "Entry Level", "mid level", "SENIOR LEVEL".
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.to_lowercase().as_str() {
            "entry level" => Ok(ExperienceLevel::Entry),
            "mid level" => Ok(ExperienceLevel::Mid),
            "senior level" => Ok(ExperienceLevel::Senior),
            "" => Err(AppError::Validation("Experience level is required.".to_string())),
            _ => Err(AppError::Validation(
                "Invalid experience level. Valid options are 'Entry Level', 'Mid Level', 'Senior Level'."
                    .to_string(),
            )),
        }
    }

    pub fn filter(self) -> Filter {
        let (min, max) = match self {
            ExperienceLevel::Entry => (None, Some(2)),
            ExperienceLevel::Mid => (Some(3), Some(5)),
            ExperienceLevel::Senior => (Some(6), None),
        };
        Filter::IntRange {
            path: Self::YEARS_PATH,
            min,
            max,
        }
    }
}

/// Integer form of a stored salary that is not already an integer.
///
/// Strings are parsed as integers (surrounding whitespace allowed) and
/// floats are truncated toward zero. Integers, objects, booleans and
/// unparseable strings yield `None`, meaning "leave as is".
pub fn coerce_salary(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) if n.is_i64() || n.is_u64() => None,
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
            .map(|f| f.trunc() as i64),
        _ => None,
    }
}
