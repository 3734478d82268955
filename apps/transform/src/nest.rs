use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::table::Record;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationAndSkills {
    pub required_education: Value,
    pub preferred_skills: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmploymentDetails {
    pub employment_type: Value,
    pub average_salary: Value,
    pub benefits: Value,
    pub remote: Value,
    pub job_posting_url: Value,
    pub posting_date: Value,
    pub closing_date: Value,
}

/// One job with its education and employment rows embedded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedJob {
    pub id: Value,
    pub title: Value,
    pub description: Value,
    pub years_of_experience: Value,
    pub detailed_description: Value,
    pub responsibilities: Value,
    pub requirements: Value,
    pub education_and_skills: EducationAndSkills,
    pub employment_details: EmploymentDetails,
    pub industry_skills: Value,
    pub industry_id: Value,
    pub company_id: Value,
}

impl NestedJob {
    /// Builds a nested job from a fully joined row. Every column read here
    /// must exist on the joined table.
    ///
    /// `industry_id` and `company_id` are both taken from the job's own `id`.
    pub fn from_record(row: &Record<'_>) -> Result<Self> {
        let field = |column: &str| row.get(column).cloned();
        let id = field("id")?;

        Ok(NestedJob {
            title: field("title")?,
            description: field("description")?,
            years_of_experience: field("years_of_experience")?,
            detailed_description: field("detailed_description")?,
            responsibilities: field("responsibilities")?,
            requirements: field("requirements")?,
            education_and_skills: EducationAndSkills {
                required_education: field("required_education")?,
                preferred_skills: field("preferred_skills")?,
            },
            employment_details: EmploymentDetails {
                employment_type: field("employment_type")?,
                average_salary: field("average_salary")?,
                benefits: field("benefits")?,
                remote: field("remote")?,
                job_posting_url: field("job_posting_url")?,
                posting_date: field("posting_date")?,
                closing_date: field("closing_date")?,
            },
            industry_skills: field("industry_skills")?,
            industry_id: id.clone(),
            company_id: id.clone(),
            id,
        })
    }
}
