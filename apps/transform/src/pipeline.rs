use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Result, TransformError};
use crate::merge::{merge, Join, JoinKind};
use crate::nest::NestedJob;
use crate::table::Table;

pub const COMPANIES_JSON: &str = "companies.json";
pub const INDUSTRY_JSON: &str = "industry_info.json";
pub const JOBS_JSON: &str = "jobs_nested.json";

/// The five input tables.
pub struct SourceTables {
    pub companies: Table,
    pub education_and_skills: Table,
    pub employment_details: Table,
    pub industry_info: Table,
    pub jobs: Table,
}

impl SourceTables {
    /// Reads `<name>.csv` for each table from `dir`. Any missing or malformed
    /// file fails the load.
    pub fn load(dir: &Path) -> Result<Self> {
        let read = |name: &str| -> Result<Table> {
            let table = Table::load(name, &dir.join(format!("{name}.csv")))?;
            info!("Loaded table '{name}' ({} rows)", table.len());
            Ok(table)
        };

        Ok(SourceTables {
            companies: read("companies")?,
            education_and_skills: read("education_and_skills")?,
            employment_details: read("employment_details")?,
            industry_info: read("industry_info")?,
            jobs: read("jobs")?,
        })
    }
}

/// The three output documents, fully built in memory.
pub struct Artifacts {
    pub companies: Table,
    pub industry_info: Table,
    pub jobs_nested: Vec<NestedJob>,
}

pub fn build(tables: &SourceTables) -> Result<Artifacts> {
    let growth = tables.industry_info.select(&["id", "growth_rate"])?;
    let companies = merge(&tables.companies, &growth, Join::on("id", JoinKind::Left))?;

    let with_education = merge(
        &tables.jobs,
        &tables.education_and_skills,
        Join {
            left_on: "id",
            right_on: "job_id",
            kind: JoinKind::Inner,
            suffixes: ("", "_education"),
        },
    )?;
    let with_details = merge(
        &with_education,
        &tables.employment_details,
        Join::on("id", JoinKind::Inner).suffixes("", "_employment"),
    )?;
    let skills = tables.industry_info.select(&["id", "industry_skills"])?;
    let with_industry = merge(&with_details, &skills, Join::on("id", JoinKind::Left))?;

    let industry_info = tables
        .industry_info
        .drop_columns(&["growth_rate", "industry_skills"])?;

    let jobs_nested = with_industry
        .records()
        .map(|row| NestedJob::from_record(&row))
        .collect::<Result<Vec<_>>>()?;

    Ok(Artifacts {
        companies,
        industry_info,
        jobs_nested,
    })
}

impl Artifacts {
    /// Encodes all three documents, stages each in a temp file beside its
    /// target, and renames them into place only once every one is staged.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let documents = [
            (COMPANIES_JSON, encode_pretty(&dir.join(COMPANIES_JSON), &self.companies)?),
            (INDUSTRY_JSON, encode_pretty(&dir.join(INDUSTRY_JSON), &self.industry_info)?),
            (JOBS_JSON, encode_pretty(&dir.join(JOBS_JSON), &self.jobs_nested)?),
        ];
        write_files(dir, documents)
    }
}

/// `value` as a 4-space indented JSON document.
fn encode_pretty<T: Serialize>(path: &Path, value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .map_err(|source| TransformError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(buf)
}

/// Stages every file first; a staging failure leaves the targets untouched
/// and the dropped temp files are removed.
fn write_files<'a>(
    dir: &Path,
    documents: impl IntoIterator<Item = (&'a str, Vec<u8>)>,
) -> Result<()> {
    let mut staged = Vec::new();
    for (file_name, bytes) in documents {
        let path = dir.join(file_name);
        let write_err = |source: std::io::Error| TransformError::Write {
            path: path.clone(),
            source,
        };

        let parent = path.parent().unwrap_or(dir);
        let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.flush().map_err(write_err)?;
        staged.push((tmp, path));
    }

    for (tmp, path) in staged {
        if let Err(e) = tmp.persist(&path) {
            return Err(TransformError::Write {
                path,
                source: e.error,
            });
        }
        info!("Wrote {}", path.display());
    }
    Ok(())
}
