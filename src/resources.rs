//! Company and job handlers. Every handler receives the caller's verified identity;
//! records are tagged with it on creation but any authenticated caller may read or
//! modify any record.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use warp::{Rejection, Reply};

use crate::{
    error::ResourceError,
    store::{Predicate, Record, Store},
    types::RequestIdentity,
};

pub const COMPANIES_TABLE: &str = "companies";
pub const JOBS_TABLE: &str = "jobs";

#[derive(Debug, Default, Deserialize)]
pub struct CompanyInput {
    pub name: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
}

impl CompanyInput {
    fn into_fields(self) -> Record {
        let mut fields = Record::new();
        for (key, value) in [
            ("name", self.name),
            ("city", self.city),
            ("address", self.address),
        ] {
            if let Some(value) = value {
                fields.insert(key.into(), Value::from(value));
            }
        }
        fields
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct JobInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "CompanyId")]
    pub company_id: Option<u64>,
}

pub async fn create_company(
    identity: RequestIdentity,
    input: CompanyInput,
    store: Arc<dyn Store>,
) -> Result<impl Reply, Rejection> {
    let mut fields = input.into_fields();
    fields.insert("owner".into(), Value::from(identity.0));

    let company = store
        .create(COMPANIES_TABLE, fields)
        .await
        .map_err(ResourceError::from)?;

    tracing::info!(id = ?company.get("id"), "company created");

    Ok(warp::reply::json(&company))
}

pub async fn list_companies(
    _identity: RequestIdentity,
    store: Arc<dyn Store>,
) -> Result<impl Reply, Rejection> {
    let companies = store
        .find_all(COMPANIES_TABLE, &Predicate::all())
        .await
        .map_err(ResourceError::from)?;
    let jobs = store
        .find_all(JOBS_TABLE, &Predicate::all())
        .await
        .map_err(ResourceError::from)?;

    let companies: Vec<Record> = companies
        .into_iter()
        .map(|company| with_jobs(company, &jobs))
        .collect();

    Ok(warp::reply::json(&companies))
}

pub async fn get_company(
    id: u64,
    _identity: RequestIdentity,
    store: Arc<dyn Store>,
) -> Result<impl Reply, Rejection> {
    let company = store
        .find_one(COMPANIES_TABLE, &Predicate::eq("id", id))
        .await
        .map_err(ResourceError::from)?
        .ok_or(ResourceError::NotFound("Company"))?;
    let jobs = store
        .find_all(JOBS_TABLE, &Predicate::eq("CompanyId", id))
        .await
        .map_err(ResourceError::from)?;

    Ok(warp::reply::json(&with_jobs(company, &jobs)))
}

pub async fn update_company(
    id: u64,
    _identity: RequestIdentity,
    input: CompanyInput,
    store: Arc<dyn Store>,
) -> Result<impl Reply, Rejection> {
    let updated = store
        .update(COMPANIES_TABLE, &Predicate::eq("id", id), input.into_fields())
        .await
        .map_err(ResourceError::from)?;

    if updated == 0 {
        return Err(ResourceError::NotFound("Company").into());
    }

    Ok(message(format!("Updated company with id {id}")))
}

/// Deletes the company together with its jobs.
pub async fn delete_company(
    id: u64,
    _identity: RequestIdentity,
    store: Arc<dyn Store>,
) -> Result<impl Reply, Rejection> {
    let deleted = store
        .destroy(COMPANIES_TABLE, &Predicate::eq("id", id))
        .await
        .map_err(ResourceError::from)?;

    if deleted == 0 {
        return Err(ResourceError::NotFound("Company").into());
    }

    let jobs = store
        .destroy(JOBS_TABLE, &Predicate::eq("CompanyId", id))
        .await
        .map_err(ResourceError::from)?;

    tracing::info!(id, jobs, "company deleted");

    Ok(message(format!("Deleted company with id {id}")))
}

pub async fn create_job(
    identity: RequestIdentity,
    input: JobInput,
    store: Arc<dyn Store>,
) -> Result<impl Reply, Rejection> {
    let title = input
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or(ResourceError::Validation("Please provide a title"))?;
    let company_id = input
        .company_id
        .ok_or(ResourceError::Validation("Please provide a CompanyId"))?;

    store
        .find_one(COMPANIES_TABLE, &Predicate::eq("id", company_id))
        .await
        .map_err(ResourceError::from)?
        .ok_or(ResourceError::NotFound("Company"))?;

    let mut fields = Record::new();
    fields.insert("title".into(), Value::from(title));
    if let Some(description) = input.description {
        fields.insert("description".into(), Value::from(description));
    }
    fields.insert("CompanyId".into(), Value::from(company_id));
    fields.insert("owner".into(), Value::from(identity.0));

    let job = store
        .create(JOBS_TABLE, fields)
        .await
        .map_err(ResourceError::from)?;

    tracing::info!(id = ?job.get("id"), company_id, "job created");

    Ok(warp::reply::json(&job))
}

pub async fn list_jobs(
    _identity: RequestIdentity,
    store: Arc<dyn Store>,
) -> Result<impl Reply, Rejection> {
    let jobs = store
        .find_all(JOBS_TABLE, &Predicate::all())
        .await
        .map_err(ResourceError::from)?;

    Ok(warp::reply::json(&jobs))
}

pub async fn get_job(
    id: u64,
    _identity: RequestIdentity,
    store: Arc<dyn Store>,
) -> Result<impl Reply, Rejection> {
    let job = store
        .find_one(JOBS_TABLE, &Predicate::eq("id", id))
        .await
        .map_err(ResourceError::from)?
        .ok_or(ResourceError::NotFound("Job"))?;

    Ok(warp::reply::json(&job))
}

pub async fn update_job(
    id: u64,
    _identity: RequestIdentity,
    input: JobInput,
    store: Arc<dyn Store>,
) -> Result<impl Reply, Rejection> {
    let mut fields = Record::new();
    if let Some(title) = input.title {
        if title.trim().is_empty() {
            return Err(ResourceError::Validation("Please provide a title").into());
        }
        fields.insert("title".into(), Value::from(title));
    }
    if let Some(description) = input.description {
        fields.insert("description".into(), Value::from(description));
    }

    let updated = store
        .update(JOBS_TABLE, &Predicate::eq("id", id), fields)
        .await
        .map_err(ResourceError::from)?;

    if updated == 0 {
        return Err(ResourceError::NotFound("Job").into());
    }

    Ok(message(format!("Updated job with id {id}")))
}

pub async fn delete_job(
    id: u64,
    _identity: RequestIdentity,
    store: Arc<dyn Store>,
) -> Result<impl Reply, Rejection> {
    let deleted = store
        .destroy(JOBS_TABLE, &Predicate::eq("id", id))
        .await
        .map_err(ResourceError::from)?;

    if deleted == 0 {
        return Err(ResourceError::NotFound("Job").into());
    }

    Ok(message(format!("Deleted job with id {id}")))
}

fn with_jobs(mut company: Record, jobs: &[Record]) -> Record {
    let id = company.get("id").cloned();
    let owned: Vec<Value> = jobs
        .iter()
        .filter(|job| id.is_some() && job.get("CompanyId") == id.as_ref())
        .cloned()
        .map(Value::Object)
        .collect();

    company.insert("Jobs".into(), Value::Array(owned));
    company
}

fn message(text: String) -> warp::reply::Json {
    warp::reply::json(&json!({ "message": text }))
}
