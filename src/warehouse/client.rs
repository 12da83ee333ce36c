//! HTTP client for running templated queries against BigQuery.

use super::queries::{QueryParameter, QueryTemplate};
use super::types::{
    ErrorEnvelope, JobReference, ParameterType, ParameterValue, QueryParameterJson, QueryRequest,
    QueryResponse, ResultSet, TableCell,
};
use crate::utils::config::{DEFAULT_HTTP_TIMEOUT, MAX_RESULT_POLLS, QUERY_TIMEOUT_MS};
use crate::utils::error::QueryError;
use log::{debug, info};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;

/// Anything that can execute a query template and hand back a table
pub trait Warehouse {
    fn run_query(
        &self,
        template: &QueryTemplate,
        params: &[QueryParameter],
    ) -> Result<ResultSet, QueryError>;
}

/// BigQuery REST client authenticated with an OAuth bearer token
pub struct BigQueryClient {
    client: Client,
    endpoint: String,
    project_id: String,
    access_token: String,
}

impl BigQueryClient {
    /// Create a new BigQuery client
    pub fn new(
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, QueryError> {
        let client = Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(QueryError::RequestFailed)?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            access_token: access_token.into(),
        })
    }

    /// Submit the query; returns the first page (possibly incomplete)
    fn start_query(
        &self,
        template: &QueryTemplate,
        params: &[QueryParameter],
    ) -> Result<QueryResponse, QueryError> {
        let request = build_request(template, params);
        debug!("Query request: {:?}", request.query_parameters);

        let url = format!("{}/projects/{}/queries", self.endpoint, self.project_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .map_err(QueryError::RequestFailed)?;

        parse_response(response)
    }

    /// Fetch a further page, or poll an unfinished job
    fn get_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, QueryError> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.endpoint, self.project_id, job.job_id
        );

        let mut query: Vec<(&str, String)> = vec![("timeoutMs", QUERY_TIMEOUT_MS.to_string())];
        if let Some(location) = &job.location {
            query.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .map_err(QueryError::RequestFailed)?;

        parse_response(response)
    }
}

impl Warehouse for BigQueryClient {
    fn run_query(
        &self,
        template: &QueryTemplate,
        params: &[QueryParameter],
    ) -> Result<ResultSet, QueryError> {
        info!("Running query {} on project {}", template.name, self.project_id);

        let mut page = self.start_query(template, params)?;
        let job = page.job_reference.clone();
        let mut result = ResultSet::default();
        let mut polls = 0;

        loop {
            if !page.job_complete.unwrap_or(true) {
                let job = job.as_ref().ok_or_else(|| {
                    QueryError::InvalidResponse("Incomplete job without a job reference".to_string())
                })?;
                polls += 1;
                if polls > MAX_RESULT_POLLS {
                    return Err(QueryError::JobIncomplete(job.job_id.clone()));
                }
                debug!("Job {} still running (poll {})", job.job_id, polls);
                page = self.get_results(job, None)?;
                continue;
            }

            if result.columns.is_empty() {
                let schema = page.schema.take().ok_or_else(|| {
                    QueryError::InvalidResponse("Completed job without a schema".to_string())
                })?;
                result.columns = schema.fields.into_iter().map(|f| f.name).collect();
            }

            for row in page.rows.take().unwrap_or_default() {
                result
                    .rows
                    .push(row.f.into_iter().map(TableCell::into_value).collect());
            }

            match page.page_token.take() {
                Some(token) => {
                    let job = job.as_ref().ok_or_else(|| {
                        QueryError::InvalidResponse("Paged result without a job reference".to_string())
                    })?;
                    page = self.get_results(job, Some(&token))?;
                }
                None => break,
            }
        }

        info!("Query {} returned {} rows", template.name, result.rows.len());

        Ok(result)
    }
}

/// Bind parameter values to a template
///
/// **Private** - the template's SQL text is sent verbatim
fn build_request(template: &QueryTemplate, params: &[QueryParameter]) -> QueryRequest {
    QueryRequest {
        query: template.sql.to_string(),
        use_legacy_sql: false,
        parameter_mode: "NAMED".to_string(),
        query_parameters: params
            .iter()
            .map(|p| QueryParameterJson {
                name: p.name().to_string(),
                parameter_type: ParameterType {
                    kind: p.type_name().to_string(),
                },
                parameter_value: ParameterValue { value: p.value() },
            })
            .collect(),
        timeout_ms: QUERY_TIMEOUT_MS,
    }
}

/// Check HTTP status and decode a result page
fn parse_response(response: Response) -> Result<QueryResponse, QueryError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(QueryError::Unauthorized(error_message(
            status,
            &response.text().unwrap_or_default(),
        )));
    }

    if !status.is_success() {
        return Err(QueryError::InvalidResponse(error_message(
            status,
            &response.text().unwrap_or_default(),
        )));
    }

    response.json().map_err(QueryError::RequestFailed)
}

/// Prefer the API's error message over the raw body
fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!("HTTP {} ({}): {}", status, envelope.error.code, envelope.error.message),
        Err(_) => format!("HTTP {}: {}", status, body),
    }
}
