//! TestRail v2 client: run lookup, run creation and result reporting.
//!
//! # Design
//! `TestRailClient` holds only the normalized base URL, the precomputed
//! `Authorization` value and the project id. Each endpoint is split into a
//! `build_*` method that produces an `HttpRequest` through `RequestBuilder`
//! and a `parse_*` method that consumes an `HttpResponse`. The workflow
//! methods (`report_results` and friends) glue the two together over any
//! `Transport`, so they can run against a real server or a closure.

use base64::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};

use crate::builder::RequestBuilder;
use crate::dispatch::Transport;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::method::HttpMethod;
use crate::types::{Results, RunList, TestRun};

/// Connection settings for a TestRail instance.
///
/// `base_url` is the API root, e.g.
/// `https://example.testrail.io/index.php?/api/v2/`.
#[derive(Debug, Clone, Deserialize)]
pub struct TestRailConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub project_id: String,
}

/// Stateless client for the TestRail API.
#[derive(Debug, Clone)]
pub struct TestRailClient {
    base_url: String,
    authorization: String,
    project_id: String,
}

impl TestRailClient {
    pub fn new(config: &TestRailConfig) -> Self {
        let mut base_url = config.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let credentials = format!("{}:{}", config.username, config.password);
        Self {
            base_url,
            authorization: format!("Basic {}", BASE64_STANDARD.encode(credentials)),
            project_id: config.project_id.clone(),
        }
    }

    pub fn build_get_runs(&self) -> Result<HttpRequest, ApiError> {
        Ok(self
            .request(HttpMethod::Get, "get_runs/{project_id}")
            .add_path_param("project_id", &self.project_id)
            .build()?)
    }

    pub fn build_add_run(&self, run: &TestRun) -> Result<HttpRequest, ApiError> {
        self.json_request("add_run/{project_id}", "project_id", &self.project_id, run)
    }

    /// Fails with `MissingRunId` if `run.id` is unset.
    pub fn build_update_run(&self, run: &TestRun) -> Result<HttpRequest, ApiError> {
        let id = run.id.ok_or_else(|| ApiError::MissingRunId(run.name.clone()))?;
        self.json_request("update_run/{run_id}", "run_id", &id.to_string(), run)
    }

    pub fn build_add_results_for_cases(&self, run_id: u64, results: &Results) -> Result<HttpRequest, ApiError> {
        self.json_request("add_results_for_cases/{run_id}", "run_id", &run_id.to_string(), results)
    }

    pub fn parse_get_runs(&self, response: HttpResponse) -> Result<Vec<TestRun>, ApiError> {
        check_status(&response)?;
        let list: RunList =
            serde_json::from_slice(&response.body).map_err(ApiError::DeserializationError)?;
        Ok(list.runs)
    }

    pub fn parse_add_run(&self, response: HttpResponse) -> Result<TestRun, ApiError> {
        check_status(&response)?;
        serde_json::from_slice(&response.body).map_err(ApiError::DeserializationError)
    }

    pub fn parse_update_run(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn parse_add_results_for_cases(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    /// Id of the project's run called `name`, if there is one.
    pub fn find_run_by_name(&self, transport: &impl Transport, name: &str) -> Result<Option<u64>, ApiError> {
        let response = transport.execute(&self.build_get_runs()?)?;
        let runs = self.parse_get_runs(response)?;
        let id = find_run_id(&runs, name);
        if let Some(id) = id {
            info!("test run '{name}' with ID {id} already exists");
        }
        Ok(id)
    }

    pub fn create_run(&self, transport: &impl Transport, run: &TestRun) -> Result<u64, ApiError> {
        let response = transport.execute(&self.build_add_run(run)?)?;
        let created = self.parse_add_run(response)?;
        info!("test run '{}' successfully created", run.name);
        created.id.ok_or_else(|| ApiError::MissingRunId(run.name.clone()))
    }

    /// Reuse the run with the same name if it exists, otherwise create it.
    pub fn get_or_create_run(&self, transport: &impl Transport, run: &TestRun) -> Result<u64, ApiError> {
        match self.find_run_by_name(transport, &run.name)? {
            Some(id) => Ok(id),
            None => self.create_run(transport, run),
        }
    }

    pub fn update_run(&self, transport: &impl Transport, run: &TestRun) -> Result<(), ApiError> {
        let response = transport.execute(&self.build_update_run(run)?)?;
        self.parse_update_run(response)?;
        info!("test run '{}' successfully updated", run.name);
        Ok(())
    }

    pub fn add_results_for_cases(
        &self,
        transport: &impl Transport,
        run_id: u64,
        results: &Results,
    ) -> Result<(), ApiError> {
        let response = transport.execute(&self.build_add_results_for_cases(run_id, results)?)?;
        self.parse_add_results_for_cases(response)
    }

    /// Record `results` against `run`, creating the run first if no run with
    /// that name exists. Returns the id of the run the results went to.
    pub fn report_results(
        &self,
        transport: &impl Transport,
        run: &TestRun,
        results: &Results,
    ) -> Result<u64, ApiError> {
        let run_id = self.get_or_create_run(transport, run)?;
        self.add_results_for_cases(transport, run_id, results)?;
        Ok(run_id)
    }

    fn request(&self, method: HttpMethod, endpoint: &str) -> RequestBuilder {
        let mut builder = RequestBuilder::new();
        builder
            .set_method(method)
            .set_url_template(format!("{}{endpoint}", self.base_url))
            .add_header("Authorization", &self.authorization);
        builder
    }

    fn json_request<T: Serialize>(
        &self,
        endpoint: &str,
        key: &str,
        value: &str,
        payload: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(payload).map_err(ApiError::SerializationError)?;
        Ok(self
            .request(HttpMethod::Post, endpoint)
            .add_path_param(key, value)
            .add_header("Content-Type", "application/json")
            .set_body(body)
            .build()?)
    }
}

/// First run whose name matches `name`, ignoring case.
pub fn find_run_id(runs: &[TestRun], name: &str) -> Option<u64> {
    let wanted = name.to_lowercase();
    runs.iter()
        .find(|run| run.name.to_lowercase() == wanted)
        .and_then(|run| run.id)
}

/// Map anything but 200 to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.status == 200 {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.text().into_owned(),
    })
}
