use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::Response,
    routing::{any, get, post},
    Json, Router,
};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestRun {
    pub id: u64,
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub include_all: bool,
    #[serde(default)]
    pub case_ids: Vec<u64>,
}

#[derive(Deserialize)]
pub struct NewRun {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub include_all: bool,
    #[serde(default)]
    pub case_ids: Vec<u64>,
}

#[derive(Deserialize)]
pub struct UpdateRun {
    pub name: Option<String>,
    pub description: Option<String>,
    pub include_all: Option<bool>,
    pub case_ids: Option<Vec<u64>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestResult {
    pub case_id: u64,
    pub status_id: u32,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Results {
    pub results: Vec<TestResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunList {
    pub runs: Vec<TestRun>,
}

/// What `/echo/...` saw on the wire. Repeated headers are joined with `, `.
#[derive(Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Default)]
pub struct Store {
    next_id: u64,
    runs: Vec<TestRun>,
    results: HashMap<u64, Vec<TestResult>>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/get_runs/{project_id}", get(get_runs))
        .route("/add_run/{project_id}", post(add_run))
        .route("/update_run/{run_id}", post(update_run))
        .route("/add_results_for_cases/{run_id}", post(add_results_for_cases))
        .route("/get_results_for_run/{run_id}", get(get_results_for_run))
        .route_layer(middleware::from_fn(require_auth))
        .with_state(db);
    Router::new().route("/echo/{*rest}", any(echo)).merge(api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_auth(request: Request, next: Next) -> Result<Response, StatusCode> {
    if !request.headers().contains_key(header::AUTHORIZATION) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(request).await)
}

async fn get_runs(State(db): State<Db>, Path(project_id): Path<String>) -> Json<RunList> {
    let store = db.read().await;
    let runs = store
        .runs
        .iter()
        .filter(|run| run.project_id == project_id)
        .cloned()
        .collect();
    Json(RunList { runs })
}

async fn add_run(
    State(db): State<Db>,
    Path(project_id): Path<String>,
    Json(input): Json<NewRun>,
) -> Json<TestRun> {
    let mut store = db.write().await;
    store.next_id += 1;
    let run = TestRun {
        id: store.next_id,
        project_id,
        name: input.name,
        description: input.description,
        include_all: input.include_all,
        case_ids: input.case_ids,
    };
    debug!("created run {} '{}'", run.id, run.name);
    store.runs.push(run.clone());
    Json(run)
}

async fn update_run(
    State(db): State<Db>,
    Path(run_id): Path<u64>,
    Json(input): Json<UpdateRun>,
) -> Result<Json<TestRun>, StatusCode> {
    let mut store = db.write().await;
    let run = store
        .runs
        .iter_mut()
        .find(|run| run.id == run_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        run.name = name;
    }
    if let Some(description) = input.description {
        run.description = Some(description);
    }
    if let Some(include_all) = input.include_all {
        run.include_all = include_all;
    }
    if let Some(case_ids) = input.case_ids {
        run.case_ids = case_ids;
    }
    Ok(Json(run.clone()))
}

async fn add_results_for_cases(
    State(db): State<Db>,
    Path(run_id): Path<u64>,
    Json(input): Json<Results>,
) -> Result<Json<Vec<TestResult>>, StatusCode> {
    let mut store = db.write().await;
    if !store.runs.iter().any(|run| run.id == run_id) {
        return Err(StatusCode::NOT_FOUND);
    }
    debug!("recording {} results for run {run_id}", input.results.len());
    store
        .results
        .entry(run_id)
        .or_default()
        .extend(input.results.iter().cloned());
    Ok(Json(input.results))
}

async fn get_results_for_run(
    State(db): State<Db>,
    Path(run_id): Path<u64>,
) -> Result<Json<Results>, StatusCode> {
    let store = db.read().await;
    if !store.runs.iter().any(|run| run.id == run_id) {
        return Err(StatusCode::NOT_FOUND);
    }
    let results = store.results.get(&run_id).cloned().unwrap_or_default();
    Ok(Json(Results { results }))
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Echo> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for (k, v) in &headers {
        let value = String::from_utf8_lossy(v.as_bytes());
        seen.entry(k.as_str().to_string())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: seen,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_serializes_to_json() {
        let run = TestRun {
            id: 1,
            project_id: "1".to_string(),
            name: "Test".to_string(),
            description: None,
            include_all: false,
            case_ids: Vec::new(),
        };
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Test");
        assert_eq!(json["include_all"], false);
    }

    #[test]
    fn new_run_defaults_optional_fields() {
        let input: NewRun = serde_json::from_str(r#"{"name":"Only a name"}"#).unwrap();
        assert_eq!(input.name, "Only a name");
        assert!(input.description.is_none());
        assert!(!input.include_all);
        assert!(input.case_ids.is_empty());
    }

    #[test]
    fn new_run_rejects_missing_name() {
        let result: Result<NewRun, _> = serde_json::from_str(r#"{"include_all":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_run_all_fields_optional() {
        let input: UpdateRun = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.name.is_none());
        assert!(input.include_all.is_none());
    }

    #[test]
    fn result_comment_defaults_to_empty() {
        let input: TestResult = serde_json::from_str(r#"{"case_id":1,"status_id":5}"#).unwrap();
        assert_eq!(input.status_id, 5);
        assert_eq!(input.comment, "");
    }
}
