//! DTOs for the TestRail v2 API.
//!
//! # Design
//! These mirror the JSON TestRail exchanges but are defined independently of
//! the mock server's copies. Integration tests catch any schema drift between
//! the two crates. Optional run fields are left out of the payload when unset
//! so `add_run` and `update_run` only touch what the caller filled in.

use serde::{Deserialize, Serialize};

/// Status id TestRail uses for a passed test.
pub const STATUS_PASSED: u32 = 1;
/// Status id TestRail uses for a failed test.
pub const STATUS_FAILED: u32 = 5;

/// A test run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestRun {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<u64>,
    #[serde(rename = "assignedto_id", default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<u64>,
    #[serde(default)]
    pub include_all: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub case_ids: Vec<u64>,
}

impl TestRun {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// The outcome of one test case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestResult {
    pub case_id: u64,
    pub status_id: u32,
    #[serde(default)]
    pub comment: String,
}

/// Payload for `add_results_for_cases`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Results {
    pub results: Vec<TestResult>,
}

/// Response body of `get_runs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunList {
    #[serde(default)]
    pub runs: Vec<TestRun>,
}
