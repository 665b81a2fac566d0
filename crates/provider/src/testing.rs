//! In-memory NAS API used by the unit tests

use std::collections::{HashMap, VecDeque};

use alinas_common::{ApiError, Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::client::{NasApi, RequestParams};

#[derive(Default)]
struct Inner {
    sticky: HashMap<String, std::result::Result<Value, ApiError>>,
    once: HashMap<String, VecDeque<ApiError>>,
    log: Vec<(String, RequestParams)>,
}

/// Scripted responses keyed by action name
#[derive(Default)]
pub struct FakeNas {
    inner: Mutex<Inner>,
}

fn api_error(status: u16, code: &str) -> ApiError {
    ApiError {
        status,
        code: code.to_string(),
        message: format!("{} (fake)", code),
        request_id: "fake-request".to_string(),
    }
}

impl FakeNas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call to `action` with `body`
    pub fn respond(&self, action: &str, body: Value) {
        self.inner.lock().sticky.insert(action.to_string(), Ok(body));
    }

    /// Fail every call to `action`
    pub fn fail(&self, action: &str, status: u16, code: &str) {
        self.inner
            .lock()
            .sticky
            .insert(action.to_string(), Err(api_error(status, code)));
    }

    /// Fail the next call to `action` only
    pub fn fail_once(&self, action: &str, status: u16, code: &str) {
        self.inner
            .lock()
            .once
            .entry(action.to_string())
            .or_default()
            .push_back(api_error(status, code));
    }

    pub fn calls(&self, action: &str) -> usize {
        self.inner.lock().log.iter().filter(|(a, _)| a == action).count()
    }

    pub fn actions(&self) -> Vec<String> {
        self.inner.lock().log.iter().map(|(a, _)| a.clone()).collect()
    }

    pub fn last_params(&self, action: &str) -> Option<RequestParams> {
        self.inner
            .lock()
            .log
            .iter()
            .rev()
            .find(|(a, _)| a == action)
            .map(|(_, p)| p.clone())
    }
}

#[async_trait]
impl NasApi for FakeNas {
    fn region(&self) -> &str {
        "cn-hangzhou"
    }

    async fn call(&self, action: &str, params: &RequestParams) -> Result<Value> {
        let mut inner = self.inner.lock();
        inner.log.push((action.to_string(), params.clone()));

        if let Some(err) = inner.once.get_mut(action).and_then(VecDeque::pop_front) {
            return Err(Error::Api(err));
        }
        match inner.sticky.get(action) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(err)) => Err(Error::Api(err.clone())),
            None => Ok(json!({ "RequestId": "fake-request" })),
        }
    }
}
