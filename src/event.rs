//! Analytics events and the outbound hit built from them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Action name used for screen views
pub const SCREEN_VIEW_ACTION: &str = "page_view";
/// Event type used for screen views
pub const SCREEN_VIEW_TYPE: &str = "page";

fn default_event_type() -> String {
    "click".to_string()
}

/// An analytics event to be tracked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub name: String,
    pub location: String,
    #[serde(rename = "type", default = "default_event_type")]
    pub event_type: String,
    pub path: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl AnalyticsEvent {
    /// A click event at `location` on the screen at `path`.
    pub fn new(name: impl Into<String>, location: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            event_type: default_event_type(),
            path: path.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn screen_view(path: impl Into<String>) -> Self {
        Self {
            name: SCREEN_VIEW_ACTION.to_string(),
            location: String::new(),
            event_type: SCREEN_VIEW_TYPE.to_string(),
            path: path.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.params.extend(params);
        self
    }
}

/// Everything resolved inside the dispatch critical section for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub tracking_id: String,
    pub client_id: String,
    pub session_id: String,
    pub user_id: String,
    pub braze_id: String,
    pub user_agent: String,
    pub experiment_id: Option<String>,
    pub platform: String,
    pub event: AnalyticsEvent,
}

impl Hit {
    /// Caller params, then `user_agent`, then `ex_id` when set. A caller key with
    /// the same name keeps its position and takes the fixed value.
    pub fn merged_params(&self) -> Map<String, Value> {
        let mut merged: Map<String, Value> = self
            .event
            .params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        merged.insert("user_agent".to_string(), Value::String(self.user_agent.clone()));
        if let Some(ex_id) = &self.experiment_id {
            merged.insert("ex_id".to_string(), Value::String(ex_id.clone()));
        }
        merged
    }

    /// Compact JSON of [`Hit::merged_params`].
    pub fn params_json(&self) -> String {
        Value::Object(self.merged_params()).to_string()
    }

    /// Query parameters for the collection GET, in wire order.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("v", "1".to_string()),
            ("t", "event".to_string()),
            ("tid", self.tracking_id.clone()),
            ("cid", self.client_id.clone()),
            ("ea", self.event.name.clone()),
            ("l", self.event.location.clone()),
            ("u.fss", self.session_id.clone()),
            ("u.f", self.client_id.clone()),
            ("u.e", self.braze_id.clone()),
            ("u.i", self.user_id.clone()),
            ("p", self.params_json()),
            ("ph", self.event.path.clone()),
            ("et", self.event.event_type.clone()),
            ("d", self.platform.clone()),
        ]
    }
}
