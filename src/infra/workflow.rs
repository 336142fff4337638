//! Outbound workflow trigger.
//!
//! One unauthenticated GET with no body. Redirects are not followed,
//! so a `302` answer is the whole exchange. Any completed HTTP exchange
//! counts as triggered, whatever the status code; only transport
//! failures are errors.

use crate::domain::traits::{TriggerError, WorkflowTrigger};

pub const DEFAULT_WORKFLOW_URL: &str = "http://localhost:8080";

pub struct HttpWorkflowTrigger {
    url:    String,
    client: reqwest::blocking::Client,
}

impl HttpWorkflowTrigger {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("career-compass/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {e}"))?;
        Ok(Self { url: url.into(), client })
    }

}

impl WorkflowTrigger for HttpWorkflowTrigger {
    fn trigger(&self) -> Result<(), TriggerError> {
        tracing::debug!("GET {}", self.url);
        let response = self.client.get(&self.url).send().map_err(|e| TriggerError::Request {
            url:     self.url.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!("Workflow endpoint {} answered {}", self.url, response.status());
        Ok(())
    }
}
