use serde::Serialize;
use url::Url;

use super::wire::{self, OverrideRequestWire, PredictRequestWire};
use super::{PlanningApi, RemoteError};
use crate::fleet::{OverrideRequest, PredictionOptions, SystemStatus, Train};
use crate::http_client::{self, TransportLimits};

const STATUS_PATH: &str = "status";
const INDUCTION_LIST_PATH: &str = "get_induction_list";
const REFRESH_PATH: &str = "refresh_data";
const PREDICT_PATH: &str = "predict_induction";
const OVERRIDE_PATH: &str = "override_train";
const CLEAR_OVERRIDES_PATH: &str = "clear_overrides";

#[derive(Clone, Copy, Debug)]
enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// HTTP client for the planning service.
#[derive(Clone, Debug)]
pub struct PlanningClient {
    base_url: Url,
    agent: ureq::Agent,
    max_response_bytes: usize,
}

impl PlanningClient {
    /// Create a client rooted at `base_url`; endpoint paths are resolved beneath it.
    pub fn new(mut base_url: Url, limits: TransportLimits) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            agent: http_client::agent(&limits),
            max_response_bytes: limits.max_response_bytes,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(path)
            .map_err(|err| RemoteError::Network(format!("Invalid endpoint {path}: {err}")))
    }

    fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, RemoteError> {
        let url = self.endpoint(path)?;
        tracing::debug!(method = method.as_str(), %url, "Planning service request");
        let request = self
            .agent
            .request(method.as_str(), url.as_str())
            .set("Content-Type", "application/json")
            .set("Accept", "application/json");
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        match result {
            Ok(response) => self.read_body(response),
            Err(ureq::Error::Status(code, response)) => {
                let body = self.read_body(response).unwrap_or_default();
                let message = wire::error_message(&body)
                    .unwrap_or_else(|| format!("{} {path} failed", method.as_str()));
                Err(RemoteError::Service {
                    status: Some(code),
                    message,
                })
            }
            Err(ureq::Error::Transport(err)) => Err(RemoteError::Network(err.to_string())),
        }
    }

    fn read_body(&self, response: ureq::Response) -> Result<Vec<u8>, RemoteError> {
        http_client::read_response_bytes(response, self.max_response_bytes).map_err(|err| {
            if err.kind() == std::io::ErrorKind::InvalidData {
                RemoteError::Malformed(err.to_string())
            } else {
                RemoteError::Network(err.to_string())
            }
        })
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        self.send::<()>(Method::Get, path, None)
    }
}

impl PlanningApi for PlanningClient {
    fn get_status(&self) -> Result<SystemStatus, RemoteError> {
        let body = self.get(STATUS_PATH)?;
        wire::decode_status(&body)
    }

    fn get_induction_list(&self) -> Result<Vec<Train>, RemoteError> {
        let body = self.get(INDUCTION_LIST_PATH)?;
        wire::decode_induction_list(&body)
    }

    fn refresh_data(&self) -> Result<(), RemoteError> {
        let body = self.get(REFRESH_PATH)?;
        wire::check_ack(&body)
    }

    fn predict_induction(&self, options: &PredictionOptions) -> Result<(), RemoteError> {
        let payload = PredictRequestWire::from(options);
        let body = self.send(Method::Post, PREDICT_PATH, Some(&payload))?;
        wire::check_ack(&body)
    }

    fn override_train(&self, request: &OverrideRequest) -> Result<(), RemoteError> {
        let payload = OverrideRequestWire::from(request);
        let body = self.send(Method::Post, OVERRIDE_PATH, Some(&payload))?;
        wire::check_ack(&body)
    }

    fn clear_overrides(&self) -> Result<(), RemoteError> {
        let body = self.send::<()>(Method::Delete, CLEAR_OVERRIDES_PATH, None)?;
        wire::check_ack(&body)
    }
}
