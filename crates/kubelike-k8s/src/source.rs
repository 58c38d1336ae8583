use std::io;

use futures::future::BoxFuture;
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::LogParams;

use kubelike_logs::{LogSource, LogStream};
use kubelike_types::LogRequestOptions;

/// Log stream of one container, opened through the pod log API
pub struct PodLogSource {
    api: Api<Pod>,
    pod: String,
    params: LogParams,
}

impl PodLogSource {
    pub fn new(api: Api<Pod>, pod: String, params: LogParams) -> Self {
        Self { api, pod, params }
    }
}

impl LogSource for PodLogSource {
    fn open(&self) -> BoxFuture<'_, io::Result<LogStream>> {
        Box::pin(async move {
            let stream = self
                .api
                .log_stream(&self.pod, &self.params)
                .await
                .map_err(io::Error::other)?;
            Ok(Box::pin(stream) as LogStream)
        })
    }
}

/// Build the log request for a single container
pub fn log_params(request: &LogRequestOptions, container: &str) -> LogParams {
    LogParams {
        container: Some(container.to_string()),
        follow: request.follow,
        previous: request.previous,
        timestamps: request.timestamps,
        since_seconds: request.since_seconds,
        since_time: request.since_time,
        tail_lines: request.tail_lines,
        limit_bytes: request.limit_bytes,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_params_copy_request() {
        let request = LogRequestOptions {
            container: Some("ignored".to_string()),
            follow: true,
            previous: true,
            timestamps: true,
            since_seconds: Some(300),
            tail_lines: Some(10),
            limit_bytes: Some(4096),
            ..Default::default()
        };

        let params = log_params(&request, "nginx");
        assert_eq!(params.container.as_deref(), Some("nginx"));
        assert!(params.follow);
        assert!(params.previous);
        assert!(params.timestamps);
        assert_eq!(params.since_seconds, Some(300));
        assert_eq!(params.since_time, None);
        assert_eq!(params.tail_lines, Some(10));
        assert_eq!(params.limit_bytes, Some(4096));
    }

    #[test]
    fn test_log_params_defaults() {
        let params = log_params(&LogRequestOptions::default(), "app");
        assert!(!params.follow);
        assert_eq!(params.tail_lines, None);
        assert_eq!(params.since_seconds, None);
    }
}
