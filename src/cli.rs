//! Command line arguments and their validation

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Parser;

use kubelike_logs::LikeOptions;
use kubelike_types::{
    DEFAULT_MAX_FOLLOW_CONCURRENCY, DEFAULT_POD_RUNNING_TIMEOUT, DEFAULT_SELECTOR_TAIL_LINES,
    LogRequestOptions, ResourceTarget,
};

use crate::config::Config;

const USAGE: &str = "like [-f] [-p] (POD | TYPE/NAME) [-c CONTAINER]";

/// kubectl like - print the logs of pod containers that match a regex pattern
#[derive(Parser, Debug)]
#[command(name = "kubectl-like")]
#[command(author, version, about, long_about = None)]
#[command(override_usage = "kubectl like [-f] [-p] (POD | TYPE/NAME) [CONTAINER] --pattern REGEX [options]")]
pub struct Args {
    /// Pod name, or TYPE/NAME such as deployment/web
    #[arg(value_name = "POD | TYPE/NAME")]
    pub resource: Option<String>,

    /// Container to read, as an alternative to -c
    #[arg(value_name = "CONTAINER")]
    pub inline_container: Option<String>,

    /// Regular expression each printed line must match
    #[arg(long)]
    pub pattern: Option<String>,

    /// Get logs from all pod(s). Sets prefix to true.
    #[arg(long)]
    pub all_pods: bool,

    /// Get all containers' logs in the pod(s).
    #[arg(long)]
    pub all_containers: bool,

    /// Specify if the logs should be streamed.
    #[arg(short, long)]
    pub follow: bool,

    /// Include timestamps on each line in the log output
    #[arg(long)]
    pub timestamps: bool,

    /// Maximum bytes of logs to return. Defaults to no limit.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub limit_bytes: i64,

    /// If true, print the logs for the previous instance of the container in a pod if it exists.
    #[arg(short, long)]
    pub previous: bool,

    /// Lines of recent log file to display. Defaults to -1 with no selector, showing all log
    /// lines otherwise 10, if a selector is provided.
    #[arg(long, allow_negative_numbers = true)]
    pub tail: Option<i64>,

    /// If watching / following pod logs, allow for any errors that occur to be non-fatal
    #[arg(long)]
    pub ignore_errors: bool,

    /// Only return logs after a specific date (RFC3339). Only one of since-time / since may be
    /// used.
    #[arg(long)]
    pub since_time: Option<String>,

    /// Only return logs newer than a relative duration like 5s, 2m, or 3h. Only one of
    /// since-time / since may be used.
    #[arg(long, allow_hyphen_values = true)]
    pub since: Option<String>,

    /// Print the logs of this container
    #[arg(short, long)]
    pub container: Option<String>,

    /// The length of time (like 5s, 2m, or 3h) to wait until at least one pod is found
    #[arg(long)]
    pub pod_running_timeout: Option<String>,

    /// Selector (label query) to filter on
    #[arg(short = 'l', long)]
    pub selector: Option<String>,

    /// Maximum number of concurrent logs to follow when using by a selector. Defaults to 5.
    #[arg(long)]
    pub max_log_requests: Option<usize>,

    /// Prefix each log line with the log source (pod name and container name)
    #[arg(long)]
    pub prefix: bool,

    /// Namespace to read pods from
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Path to a config file with default option values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// A fully resolved invocation
#[derive(Debug)]
pub struct LikeCommand {
    pub target: ResourceTarget,
    pub request: LogRequestOptions,
    pub all_pods: bool,
    pub all_containers: bool,
    pub options: LikeOptions,
    pub context: Option<String>,
    pub namespace: Option<String>,
    pub pod_running_timeout: Duration,
}

impl Args {
    /// Combine the arguments with `config` defaults and validate the result
    pub fn into_command(self, config: &Config) -> Result<LikeCommand> {
        let target = self.complete()?;
        self.validate()?;

        let container = self.container.clone().or_else(|| self.inline_container.clone());
        let follow = self.follow;
        let timestamps = self.timestamps || config.timestamps.unwrap_or(false);

        let tail_lines = match self.tail {
            None if target.is_selector() => Some(DEFAULT_SELECTOR_TAIL_LINES),
            Some(tail) if tail != -1 => Some(tail),
            _ => None,
        };

        let request = LogRequestOptions {
            container,
            follow,
            previous: self.previous,
            timestamps,
            since_seconds: self.since_seconds()?,
            since_time: self.since_time()?,
            tail_lines,
            limit_bytes: (self.limit_bytes != 0).then_some(self.limit_bytes),
        };

        let options = LikeOptions {
            pattern: self.pattern.clone().unwrap_or_default(),
            follow,
            ignore_errors: self.ignore_errors || config.ignore_errors.unwrap_or(false),
            max_follow_concurrency: self
                .max_log_requests
                .or(config.max_log_requests)
                .unwrap_or(DEFAULT_MAX_FOLLOW_CONCURRENCY),
            prefix: self.all_pods || self.prefix || config.prefix.unwrap_or(false),
        };

        let pod_running_timeout = match &self.pod_running_timeout {
            Some(timeout) => parse_positive_duration("--pod-running-timeout", timeout)?,
            None => config
                .pod_running_timeout()?
                .unwrap_or(DEFAULT_POD_RUNNING_TIMEOUT),
        };

        Ok(LikeCommand {
            target,
            request,
            all_pods: self.all_pods,
            all_containers: self.all_containers,
            options,
            context: self.context.or_else(|| config.context.clone()),
            namespace: self.namespace.or_else(|| config.namespace.clone()),
            pod_running_timeout,
        })
    }

    /// Work out what to read logs from
    fn complete(&self) -> Result<ResourceTarget> {
        match (&self.resource, &self.selector) {
            (None, None) => bail!(
                "expected '{}'.\nPOD or TYPE/NAME is a required argument for the logs command",
                USAGE
            ),
            (None, Some(selector)) => Ok(ResourceTarget::Selector(selector.clone())),
            (Some(_), Some(_)) => bail!("only a selector (-l) or a POD name is allowed"),
            (Some(resource), None) => resource
                .parse()
                .with_context(|| format!("invalid resource {:?}", resource)),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.pattern.as_deref().unwrap_or_default().is_empty() {
            bail!("pattern is required. Please provide a pattern to match the logs");
        }

        if self.since_time.is_some() && self.since.is_some() {
            bail!("at most one of `sinceTime` or `sinceSeconds` may be specified");
        }

        if self.all_containers {
            if let Some(container) = self.container.as_ref().or(self.inline_container.as_ref()) {
                bail!(
                    "--all-containers=true should not be specified with container name {}",
                    container
                );
            }
        }

        if self.container.is_some() && self.inline_container.is_some() {
            bail!("only one of -c or an inline [CONTAINER] arg is allowed");
        }

        if self.limit_bytes < 0 {
            bail!("--limit-bytes must be greater than 0");
        }

        if self.since.as_deref().is_some_and(|since| since.starts_with('-')) {
            bail!("--since must be greater than 0");
        }

        if self.tail.is_some_and(|tail| tail < -1) {
            bail!("--tail must be greater than or equal to -1");
        }

        Ok(())
    }

    /// `--since` rounded to the nearest second
    fn since_seconds(&self) -> Result<Option<i64>> {
        let Some(since) = &self.since else {
            return Ok(None);
        };
        let duration = humantime::parse_duration(since)
            .with_context(|| format!("invalid --since duration {:?}", since))?;
        let seconds = (duration.as_millis() + 500) / 1000;
        Ok(Some(seconds as i64))
    }

    fn since_time(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(since_time) = &self.since_time else {
            return Ok(None);
        };
        let parsed = DateTime::parse_from_rfc3339(since_time)
            .with_context(|| format!("invalid --since-time {:?}, expected RFC3339", since_time))?;
        Ok(Some(parsed.with_timezone(&Utc)))
    }
}

/// Parse a humantime duration, rejecting zero
pub fn parse_positive_duration(flag: &str, value: &str) -> Result<Duration> {
    let duration = humantime::parse_duration(value)
        .with_context(|| format!("invalid {} duration {:?}", flag, value))?;
    if duration.is_zero() {
        bail!("{} must be higher than zero", flag);
    }
    Ok(duration)
}
