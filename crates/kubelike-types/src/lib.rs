//! Shared types for kubelike
//!
//! This crate contains data structures used across multiple kubelike crates.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Maximum number of log streams followed at once unless overridden
pub const DEFAULT_MAX_FOLLOW_CONCURRENCY: usize = 5;

/// Tail applied when pods are picked by label selector and `--tail` is not given
pub const DEFAULT_SELECTOR_TAIL_LINES: i64 = 10;

/// How long to wait for pods to be resolved before giving up
pub const DEFAULT_POD_RUNNING_TIMEOUT: Duration = Duration::from_secs(20);

/// Annotation naming the container `kubectl logs` picks by default
pub const DEFAULT_CONTAINER_ANNOTATION: &str = "kubectl.kubernetes.io/default-container";

// ============================================================================
// Log Sources
// ============================================================================

static CONTAINER_FROM_FIELD_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"spec\.(?:initContainers|containers|ephemeralContainers)\{(.+)\}")
        .expect("container field path regex is valid")
});

/// Which container list of a pod spec a container was found in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContainerSection {
    Init,
    Regular,
    Ephemeral,
}

impl ContainerSection {
    /// Field name of this list inside the pod spec
    pub fn field(&self) -> &'static str {
        match self {
            Self::Init => "initContainers",
            Self::Regular => "containers",
            Self::Ephemeral => "ephemeralContainers",
        }
    }
}

/// Identity of one log source: a single container within a single pod.
///
/// Ordering follows namespace, then pod name, then field path, which is the
/// order sources are read in when they are not followed concurrently.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceRef {
    pub namespace: String,
    pub name: String,
    pub field_path: String,
    pub kind: String,
}

impl SourceRef {
    pub fn new(namespace: String, name: String, field_path: String) -> Self {
        Self {
            namespace,
            name,
            field_path,
            kind: "Pod".to_string(),
        }
    }

    /// Reference a container of a pod by its spec location
    pub fn for_container(
        namespace: &str,
        pod: &str,
        section: ContainerSection,
        container: &str,
    ) -> Self {
        Self::new(
            namespace.to_string(),
            pod.to_string(),
            format!("spec.{}{{{}}}", section.field(), container),
        )
    }

    /// Container name encoded in the field path, if it names one
    pub fn container_name(&self) -> Option<&str> {
        CONTAINER_FROM_FIELD_PATH
            .captures(&self.field_path)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Tag used to prefix lines from this source, as `pod/<name>/<container>`.
    ///
    /// Returns `None` when the reference lacks a pod name or a field path.
    /// A field path that does not name a container yields an empty container
    /// segment rather than no tag.
    pub fn container_tag(&self) -> Option<String> {
        if self.name.is_empty() || self.field_path.is_empty() {
            return None;
        }
        Some(format!(
            "pod/{}/{}",
            self.name,
            self.container_name().unwrap_or_default()
        ))
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)?;
        if let Some(container) = self.container_name() {
            write!(f, "/{}", container)?;
        }
        Ok(())
    }
}

/// Parameters for a single pod log request
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogRequestOptions {
    pub container: Option<String>,
    pub follow: bool,
    pub previous: bool,
    pub timestamps: bool,
    pub since_seconds: Option<i64>,
    pub since_time: Option<DateTime<Utc>>,
    pub tail_lines: Option<i64>,
    pub limit_bytes: Option<i64>,
}

// ============================================================================
// Resource Targets
// ============================================================================

/// What the user asked to read logs from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceTarget {
    /// A single pod by name
    Pod(String),
    /// Pods owned by a deployment
    Deployment(String),
    /// Every pod matching a label selector
    Selector(String),
}

impl ResourceTarget {
    pub fn is_selector(&self) -> bool {
        matches!(self, Self::Selector(_))
    }
}

impl fmt::Display for ResourceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pod(name) => write!(f, "pod/{}", name),
            Self::Deployment(name) => write!(f, "deployment/{}", name),
            Self::Selector(selector) => write!(f, "selector {}", selector),
        }
    }
}

/// Error returned when a `POD | TYPE/NAME` argument cannot be understood
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetParseError {
    EmptyName,
    UnsupportedKind(String),
}

impl fmt::Display for TargetParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "resource name may not be empty"),
            Self::UnsupportedKind(kind) => write!(
                f,
                "unsupported resource type {:?}, expected a pod or a deployment",
                kind
            ),
        }
    }
}

impl std::error::Error for TargetParseError {}

impl FromStr for ResourceTarget {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = match s.split_once('/') {
            Some((kind, name)) => (Some(kind), name),
            None => (None, s),
        };

        if name.is_empty() {
            return Err(TargetParseError::EmptyName);
        }

        match kind.map(str::to_ascii_lowercase).as_deref() {
            None | Some("po" | "pod" | "pods") => Ok(Self::Pod(name.to_string())),
            Some("deploy" | "deployment" | "deployments" | "deployment.apps") => {
                Ok(Self::Deployment(name.to_string()))
            }
            Some(_) => Err(TargetParseError::UnsupportedKind(
                kind.unwrap_or_default().to_string(),
            )),
        }
    }
}
