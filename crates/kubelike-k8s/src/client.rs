//! Kubernetes client for kubelike

use anyhow::{Context, Result, bail};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use tracing::debug;

use kubelike_logs::LogSources;
use kubelike_types::{
    ContainerSection, DEFAULT_CONTAINER_ANNOTATION, LogRequestOptions, ResourceTarget, SourceRef,
};

use crate::source::{PodLogSource, log_params};

/// Kubernetes client wrapper
pub struct KubeClient {
    client: kube::Client,
    namespace: String,
}

impl KubeClient {
    /// Create a client for `context` (or the current context) by loading the kubeconfig.
    ///
    /// Without an explicit `namespace`, the namespace of the context is used.
    pub async fn new(context: Option<&str>, namespace: Option<&str>) -> Result<Self> {
        let kubeconfig =
            Kubeconfig::read().context("Failed to read kubeconfig. Is kubectl configured?")?;

        let config = kube::Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: context.map(str::to_string),
                ..Default::default()
            },
        )
        .await
        .context(format!(
            "Failed to create config for context: {}",
            context.unwrap_or("<current>")
        ))?;

        let namespace = namespace
            .map(str::to_string)
            .unwrap_or_else(|| config.default_namespace.clone());

        let client = kube::Client::try_from(config).context("Failed to create client")?;

        Ok(Self { client, namespace })
    }

    /// Namespace every lookup runs in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Resolve `target` into one log source per selected container.
    ///
    /// Deployments only contribute their first pod unless `all_pods` is set.
    pub async fn resolve_sources(
        &self,
        target: &ResourceTarget,
        request: &LogRequestOptions,
        all_pods: bool,
        all_containers: bool,
    ) -> Result<LogSources> {
        let pods = self.pods_for_target(target, all_pods).await?;
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);

        let mut sources = LogSources::new();
        for pod in &pods {
            let pod_name = pod.metadata.name.clone().unwrap_or_default();
            let containers = select_containers(pod, request.container.as_deref(), all_containers)?;

            for (section, container) in containers {
                let source_ref =
                    SourceRef::for_container(&self.namespace, &pod_name, section, &container);
                let source = PodLogSource::new(
                    api.clone(),
                    pod_name.clone(),
                    log_params(request, &container),
                );
                sources.insert(source_ref, Box::new(source));
            }
        }

        debug!(resource = %target, sources = sources.len(), "resolved log sources");
        Ok(sources)
    }

    async fn pods_for_target(&self, target: &ResourceTarget, all_pods: bool) -> Result<Vec<Pod>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);

        match target {
            ResourceTarget::Pod(name) => {
                let pod = pods.get(name).await.context(format!(
                    "Failed to get pod '{}' in namespace '{}'",
                    name, self.namespace
                ))?;
                Ok(vec![pod])
            }
            ResourceTarget::Selector(selector) => {
                let list = pods
                    .list(&ListParams::default().labels(selector))
                    .await
                    .context(format!("Failed to list pods matching {}", selector))?;
                Ok(list.items)
            }
            ResourceTarget::Deployment(name) => {
                let deployments: Api<Deployment> =
                    Api::namespaced(self.client.clone(), &self.namespace);
                let deploy = deployments.get(name).await.context(format!(
                    "Failed to get deployment '{}' in namespace '{}'",
                    name, self.namespace
                ))?;

                let Some(label_selector) = deployment_selector(&deploy) else {
                    bail!("deployment '{}' has no label selector", name);
                };

                let list = pods
                    .list(&ListParams::default().labels(&label_selector))
                    .await
                    .context(format!("Failed to list pods for deployment {}", name))?;

                let mut items = list.items;
                if items.is_empty() {
                    bail!("no pods found for deployment/{}", name);
                }
                items.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
                if !all_pods {
                    items.truncate(1);
                }
                Ok(items)
            }
        }
    }
}

/// Label selector string built from a deployment's `matchLabels`
fn deployment_selector(deploy: &Deployment) -> Option<String> {
    let labels = deploy.spec.as_ref()?.selector.match_labels.as_ref()?;
    if labels.is_empty() {
        return None;
    }
    Some(
        labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Pick the containers of `pod` whose logs should be read
fn select_containers(
    pod: &Pod,
    container: Option<&str>,
    all_containers: bool,
) -> Result<Vec<(ContainerSection, String)>> {
    let pod_name = pod.metadata.name.as_deref().unwrap_or_default();
    let Some(spec) = &pod.spec else {
        bail!("pod '{}' has no spec", pod_name);
    };

    let mut known = Vec::new();
    for c in spec.init_containers.iter().flatten() {
        known.push((ContainerSection::Init, c.name.clone()));
    }
    for c in &spec.containers {
        known.push((ContainerSection::Regular, c.name.clone()));
    }
    for c in spec.ephemeral_containers.iter().flatten() {
        known.push((ContainerSection::Ephemeral, c.name.clone()));
    }

    if all_containers {
        return Ok(known);
    }

    if let Some(wanted) = container {
        return match known.into_iter().find(|(_, name)| name == wanted) {
            Some(found) => Ok(vec![found]),
            None => bail!("container {} is not valid for pod {}", wanted, pod_name),
        };
    }

    let annotated = pod
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(DEFAULT_CONTAINER_ANNOTATION));
    if let Some(default) = annotated {
        if let Some(found) = known.iter().find(|(_, name)| name == default) {
            return Ok(vec![found.clone()]);
        }
    }

    match spec.containers.first() {
        Some(first) => {
            if spec.containers.len() > 1 {
                debug!(pod = pod_name, container = %first.name, "defaulted container");
            }
            Ok(vec![(ContainerSection::Regular, first.name.clone())])
        }
        None => bail!("pod '{}' has no containers", pod_name),
    }
}
