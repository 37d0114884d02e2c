use crate::error::{self, Result};
use crate::gateway::{ClusterGateway, SpinnakerEndpoints};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Pod, Service};
use kube::api::{ListParams, ObjectMeta, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use log::{debug, info};
use snafu::{OptionExt, ResultExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tokio::time::{sleep, Duration};

const DECK_DEPLOYMENT: &str = "spin-deck";
const GATE_DEPLOYMENT: &str = "spin-gate";

const STABILIZE_ATTEMPTS: u32 = 60;
const STABILIZE_DELAY: Duration = Duration::from_secs(5);

/// Production [`ClusterGateway`]: manifest and overlay application shells out to `kubectl`,
/// structured queries (namespaces, deployments, pods, services) go through a [`kube::Client`]
/// built from the same kubeconfig, and HTTP goes through `reqwest`.
pub struct KubectlGateway {
    kubeconfig: PathBuf,
    client: Client,
    http: reqwest::Client,
}

impl KubectlGateway {
    /// Create a gateway for the cluster described by the kubeconfig at `kubeconfig`.
    pub async fn new(kubeconfig: &Path) -> Result<Self> {
        let config = Kubeconfig::read_from(kubeconfig).context(error::ConfigReadSnafu)?;
        let config = Config::from_custom_kubeconfig(config, &KubeConfigOptions::default())
            .await
            .context(error::ClientCreateKubeconfigSnafu)?;
        Ok(Self {
            kubeconfig: kubeconfig.to_path_buf(),
            client: config.try_into().context(error::KubeSnafu {
                action: "create client from `Kubeconfig`",
            })?,
            http: reqwest::Client::new(),
        })
    }

    fn kubectl(&self) -> Command {
        let mut command = Command::new("kubectl");
        command.arg("--kubeconfig").arg(&self.kubeconfig);
        command
    }

    fn run_kubectl(&self, mut command: Command, what: &str) -> Result<String> {
        let output = command.output().context(error::CommandSnafu { command: what })?;
        if !output.status.success() {
            return error::CommandStatusSnafu {
                command: what,
                code: output.status.code().unwrap_or(1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            }
            .fail();
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn service_endpoint(&self, namespace: &str, service: &str) -> Result<Option<String>> {
        let api = Api::<Service>::namespaced(self.client.clone(), namespace);
        let svc = api.get(service).await.context(error::KubeSnafu {
            action: format!("get service '{}'", service),
        })?;
        let port = svc
            .spec
            .as_ref()
            .and_then(|spec| spec.ports.as_ref())
            .and_then(|ports| ports.first())
            .map(|port| port.port)
            .context(error::NotFoundSnafu {
                what: format!("port of service '{}'", service),
            })?;
        let host = svc
            .status
            .and_then(|status| status.load_balancer)
            .and_then(|lb| lb.ingress)
            .and_then(|ingress| ingress.into_iter().next())
            .and_then(|ingress| ingress.hostname.or(ingress.ip));
        Ok(host.map(|host| format!("http://{}:{}", host, port)))
    }

    /// Poll until the service's load balancer has a reachable address.
    async fn wait_for_service_endpoint(&self, namespace: &str, service: &str) -> Result<String> {
        for _ in 0..STABILIZE_ATTEMPTS {
            if let Some(url) = self.service_endpoint(namespace, service).await? {
                return Ok(url);
            }
            debug!("Service '{}' has no external address yet", service);
            sleep(STABILIZE_DELAY).await;
        }
        error::NotFoundSnafu {
            what: format!(
                "external address of service '{}' in namespace '{}'",
                service, namespace
            ),
        }
        .fail()
    }
}

#[async_trait]
impl ClusterGateway for KubectlGateway {
    async fn apply_manifest(&self, namespace: &str, path: &Path) -> Result<()> {
        let mut command = self.kubectl();
        command.args(["-n", namespace, "apply", "-f"]).arg(path);
        self.run_kubectl(command, "kubectl apply -f")?;
        Ok(())
    }

    async fn apply_kustomize(&self, namespace: &str, path: &Path) -> Result<()> {
        let mut command = self.kubectl();
        command.args(["-n", namespace, "apply", "-k"]).arg(path);
        self.run_kubectl(command, "kubectl apply -k")?;
        Ok(())
    }

    async fn substitute_overlay_vars(
        &self,
        path: &Path,
        vars: &BTreeMap<String, String>,
    ) -> Result<()> {
        let entries = std::fs::read_dir(path).context(error::FileSnafu { path })?;
        for entry in entries {
            let entry = entry.context(error::FileSnafu { path })?;
            let template = entry.path();
            if template.extension().map(|ext| ext != "template").unwrap_or(true) {
                continue;
            }
            let mut contents =
                std::fs::read_to_string(&template).context(error::FileSnafu { path: &template })?;
            for (key, value) in vars {
                contents = contents.replace(&format!("${{{}}}", key), value);
            }
            let target = template.with_extension("");
            debug!("Writing templated overlay file {}", target.display());
            std::fs::write(&target, contents).context(error::FileSnafu { path: target })?;
        }
        Ok(())
    }

    async fn create_namespace(&self, name: &str) -> Result<()> {
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let api = Api::<Namespace>::all(self.client.clone());
        api.create(&PostParams::default(), &namespace)
            .await
            .context(error::KubeSnafu {
                action: format!("create namespace '{}'", name),
            })?;

        // Give the object enough time to settle.
        let mut sleep_count = 0;
        while api.get(name).await.is_err() && sleep_count < 20 {
            sleep(Duration::from_millis(50)).await;
            sleep_count += 1;
        }
        api.get(name).await.context(error::KubeSnafu {
            action: format!("get namespace '{}'", name),
        })?;
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        let api = Api::<Namespace>::all(self.client.clone());
        api.delete(name, &Default::default())
            .await
            .context(error::KubeSnafu {
                action: format!("delete namespace '{}'", name),
            })?;
        Ok(())
    }

    async fn wait_for_deployment_stable(&self, namespace: &str, deployment: &str) -> Result<()> {
        let api = Api::<Deployment>::namespaced(self.client.clone(), namespace);
        for _ in 0..STABILIZE_ATTEMPTS {
            let current = api.get(deployment).await.context(error::KubeSnafu {
                action: format!("get deployment '{}'", deployment),
            })?;
            let desired = current
                .spec
                .as_ref()
                .and_then(|spec| spec.replicas)
                .unwrap_or(1);
            let ready = current
                .status
                .as_ref()
                .and_then(|status| status.ready_replicas)
                .unwrap_or(0);
            if ready == desired {
                info!("Deployment '{}' is stable", deployment);
                return Ok(());
            }
            debug!(
                "Deployment '{}' has {}/{} ready replicas",
                deployment, ready, desired
            );
            sleep(STABILIZE_DELAY).await;
        }
        error::DeploymentNotStableSnafu {
            namespace,
            deployment,
        }
        .fail()
    }

    async fn run_command(&self, command: &str) -> Result<String> {
        debug!("Running '{}'", command);
        let mut shell = Command::new("sh");
        shell.arg("-c").arg(command);
        self.run_kubectl(shell, command)
    }

    async fn http_get(&self, url: &str) -> Result<String> {
        self.http
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context(error::HttpGetSnafu { url })?
            .text()
            .await
            .context(error::HttpGetSnafu { url })
    }

    async fn find_pod(&self, namespace: &str, name_contains: &str) -> Result<String> {
        let api = Api::<Pod>::namespaced(self.client.clone(), namespace);
        let pods = api
            .list(&ListParams::default())
            .await
            .context(error::KubeSnafu {
                action: format!("list pods in namespace '{}'", namespace),
            })?;
        pods.into_iter()
            .filter(|pod| {
                pod.status
                    .as_ref()
                    .and_then(|status| status.phase.as_deref())
                    == Some("Running")
            })
            .map(|pod| pod.name_any())
            .find(|name| name.contains(name_contains))
            .context(error::NotFoundSnafu {
                what: format!(
                    "running pod matching '{}' in namespace '{}'",
                    name_contains, namespace
                ),
            })
    }

    async fn deploy_spinnaker(
        &self,
        namespace: &str,
        kustomization: &Path,
    ) -> Result<SpinnakerEndpoints> {
        self.apply_kustomize(namespace, kustomization).await?;
        self.wait_for_deployment_stable(namespace, DECK_DEPLOYMENT)
            .await?;
        self.wait_for_deployment_stable(namespace, GATE_DEPLOYMENT)
            .await?;
        let deck_url = self
            .wait_for_service_endpoint(namespace, DECK_DEPLOYMENT)
            .await?;
        let gate_url = self
            .wait_for_service_endpoint(namespace, GATE_DEPLOYMENT)
            .await?;
        info!("Spinnaker reachable at {} (ui) and {} (api)", deck_url, gate_url);
        Ok(SpinnakerEndpoints { deck_url, gate_url })
    }
}
