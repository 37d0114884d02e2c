use crate::error::Result;
use crate::gateway::{ClusterGateway, Substitutions};
use log::info;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Name of the deployment created by the operator overlays.
pub const OPERATOR_DEPLOYMENT: &str = "spinnaker-operator";

const NAMESPACED_OVERLAY: &str = "testdata/operator/overlay_basicmode";
const CLUSTER_OVERLAY: &str = "testdata/operator/overlay_clustermode";

/// Whether an operator manages resources across the whole cluster or only within its own
/// namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorMode {
    /// One operator per test, owned by that test and destroyed at test end.
    Namespaced,
    /// A single operator shared by all cluster-mode tests for the process lifetime.
    Cluster,
}

impl OperatorMode {
    fn kustomization_path(&self) -> &'static Path {
        match self {
            OperatorMode::Namespaced => Path::new(NAMESPACED_OVERLAY),
            OperatorMode::Cluster => Path::new(CLUSTER_OVERLAY),
        }
    }
}

/// One operator installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub mode: OperatorMode,
    pub kustomization_path: PathBuf,
    pub namespace: String,
    pub pod_name: String,
}

impl Substitutions for Operator {
    fn substitutions(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("NAMESPACE".to_string(), self.namespace.clone())])
    }
}

/// Provision a fresh operator installation: template the overlay for a new pseudo-random
/// namespace, create the namespace, apply the overlay, wait for the deployment and discover
/// the running pod. Any step failing short-circuits the rest.
pub(crate) async fn install_operator<G: ClusterGateway>(
    gateway: &G,
    mode: OperatorMode,
) -> Result<Operator> {
    let mut op = Operator {
        mode,
        kustomization_path: mode.kustomization_path().to_path_buf(),
        namespace: random_namespace("operator"),
        pod_name: String::new(),
    };
    info!("Installing CRDs and operator in namespace {}", op.namespace);
    gateway
        .substitute_overlay_vars(&op.kustomization_path, &op.substitutions())
        .await?;
    gateway.create_namespace(&op.namespace).await?;
    gateway
        .apply_kustomize(&op.namespace, &op.kustomization_path)
        .await?;
    gateway
        .wait_for_deployment_stable(&op.namespace, OPERATOR_DEPLOYMENT)
        .await?;
    op.pod_name = gateway.find_pod(&op.namespace, OPERATOR_DEPLOYMENT).await?;
    info!("CRDs and operator installed, pod {}", op.pod_name);
    Ok(op)
}

fn random_namespace(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_namespaces_are_distinct() {
        let a = random_namespace("operator");
        let b = random_namespace("operator");
        assert!(a.starts_with("operator-"));
        assert_ne!(a, b);
    }
}
