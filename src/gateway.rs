use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

/// Values substituted into kustomize overlay templates. Implemented by anything the harness
/// templates an overlay with (the resolved [`Vars`](crate::Vars), an
/// [`Operator`](crate::Operator)).
pub trait Substitutions {
    fn substitutions(&self) -> BTreeMap<String, String>;
}

/// Externally reachable endpoints of a deployed Spinnaker instance.
#[derive(Debug, Clone)]
pub struct SpinnakerEndpoints {
    /// The UI (deck) base url.
    pub deck_url: String,
    /// The API (gate) base url.
    pub gate_url: String,
}

/// The narrow interface through which the harness touches the cluster. The harness decides
/// *when* and *whether* each operation runs; implementations decide *how*. Production code uses
/// [`KubectlGateway`](crate::KubectlGateway); tests substitute a mock.
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    /// Apply a manifest file into `namespace`.
    async fn apply_manifest(&self, namespace: &str, path: &Path) -> Result<()>;

    /// Apply a kustomize overlay into `namespace`.
    async fn apply_kustomize(&self, namespace: &str, path: &Path) -> Result<()>;

    /// Materialize the overlay's templates at `path` with the given variable values.
    async fn substitute_overlay_vars(
        &self,
        path: &Path,
        vars: &BTreeMap<String, String>,
    ) -> Result<()>;

    async fn create_namespace(&self, name: &str) -> Result<()>;

    async fn delete_namespace(&self, name: &str) -> Result<()>;

    /// Block until `deployment`'s running replica count matches its desired count. The wait is
    /// bounded; expiry is an error.
    async fn wait_for_deployment_stable(&self, namespace: &str, deployment: &str) -> Result<()>;

    /// Run an ad-hoc shell command, returning its stdout. A non-zero exit status is an error.
    async fn run_command(&self, command: &str) -> Result<String>;

    /// HTTP GET returning the response body.
    async fn http_get(&self, url: &str) -> Result<String>;

    /// Find the name of a running pod in `namespace` whose name contains `name_contains`.
    async fn find_pod(&self, namespace: &str, name_contains: &str) -> Result<String>;

    /// Deploy a Spinnaker instance from `kustomization` into `namespace` and discover its
    /// endpoints once it is reachable.
    async fn deploy_spinnaker(
        &self,
        namespace: &str,
        kustomization: &Path,
    ) -> Result<SpinnakerEndpoints>;
}
