use crate::config::{Defaults, Vars};
use crate::error::Result;
use crate::gateway::{ClusterGateway, Substitutions};
use crate::operator::{install_operator, Operator, OperatorMode};
use log::{debug, info};
use std::path::Path;
use tokio::sync::Mutex;

const SPINNAKER_BASE_OVERLAY: &str = "testdata/spinnaker/base";

/// Process-wide owner of the expensive shared cluster-side state: the base environment
/// (resolved configuration, CRDs and base overlay, installed once) and the single cluster-mode
/// operator. Both slots are lazily filled under their own lock; the first caller performs the
/// setup while holding it, later callers read the cached result.
///
/// A failed initialization leaves its slot empty, so a later test re-attempts the setup
/// rather than inheriting a poisoned state.
pub struct SharedEnvironment {
    defaults: Defaults,
    base: Mutex<Option<Vars>>,
    cluster_operator: Mutex<Option<Operator>>,
}

/// One test's private view of the environment: the shared configuration plus this test's own
/// operator and discovered endpoints. Never shared between tests.
#[derive(Debug, Clone)]
pub struct TestEnv {
    pub vars: Vars,
    pub operator: Option<Operator>,
    pub spin_deck_url: Option<String>,
    pub spin_gate_url: Option<String>,
}

impl SharedEnvironment {
    pub fn new(defaults: Defaults) -> Self {
        Self {
            defaults,
            base: Mutex::new(None),
            cluster_operator: Mutex::new(None),
        }
    }

    /// Get or initialize the base environment, returning a fresh per-test view of it. The
    /// first caller resolves the configuration, templates the operator base overlay, installs
    /// the CRDs and templates the Spinnaker base overlay; everyone else waits on the lock and
    /// then reads the cached [`Vars`].
    pub async fn common_setup<G: ClusterGateway>(&self, gateway: &G) -> Result<TestEnv> {
        let mut base = self.base.lock().await;
        let vars = match base.as_ref() {
            Some(vars) => {
                debug!("Environment already initialized");
                vars.clone()
            }
            None => {
                let vars = Vars::resolve(&self.defaults)?;
                gateway
                    .substitute_overlay_vars(
                        &self.defaults.operator_kustomize_base,
                        &vars.substitutions(),
                    )
                    .await?;
                self.install_crds(gateway, &vars).await?;
                gateway
                    .substitute_overlay_vars(
                        Path::new(SPINNAKER_BASE_OVERLAY),
                        &vars.substitutions(),
                    )
                    .await?;
                *base = Some(vars.clone());
                vars
            }
        };
        Ok(TestEnv {
            vars,
            operator: None,
            spin_deck_url: None,
            spin_gate_url: None,
        })
    }

    /// `common_setup` plus an operator installation. Cluster mode installs the shared operator
    /// at most once per process and hands out read-only copies; namespaced mode provisions a
    /// fresh, test-owned operator on every call.
    pub async fn install_crds_and_operator<G: ClusterGateway>(
        &self,
        gateway: &G,
        spin_namespace: &str,
        mode: OperatorMode,
    ) -> Result<TestEnv> {
        let mut env = self.common_setup(gateway).await?;
        env.vars.spin_namespace = spin_namespace.to_string();
        let operator = match mode {
            OperatorMode::Cluster => {
                let mut shared = self.cluster_operator.lock().await;
                match shared.as_ref() {
                    Some(op) => {
                        debug!("Operator in cluster mode already installed");
                        op.clone()
                    }
                    None => {
                        let op = install_operator(gateway, mode).await?;
                        *shared = Some(op.clone());
                        op
                    }
                }
            }
            OperatorMode::Namespaced => install_operator(gateway, mode).await?,
        };
        env.operator = Some(operator);
        Ok(env)
    }

    async fn install_crds<G: ClusterGateway>(&self, gateway: &G, vars: &Vars) -> Result<()> {
        gateway
            .apply_manifest("default", &self.defaults.crd_manifests)
            .await?;
        // The api server registers CRDs asynchronously; a successful get proves they landed.
        gateway
            .run_command(&format!("{} get spinsvc", vars.kubectl_prefix()))
            .await?;
        gateway
            .run_command(&format!("{} get spinnakeraccounts", vars.kubectl_prefix()))
            .await?;
        Ok(())
    }
}

impl TestEnv {
    /// Delete this test's own operator namespace. The shared cluster-mode operator is a
    /// process-lifetime resource and is left running.
    pub async fn cleanup<G: ClusterGateway>(&mut self, gateway: &G) -> Result<()> {
        match self.operator.take() {
            Some(op) if op.mode == OperatorMode::Namespaced => {
                info!("Deleting operator namespace {}", op.namespace);
                gateway.delete_namespace(&op.namespace).await
            }
            Some(op) => {
                debug!(
                    "Leaving shared cluster-mode operator in namespace {}",
                    op.namespace
                );
                self.operator = Some(op);
                Ok(())
            }
            None => Ok(()),
        }
    }
}
