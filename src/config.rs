use crate::error::{self, Result};
use crate::gateway::Substitutions;
use log::info;
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

pub const KUBECONFIG_VAR: &str = "KUBECONFIG";
pub const OPERATOR_IMAGE_VAR: &str = "OPERATOR_IMAGE";
pub const HALYARD_IMAGE_VAR: &str = "HALYARD_IMAGE";
pub const BUCKET_VAR: &str = "S3_BUCKET";
pub const BUCKET_REGION_VAR: &str = "S3_BUCKET_REGION";

/// Fallback values for everything a test run needs. Supplied once per process by the test
/// binary; environment variables take precedence over each default.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub operator_image: String,
    pub halyard_image: String,
    pub bucket: String,
    pub bucket_region: String,
    /// Path to the manifest file containing the operator CRDs.
    pub crd_manifests: PathBuf,
    /// Path to the operator's base kustomize overlay.
    pub operator_kustomize_base: PathBuf,
}

/// The configuration in effect for this process, used in kustomize templates. Each field is
/// either an explicit override from the environment or the corresponding default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars {
    pub kubeconfig: String,
    pub operator_image: String,
    pub halyard_image: String,
    pub s3_bucket: String,
    pub s3_bucket_region: String,
    pub spin_namespace: String,
}

impl Vars {
    /// Resolve the effective configuration from the process environment, falling back to
    /// `defaults`. The kubeconfig falls back to `$HOME/.kube/config` when neither the
    /// environment nor the caller provides one; a missing home directory is fatal.
    pub fn resolve(defaults: &Defaults) -> Result<Vars> {
        let kubeconfig = match non_empty_var(KUBECONFIG_VAR) {
            Some(k) => k,
            None => {
                info!("{} env var not set, using default", KUBECONFIG_VAR);
                let home = env::var("HOME").context(error::HomeDirSnafu)?;
                format!("{}/.kube/config", home)
            }
        };
        info!("Using kubeconfig {}", kubeconfig);

        Ok(Vars {
            kubeconfig,
            operator_image: resolve_var(OPERATOR_IMAGE_VAR, &defaults.operator_image),
            halyard_image: resolve_var(HALYARD_IMAGE_VAR, &defaults.halyard_image),
            s3_bucket: resolve_var(BUCKET_VAR, &defaults.bucket),
            s3_bucket_region: resolve_var(BUCKET_REGION_VAR, &defaults.bucket_region),
            spin_namespace: String::new(),
        })
    }

    /// The `kubectl` invocation prefix for ad-hoc commands against this cluster.
    pub fn kubectl_prefix(&self) -> String {
        format!("kubectl --kubeconfig={}", self.kubeconfig)
    }
}

fn resolve_var(var: &str, default: &str) -> String {
    match non_empty_var(var) {
        Some(v) => {
            info!("Using {} override '{}'", var, v);
            v
        }
        None => {
            info!("{} env var not set, using default '{}'", var, default);
            default.to_string()
        }
    }
}

fn non_empty_var(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.is_empty())
}

impl Substitutions for Vars {
    fn substitutions(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("KUBECONFIG".to_string(), self.kubeconfig.clone()),
            ("OPERATOR_IMAGE".to_string(), self.operator_image.clone()),
            ("HALYARD_IMAGE".to_string(), self.halyard_image.clone()),
            ("S3_BUCKET".to_string(), self.s3_bucket.clone()),
            (
                "S3_BUCKET_REGION".to_string(),
                self.s3_bucket_region.clone(),
            ),
            ("SPIN_NAMESPACE".to_string(), self.spin_namespace.clone()),
        ])
    }
}
