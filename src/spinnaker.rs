use crate::env::TestEnv;
use crate::error::{self, Result};
use crate::gateway::ClusterGateway;
use log::info;
use snafu::ResultExt;
use std::path::Path;

const FILE_INDENT: &str = "        ";

impl TestEnv {
    /// Deploy a Spinnaker instance from `kustomization` into `namespace` and remember its
    /// deck/gate urls. The namespace belongs to this test and is the caller's to clean up.
    pub async fn install_spinnaker<G: ClusterGateway>(
        &mut self,
        gateway: &G,
        namespace: &str,
        kustomization: &Path,
    ) -> Result<()> {
        info!("Installing spinnaker in namespace {}", namespace);
        gateway.create_namespace(namespace).await?;
        let endpoints = gateway.deploy_spinnaker(namespace, kustomization).await?;
        self.spin_deck_url = Some(endpoints.deck_url);
        self.spin_gate_url = Some(endpoints.gate_url);
        info!("Spinnaker installed successfully");
        Ok(())
    }
}

/// Write `<overlay_dir>/files.yml`, a `SpinnakerService` fragment embedding the contents of
/// `source` under `spec.spinnakerConfig.files.<name>`, each line reindented by eight columns.
/// A partially written file on error is acceptable for a generated test artifact.
pub fn generate_spin_files(overlay_dir: &Path, name: &str, source: &Path) -> Result<()> {
    let content = std::fs::read_to_string(source).context(error::FileSnafu { path: source })?;
    let mut indented = String::new();
    for line in content.lines() {
        indented.push_str(FILE_INDENT);
        indented.push_str(line);
        indented.push('\n');
    }
    let manifest = format!(
        "\
# This file is automatically generated by integration tests, any changes will be lost
apiVersion: spinnaker.io/v1alpha2
kind: SpinnakerService
metadata:
  name: spinnaker
spec:
  spinnakerConfig:
    files:
      {}: |
{}",
        name, indented
    );
    let out = overlay_dir.join("files.yml");
    std::fs::write(&out, manifest).context(error::FileSnafu { path: out })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn generates_indented_spin_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clouddriver-local.yml");
        let mut f = std::fs::File::create(&source).unwrap();
        writeln!(f, "kubernetes:").unwrap();
        writeln!(f, "  enabled: true").unwrap();
        writeln!(f, "  accounts: []").unwrap();

        generate_spin_files(dir.path(), "clouddriver-local.yml", &source).unwrap();

        let generated = std::fs::read_to_string(dir.path().join("files.yml")).unwrap();
        let expected = "\
# This file is automatically generated by integration tests, any changes will be lost
apiVersion: spinnaker.io/v1alpha2
kind: SpinnakerService
metadata:
  name: spinnaker
spec:
  spinnakerConfig:
    files:
      clouddriver-local.yml: |
        kubernetes:
          enabled: true
          accounts: []
";
        assert_eq!(generated, expected);
    }

    #[test]
    fn missing_source_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = generate_spin_files(dir.path(), "x.yml", &dir.path().join("absent.yml"));
        assert!(result.is_err());
        assert!(!dir.path().join("files.yml").exists());
    }
}
