use crate::account::Account;
use snafu::Snafu;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for harness operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display(
        "Unable to find all accounts. Expected: {:?} but found: {:?}",
        expected,
        observed
    ))]
    AccountsNotFound {
        expected: Vec<Account>,
        observed: Vec<Account>,
    },

    #[snafu(display("Unable to create client: {}", source))]
    ClientCreateKubeconfig {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Unable to run '{}': {}", command, source))]
    Command {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("'{}' failed with exit status '{}'\n\n{}", command, code, stderr))]
    CommandStatus {
        command: String,
        code: i32,
        stderr: String,
    },

    #[snafu(display("Unable to read kubeconfig: {}", source))]
    ConfigRead {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Error deserializing accounts: {}", source))]
    DeserializeAccounts { source: serde_json::Error },

    #[snafu(display(
        "Deployment '{}' in namespace '{}' did not stabilize in time",
        deployment,
        namespace
    ))]
    DeploymentNotStable {
        namespace: String,
        deployment: String,
    },

    #[snafu(display("Unable to read file '{}': {}", path.display(), source))]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to determine home directory: {}", source))]
    HomeDir { source: std::env::VarError },

    #[snafu(display("Unable to GET '{}': {}", url, source))]
    HttpGet { url: String, source: reqwest::Error },

    #[snafu(display("Unable to {}: {}", action, source))]
    Kube { action: String, source: kube::Error },

    #[snafu(display("Unable to find {}", what))]
    NotFound { what: String },
}
