/*!

End-to-end test harness for the Spinnaker operator. Expensive cluster-side state (the
operator CRDs, the templated base overlays and the cluster-mode operator) is provisioned once
per process by a [`SharedEnvironment`] and shared safely between concurrently running tests;
each test gets its own [`TestEnv`] view with its own operator namespace, optional Spinnaker
instance and account verification helpers.

All cluster access goes through the [`ClusterGateway`] trait so tests of the harness itself
can run against a mock instead of a live cluster. [`KubectlGateway`] is the production
implementation.

!*/

pub use account::Account;
pub use config::{Defaults, Vars};
pub use env::{SharedEnvironment, TestEnv};
pub use error::{Error, Result};
pub use gateway::{ClusterGateway, SpinnakerEndpoints, Substitutions};
pub use kubectl::KubectlGateway;
pub use operator::{Operator, OperatorMode, OPERATOR_DEPLOYMENT};
pub use spinnaker::generate_spin_files;

mod account;
mod config;
mod env;
mod error;
mod gateway;
mod kubectl;
mod operator;
mod spinnaker;
