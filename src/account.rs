use crate::env::TestEnv;
use crate::error::{self, Result};
use crate::gateway::ClusterGateway;
use log::info;
use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt, ResultExt};

/// An account record as reported by gate's credentials endpoints. Expected accounts in tests
/// use the same shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
}

impl Account {
    pub fn with_type<S1, S2>(name: S1, account_type: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Account {
            name: name.into(),
            account_type: Some(account_type.into()),
            types: Vec::new(),
        }
    }

    pub fn with_types<S, I, T>(name: S, types: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Account {
            name: name.into(),
            account_type: None,
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    /// Tolerant match against an observed record: names must be equal, and either both single
    /// types are present and equal, or both type lists are non-empty with equal first
    /// elements. Deliberately not full structural equality.
    pub fn matches(&self, observed: &Account) -> bool {
        if self.name != observed.name {
            return false;
        }
        if let (Some(expected), Some(actual)) = (&self.account_type, &observed.account_type) {
            if expected == actual {
                return true;
            }
        }
        matches!(
            (self.types.first(), observed.types.first()),
            (Some(expected), Some(actual)) if expected == actual
        )
    }
}

impl TestEnv {
    /// Fetch the account list from `<gate-url><endpoint>` and check that every expected
    /// record has at least one observed match. Matching is non-exclusive: one observed record
    /// may satisfy several expected records.
    pub async fn verify_accounts_exist<G: ClusterGateway>(
        &self,
        gateway: &G,
        endpoint: &str,
        expected: &[Account],
    ) -> Result<()> {
        info!("Verifying spinnaker accounts");
        let gate_url = self.spin_gate_url.as_ref().context(error::NotFoundSnafu {
            what: "gate url (was install_spinnaker run?)",
        })?;
        let body = gateway
            .http_get(&format!("{}{}", gate_url, endpoint))
            .await?;
        let observed: Vec<Account> =
            serde_json::from_str(&body).context(error::DeserializeAccountsSnafu)?;
        let found = expected
            .iter()
            .filter(|e| observed.iter().any(|o| e.matches(o)))
            .count();
        ensure!(
            found == expected.len(),
            error::AccountsNotFoundSnafu {
                expected: expected.to_vec(),
                observed,
            }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_type_match() {
        let expected = Account::with_type("aws1", "aws");
        assert!(expected.matches(&Account::with_type("aws1", "aws")));
        assert!(!expected.matches(&Account::with_type("aws1", "kubernetes")));
        assert!(!expected.matches(&Account::with_type("aws2", "aws")));
    }

    #[test]
    fn types_list_matches_on_first_element_only() {
        let expected = Account::with_types("x", ["kubernetes"]);
        assert!(expected.matches(&Account::with_types("x", ["kubernetes", "extra"])));
        assert!(!expected.matches(&Account::with_types("x", ["extra", "kubernetes"])));
    }

    #[test]
    fn single_type_does_not_match_types_list() {
        let expected = Account::with_type("x", "kubernetes");
        assert!(!expected.matches(&Account::with_types("x", ["kubernetes"])));
    }

    #[test]
    fn decodes_gate_payload() {
        let body = r#"[{"name":"aws1","type":"aws"},{"name":"k8s","types":["kubernetes"]}]"#;
        let accounts: Vec<Account> = serde_json::from_str(body).unwrap();
        assert_eq!(accounts[0], Account::with_type("aws1", "aws"));
        assert_eq!(accounts[1], Account::with_types("k8s", ["kubernetes"]));
    }
}
