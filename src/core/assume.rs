use crate::core::gate::{cancellable, AdmissionGate};
use crate::domain::model::{AccountId, Session};
use crate::domain::ports::CredentialBroker;
use crate::utils::error::{BackupError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CONCURRENCY: usize = 30;
pub const DEFAULT_SESSION_NAME: &str = "dns-backup";

const ACCOUNT_PLACEHOLDER: &str = "{account}";

/// Role to assume in every target account.
///
/// Either a bare role name (`dns-backup-reader`), expanded to
/// `arn:aws:iam::<account>:role/<name>`, or a full ARN containing the
/// `{account}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTemplate(String);

impl RoleTemplate {
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(BackupError::MissingConfigError {
                field: "job.assume_role".to_string(),
            });
        }
        if value.starts_with("arn:") && !value.contains(ACCOUNT_PLACEHOLDER) {
            return Err(BackupError::InvalidConfigValueError {
                field: "job.assume_role".to_string(),
                value: value.to_string(),
                reason: format!("role ARN must contain the {} placeholder", ACCOUNT_PLACEHOLDER),
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn role_arn(&self, account: &AccountId) -> String {
        if self.0.contains(ACCOUNT_PLACEHOLDER) {
            self.0.replace(ACCOUNT_PLACEHOLDER, account.as_str())
        } else {
            format!("arn:aws:iam::{}:role/{}", account, self.0)
        }
    }
}

/// Fans role assumption out across accounts under a concurrency cap.
pub struct RoleAssumer<B: CredentialBroker> {
    broker: Arc<B>,
    template: RoleTemplate,
    session_name: String,
    concurrency: usize,
}

impl<B: CredentialBroker> RoleAssumer<B> {
    pub fn new(broker: Arc<B>, template: RoleTemplate, concurrency: usize) -> Self {
        Self {
            broker,
            template,
            session_name: DEFAULT_SESSION_NAME.to_string(),
            concurrency,
        }
    }

    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = session_name.into();
        self
    }

    /// Best effort: accounts whose assumption fails are logged and left out
    /// of the returned map.
    pub async fn assume_all(
        &self,
        accounts: &BTreeSet<AccountId>,
        cancel: &CancellationToken,
    ) -> BTreeMap<AccountId, Session> {
        let gate = AdmissionGate::new(self.concurrency);
        let mut workers = JoinSet::new();

        for account in accounts {
            let broker = Arc::clone(&self.broker);
            let gate = gate.clone();
            let cancel = cancel.clone();
            let role_arn = self.template.role_arn(account);
            let session_name = self.session_name.clone();
            let account = account.clone();

            workers.spawn(async move {
                let outcome = async {
                    let _permit = gate.admit(&cancel).await?;
                    tracing::debug!(account = %account, role = %role_arn, "Assuming role");
                    cancellable(&cancel, broker.assume_role(&role_arn, &session_name)).await
                }
                .await;
                (account, role_arn, outcome)
            });
        }

        let mut sessions = BTreeMap::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((account, _, Ok(credentials))) => {
                    sessions.insert(
                        account.clone(),
                        Session {
                            account,
                            credentials,
                        },
                    );
                }
                Ok((account, role_arn, Err(e))) => {
                    tracing::warn!(
                        account = %account,
                        role = %role_arn,
                        error = %e,
                        "Unable to assume role, skipping account"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Role assumption worker panicked");
                }
            }
        }

        tracing::info!(
            requested = accounts.len(),
            assumed = sessions.len(),
            "Role assumption finished"
        );
        sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TemporaryCredentials;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeBroker {
        failing: HashSet<String>,
        attempts: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        seen_arns: Mutex<Vec<String>>,
    }

    impl FakeBroker {
        fn failing_for(arns: &[&str]) -> Self {
            Self {
                failing: arns.iter().map(|a| a.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    impl CredentialBroker for FakeBroker {
        async fn assume_role(
            &self,
            role_arn: &str,
            _session_name: &str,
        ) -> Result<TemporaryCredentials> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.seen_arns.lock().unwrap().push(role_arn.to_string());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(role_arn) {
                return Err(BackupError::CredentialError {
                    account: role_arn.to_string(),
                    message: "AccessDenied".to_string(),
                });
            }
            Ok(TemporaryCredentials {
                access_key_id: format!("AKIA-{}", role_arn),
                secret_access_key: "secret".to_string(),
                session_token: "token".to_string(),
                expiration: None,
            })
        }
    }

    fn accounts(ids: &[&str]) -> BTreeSet<AccountId> {
        ids.iter().map(|id| AccountId::from(*id)).collect()
    }

    #[test]
    fn test_role_template_expansion() {
        let account = AccountId::from("123456789012");

        let by_name = RoleTemplate::parse("dns-backup-reader").unwrap();
        assert_eq!(
            by_name.role_arn(&account),
            "arn:aws:iam::123456789012:role/dns-backup-reader"
        );

        let by_arn = RoleTemplate::parse("arn:aws:iam::{account}:role/ops/reader").unwrap();
        assert_eq!(
            by_arn.role_arn(&account),
            "arn:aws:iam::123456789012:role/ops/reader"
        );
    }

    #[test]
    fn test_role_template_rejects_fixed_arn_and_empty() {
        assert!(RoleTemplate::parse("arn:aws:iam::123456789012:role/reader").is_err());
        assert!(RoleTemplate::parse("   ").is_err());
    }

    #[tokio::test]
    async fn test_failed_account_is_skipped() {
        let broker = Arc::new(FakeBroker::failing_for(&[
            "arn:aws:iam::222222222222:role/reader",
        ]));
        let assumer = RoleAssumer::new(
            Arc::clone(&broker),
            RoleTemplate::parse("reader").unwrap(),
            DEFAULT_CONCURRENCY,
        );

        let sessions = assumer
            .assume_all(
                &accounts(&["111111111111", "222222222222", "333333333333"]),
                &CancellationToken::new(),
            )
            .await;

        let keys: Vec<&str> = sessions.keys().map(|a| a.as_str()).collect();
        assert_eq!(keys, vec!["111111111111", "333333333333"]);
        assert_eq!(broker.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(
            sessions[&AccountId::from("111111111111")].credentials.access_key_id,
            "AKIA-arn:aws:iam::111111111111:role/reader"
        );
    }

    #[tokio::test]
    async fn test_concurrency_cap_is_respected() {
        let broker = Arc::new(FakeBroker::default());
        let assumer = RoleAssumer::new(
            Arc::clone(&broker),
            RoleTemplate::parse("reader").unwrap(),
            3,
        );
        let ids: Vec<String> = (0..20).map(|i| format!("{:012}", i)).collect();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();

        let sessions = assumer
            .assume_all(&accounts(&ids), &CancellationToken::new())
            .await;

        assert_eq!(sessions.len(), 20);
        assert!(broker.peak_in_flight.load(Ordering::SeqCst) <= 3);
        assert_eq!(broker.attempts.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn test_cancelled_run_assumes_nothing() {
        let broker = Arc::new(FakeBroker::default());
        let assumer = RoleAssumer::new(
            Arc::clone(&broker),
            RoleTemplate::parse("reader").unwrap(),
            2,
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let sessions = assumer
            .assume_all(&accounts(&["111111111111", "222222222222"]), &cancel)
            .await;

        assert!(sessions.is_empty());
        assert_eq!(broker.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_session_name_is_forwarded() {
        struct NameCheck;
        impl CredentialBroker for NameCheck {
            async fn assume_role(
                &self,
                _role_arn: &str,
                session_name: &str,
            ) -> Result<TemporaryCredentials> {
                assert_eq!(session_name, "nightly-backup");
                Ok(TemporaryCredentials {
                    access_key_id: "a".to_string(),
                    secret_access_key: "s".to_string(),
                    session_token: "t".to_string(),
                    expiration: None,
                })
            }
        }

        let assumer = RoleAssumer::new(
            Arc::new(NameCheck),
            RoleTemplate::parse("reader").unwrap(),
            1,
        )
        .with_session_name("nightly-backup");
        let sessions = assumer
            .assume_all(&accounts(&["111111111111"]), &CancellationToken::new())
            .await;
        assert_eq!(sessions.len(), 1);
    }
}
