//! AWS-backed collaborators: STS for role assumption, Route 53 for zone
//! discovery.

use crate::domain::model::{
    AliasTarget, HostedZone, RecordPage, RecordPageToken, ResourceRecordSet, Session,
    TemporaryCredentials,
};
use crate::domain::ports::{CredentialBroker, ZoneClient, ZoneDirectory};
use crate::utils::error::{BackupError, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_route53::types::RrType;
use std::sync::Arc;
use std::time::SystemTime;

const CREDENTIALS_PROVIDER_NAME: &str = "dns-backup-assumed-role";

/// Base identity of the process, loaded once per run and shared read-only.
#[derive(Clone)]
pub struct AwsContext {
    config: Arc<SdkConfig>,
    region: String,
}

impl AwsContext {
    /// Loads credentials and settings from the environment, config files
    /// and instance roles.
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            config: Arc::new(config),
            region: region.to_string(),
        }
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn sts_client(&self) -> aws_sdk_sts::Client {
        aws_sdk_sts::Client::new(self.sdk_config())
    }
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Account id segment of an IAM role ARN.
fn account_of(role_arn: &str) -> String {
    role_arn
        .split(':')
        .nth(4)
        .filter(|segment| !segment.is_empty())
        .unwrap_or(role_arn)
        .to_string()
}

pub struct StsCredentialBroker {
    client: aws_sdk_sts::Client,
}

impl StsCredentialBroker {
    pub fn new(context: &AwsContext) -> Self {
        Self {
            client: context.sts_client(),
        }
    }
}

impl CredentialBroker for StsCredentialBroker {
    async fn assume_role(&self, role_arn: &str, session_name: &str) -> Result<TemporaryCredentials> {
        let output = self
            .client
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .send()
            .await
            .map_err(|e| BackupError::CredentialError {
                account: account_of(role_arn),
                message: aws_sdk_sts::error::DisplayErrorContext(&e).to_string(),
            })?;

        let credentials = output
            .credentials()
            .ok_or_else(|| BackupError::CredentialError {
                account: account_of(role_arn),
                message: "STS returned no credentials".to_string(),
            })?;

        let expiration = credentials.expiration();
        Ok(TemporaryCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
            expiration: chrono::DateTime::from_timestamp(
                expiration.secs(),
                expiration.subsec_nanos(),
            ),
        })
    }
}

/// Static credentials usable by any SDK client config builder.
pub(crate) fn sdk_credentials(credentials: &TemporaryCredentials) -> aws_sdk_route53::config::Credentials {
    aws_sdk_route53::config::Credentials::new(
        credentials.access_key_id.clone(),
        credentials.secret_access_key.clone(),
        Some(credentials.session_token.clone()),
        credentials.expiration.map(SystemTime::from),
        CREDENTIALS_PROVIDER_NAME,
    )
}

pub struct Route53Directory {
    context: AwsContext,
}

impl Route53Directory {
    pub fn new(context: AwsContext) -> Self {
        Self { context }
    }
}

impl ZoneDirectory for Route53Directory {
    type Client = Route53ZoneClient;

    fn connect(&self, session: &Session) -> Route53ZoneClient {
        let config = aws_sdk_route53::config::Builder::from(self.context.sdk_config())
            .credentials_provider(sdk_credentials(&session.credentials))
            .build();

        Route53ZoneClient {
            client: aws_sdk_route53::Client::from_conf(config),
            account: session.account.to_string(),
        }
    }
}

pub struct Route53ZoneClient {
    client: aws_sdk_route53::Client,
    account: String,
}

impl Route53ZoneClient {
    fn discovery_error<E>(&self, zone: Option<&str>, error: &E) -> BackupError
    where
        E: std::error::Error,
    {
        BackupError::DiscoveryError {
            account: self.account.clone(),
            zone: zone.map(str::to_string),
            message: aws_sdk_route53::error::DisplayErrorContext(error).to_string(),
        }
    }
}

impl ZoneClient for Route53ZoneClient {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>> {
        let mut zones = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .client
                .list_hosted_zones()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| self.discovery_error(None, &e))?;

            zones.extend(
                page.hosted_zones()
                    .iter()
                    .map(|zone| HostedZone::new(zone.id(), zone.name())),
            );

            match page.next_marker() {
                Some(next) if page.is_truncated() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(zones)
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        start: Option<&RecordPageToken>,
    ) -> Result<RecordPage> {
        let mut request = self
            .client
            .list_resource_record_sets()
            .hosted_zone_id(zone_id.trim_start_matches("/hostedzone/"));
        if let Some(start) = start {
            request = request
                .start_record_name(start.name.as_str())
                .start_record_type(RrType::from(start.record_type.as_str()))
                .set_start_record_identifier(start.identifier.clone());
        }

        let page = request
            .send()
            .await
            .map_err(|e| self.discovery_error(Some(zone_id), &e))?;

        let next = if page.is_truncated() {
            page.next_record_name().map(|name| RecordPageToken {
                name: name.to_string(),
                record_type: page
                    .next_record_type()
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_default(),
                identifier: page.next_record_identifier().map(str::to_string),
            })
        } else {
            None
        };

        Ok(RecordPage {
            records: page.resource_record_sets().iter().map(record_from_sdk).collect(),
            next,
        })
    }
}

fn record_from_sdk(record: &aws_sdk_route53::types::ResourceRecordSet) -> ResourceRecordSet {
    ResourceRecordSet {
        name: record.name().to_string(),
        record_type: record.r#type().as_str().to_string(),
        ttl: record.ttl(),
        values: record
            .resource_records()
            .iter()
            .map(|value| value.value().to_string())
            .collect(),
        set_identifier: record.set_identifier().map(str::to_string),
        alias_target: record.alias_target().map(|alias| AliasTarget {
            dns_name: alias.dns_name().to_string(),
            hosted_zone_id: alias.hosted_zone_id().to_string(),
            evaluate_target_health: alias.evaluate_target_health(),
        }),
    }
}
