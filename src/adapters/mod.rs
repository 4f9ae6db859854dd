// Adapters layer: concrete implementations of the domain ports for AWS and storage backends.

pub mod aws;
pub mod storage;

pub use aws::{AwsContext, Route53Directory, Route53ZoneClient, StsCredentialBroker};
pub use storage::{AnyStorage, LocalStorage, S3Storage};
