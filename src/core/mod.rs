pub mod archive;
pub mod assume;
pub mod engine;
pub mod fetch;
pub mod gate;
pub mod persist;
pub mod pipeline;
pub mod zone_file;

pub use crate::domain::model::{ResourceRecordSet, Session, Snapshot};
pub use crate::domain::ports::{
    ConfigProvider, CredentialBroker, Pipeline, Storage, Trigger, ZoneClient, ZoneDirectory,
};
pub use crate::utils::error::Result;
