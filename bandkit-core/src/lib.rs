//! Core logic for an emergency-wristband service.
//!
//! A band is a physical wristband printed with a human-legible identifier
//! and a QR-encoded claim secret. This crate implements everything between
//! the wire and the database: accounts and sessions, admin provisioning,
//! the one-owner claim protocol, profile storage with per-field visibility,
//! document attachments, and band lifecycle. It is transport-agnostic;
//! embed [`CoreService`] behind whatever plumbing serves the requests.

pub mod accounts;
pub mod bands;
pub mod claim;
pub mod clock;
pub mod config;
pub mod error;
pub mod identifier;
pub mod profile;
pub mod rate_limit;
pub mod registry;
pub mod service;
pub mod store;

pub use accounts::{CredentialStore, SessionToken, UserId};
pub use bands::{BandLifecycle, BandStatus, BandSummary};
pub use claim::ClaimProtocol;
pub use clock::{Clock, SystemClock};
pub use config::{CoreConfig, RateLimitConfig};
pub use error::{CoreError, CoreResult};
pub use identifier::BandId;
pub use profile::{
    BloodGroup, Document, DocumentMeta, FieldEntry, OwnerProfile, ProfileEngine,
    ProfileField, ProfileUpdate, PublicProfile,
};
pub use rate_limit::{RateAction, RateLimiter};
pub use registry::{ProvisionedBand, ProvisioningRegistry};
pub use service::CoreService;
pub use store::{StorageError, Store};
