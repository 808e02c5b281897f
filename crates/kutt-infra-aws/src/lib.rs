//! AWS support for kutt-infra
//!
//! - [`resources`]: typed declarations for the AWS resource types kutt uses
//! - [`components`]: `PrivateDatabase`, `PrivateCache` and `WebApp`
//! - [`provider`]: a simulated provider that computes AWS-assigned attributes

pub mod components;
pub mod error;
pub mod provider;
pub mod resources;

pub use components::cache::{PrivateCache, PrivateCacheArgs};
pub use components::database::{PrivateDatabase, PrivateDatabaseArgs};
pub use components::webapp::{EnvVar, SecretRef, WebApp, WebAppArgs};
pub use error::{ComponentError, Result};
pub use provider::AwsProvider;
pub use resources::{Tags, get_region, is_taggable};
