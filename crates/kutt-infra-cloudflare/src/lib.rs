//! Cloudflare support for kutt-infra
//!
//! Declares DNS records in a Cloudflare zone. The provider is simulated: it
//! checks records the way the Cloudflare API would and assigns record ids
//! without network access.
//!
//! # Example
//!
//! ```ignore
//! use kutt_infra_cloudflare::{Record, RecordArgs, RecordType};
//!
//! let record = stack.declare::<Record>(
//!     "kutt",
//!     RecordArgs::new(zone_id, "@", RecordType::Cname, lb_dns_name),
//!     ResourceOptions::new(),
//! )?;
//! ```

pub mod dns;
pub mod error;
pub mod provider;

pub use dns::{Record, RecordArgs, RecordType};
pub use error::{CloudflareError, Result};
pub use provider::CloudflareProvider;
