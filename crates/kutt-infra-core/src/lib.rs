//! kutt-infra core
//!
//! Declarative resource graph for provisioning the kutt URL shortener.
//! Components declare typed resources into a [`Stack`]; the backend resolves
//! their deferred attributes through per-package providers and records the
//! result as a [`StackState`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  kutt-infra CLI                  │
//! │            (preview / up / destroy)             │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                kutt-infra-core                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   Stack ── trait ResourceGraph           │   │
//! │  │   Output<T> / Props / Urn                │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ LocalBackend │  │  State Mgmt  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────┬─────────────┬─────────┘
//!         │                 │             │
//! ┌───────▼───────┐ ┌───────▼──────┐ ┌────▼───────┐
//! │      aws      │ │    random    │ │ cloudflare │
//! └───────────────┘ └──────────────┘ └────────────┘
//! ```

pub mod action;
pub mod error;
pub mod graph;
pub mod local;
pub mod output;
pub mod props;
pub mod provider;
pub mod resource;
pub mod state;

// Re-exports
pub use action::{Action, ActionType, Plan, PlanSummary};
pub use error::{GraphError, ResolutionFailure, Result};
pub use graph::{ResourceGraph, STACK_REFERENCE_TOKEN, Stack, StackReference};
pub use local::LocalBackend;
pub use output::{Output, OutputError, OutputValue, Resolution};
pub use props::{IntoProperties, PropertySet, Props};
pub use provider::{ProviderOutputs, ResourceProvider, fingerprint, input_str};
pub use resource::{
    ComponentResource, RegisteredResource, Resource, ResourceDeclaration, ResourceOptions, Urn,
    package_of,
};
pub use state::{ResourceState, SECRET_MASK, StackState, StateLock, StateManager};
