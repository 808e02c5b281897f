//! Random value resources for kutt-infra
//!
//! `RandomPassword` and `RandomString` are declared like any other resource;
//! their value is generated once by [`RandomProvider`] and then kept in state,
//! so later runs with the same arguments reuse it.

pub mod provider;
pub mod resources;

pub use provider::{RandomProvider, generate};
pub use resources::{
    RandomPassword, RandomPasswordArgs, RandomString, RandomStringArgs, DEFAULT_SPECIAL,
};
