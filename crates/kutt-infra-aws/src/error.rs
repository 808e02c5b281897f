//! Component error types

use kutt_infra_core::GraphError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("{component} '{name}' requires at least one subnet id")]
    EmptySubnets {
        component: &'static str,
        name: String,
    },

    #[error("{component} '{name}': {message}")]
    InvalidArgument {
        component: &'static str,
        name: String,
        message: String,
    },

    #[error("WebApp '{0}' registers with a load balancer but has no target group")]
    MissingTargetGroup(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type Result<T> = std::result::Result<T, ComponentError>;
