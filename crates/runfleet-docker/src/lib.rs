//! Docker Engine backend for the runner manager.
//!
//! [`DockerClient`] implements both [`runfleet_core::ContainerRuntime`] and
//! [`runfleet_core::ImagePuller`] on top of `bollard`, talking to the engine's
//! unix control socket.
mod error;
pub use error::DockerError;

mod client;
pub use client::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_SOCKET, DockerClient, DockerConfig};

mod convert;
