pub mod error;
pub mod health;
pub mod info;
pub mod server;

pub use crate::error::{CheckError, DownstreamError, GenerateError, ProbeError};
pub use crate::info::{generate, Info};
pub use crate::server::MetaHandler;
