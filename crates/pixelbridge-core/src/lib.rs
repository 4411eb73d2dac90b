pub mod browser;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod data_layer;
pub mod error;
pub mod event;
pub mod normalize;
pub mod response;
pub mod validation;

pub use error::{ErrorKind, TrackerError};
