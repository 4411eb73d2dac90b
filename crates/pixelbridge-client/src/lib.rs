pub mod dispatch;
pub mod logging;
pub mod registry;
pub mod retry;
pub mod tracker;
pub mod transport;

pub use pixelbridge_core::{
    browser::PixelSnippet,
    config::{RetryConfig, TrackerConfig},
    data_layer::DataLayer,
    event::{ActionSource, Content, CustomData, EventData, UserData},
    response::EventResponse,
    ErrorKind, TrackerError,
};
pub use tracker::ServerTracker;
