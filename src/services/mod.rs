//! Background services spawned by the upload coordinator

pub mod status_poller;

pub use status_poller::StatusPoller;
