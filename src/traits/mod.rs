pub mod capture_source;
pub mod echo_canceller;
pub mod sink;
