pub mod error;
pub mod http;
pub mod site;
pub mod telemetry;
