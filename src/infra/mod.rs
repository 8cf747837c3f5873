pub mod assets;
pub mod email;
pub mod error;
pub mod github;
pub mod http;
pub mod telemetry;
