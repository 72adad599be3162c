// Infrastructure layer - External dependencies and adapters
pub mod clock;
pub mod config;
pub mod file_source;
pub mod http_source;
pub mod routing_source;
pub mod synthetic_source;
