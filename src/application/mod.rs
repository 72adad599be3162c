// Application layer - Use cases, engines and the ports they depend on
pub mod dashboard_service;
pub mod dataset_loader;
pub mod document_source;
pub mod stream_engine;
pub mod unit_converter;
pub mod window_statistics;
