pub mod config_loader;
pub mod photo_cache;
pub mod points_cache;
pub mod portal_client;
pub mod registration;
pub mod result_pipeline;
pub mod reveal_flow;
