pub mod app;
pub mod export;
