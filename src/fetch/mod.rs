pub mod fetcher;
pub mod service;
