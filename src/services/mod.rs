pub mod file_store;
pub mod image_service;
