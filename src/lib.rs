pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod utils;
