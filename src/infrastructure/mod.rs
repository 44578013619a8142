pub mod database;
pub mod entities;
pub mod file_store;
pub mod repositories;
pub mod traits;
