pub mod memory_repository;
pub mod sqlx_repository;
