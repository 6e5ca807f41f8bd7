pub mod auth_session_repository;
pub mod user_repository;
