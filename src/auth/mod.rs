pub mod cookies;
pub mod extractors;
pub mod password;
pub mod services;
pub mod tokens;
