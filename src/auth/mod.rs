pub mod extractors;
pub mod governor;
pub mod jwt;
pub mod password;
pub mod portal;
pub mod services;
