pub mod directory;
pub mod model;

pub use directory::{DirectoryError, InMemoryUserDirectory, UserDirectory};
pub use model::User;
