pub mod repository;

pub use repository::RepositorySink;
