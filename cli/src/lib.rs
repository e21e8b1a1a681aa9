pub mod catalog;
pub mod commands;
pub mod config;
pub mod logging;
pub mod repository;
pub mod request;

pub use repository::DirectoryRepository;
pub use request::PlanFile;
