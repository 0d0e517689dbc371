pub mod error;
pub mod guard;
pub mod mapper;
pub mod options;
pub mod progress;
pub mod query;
pub mod report;
pub mod retriever;
pub mod strategy;
pub mod table;
