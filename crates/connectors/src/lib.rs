pub mod adapter;
pub mod backend;
pub mod elastic;
pub mod error;
pub mod http;
pub mod memory;
pub mod opensearch;
pub mod scan;
