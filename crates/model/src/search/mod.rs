pub mod metadata;
pub mod request;
pub mod response;
