pub mod cache;
pub mod decode;
