pub mod json;
pub mod list;
pub mod markdown;
