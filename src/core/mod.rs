pub mod merge;
pub mod render;
