pub mod classifier;
pub mod download;
pub mod history;
pub mod labels;
