pub mod dataset;
pub mod filtering;
pub mod reconciler;
pub mod summary;
