pub mod extraction;
pub mod batch;
pub mod reconcile;
