pub mod paths;
pub mod prune;
pub mod reconcile;
pub mod runner;
pub mod task;
