//! Visit ingestion and dispatch

mod coordinator;

pub use coordinator::PipelineCoordinator;
