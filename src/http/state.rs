use crate::pipeline::PipelineCoordinator;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: PipelineCoordinator,

    /// Refuse report lookups until the visit is completed
    pub report_requires_completion: bool,
}

impl AppState {
    pub fn new(coordinator: PipelineCoordinator) -> Self {
        Self {
            coordinator,
            report_requires_completion: false,
        }
    }

    pub fn with_report_requires_completion(mut self, required: bool) -> Self {
        self.report_requires_completion = required;
        self
    }
}
