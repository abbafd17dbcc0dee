use crate::service::SubmissionService;

pub struct BackendState {
    pub service: SubmissionService,
}

impl BackendState {
    pub fn new(service: SubmissionService) -> Self {
        Self { service }
    }
}
