mod service;

pub use service::LivenessService;
