pub mod gateway;
pub mod workflow_client;

pub use gateway::{RunStatus, SubmitReceipt, WorkflowGateway};
pub use workflow_client::WorkflowClient;
