//! Orchestration layer tying nsyte's crates into the two state machines
//! spec 4.H and 4.J describe: verified deletion and the publish pipeline.

mod delete;
mod pipeline;

pub use delete::{
    AuthRequest, DeleteItem, DeleteVerification, DeletionReport, DeletionSession, FileDeletionOutcome, FileDeletionState,
    run_verified_deletion,
};
pub use pipeline::{run, PipelineOptions};
