//! Asynchronous job lifecycle: submit, poll, reduce.

mod batch;
mod outcome;
mod poller;
mod request;
mod retry;
mod state;

pub use batch::{ItemPolicy, run_batch};
pub use outcome::{OutputItem, TerminalResult, reduce};
pub use poller::{StatusPoller, submit_and_await};
pub use request::{JobOperation, JobRequest, Submission, submit};
pub use retry::{FetchOutcome, fetch_with_retry};
pub use state::{JobHandle, JobState, JobStatus};
