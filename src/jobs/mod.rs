/*!
 * Background job execution.
 *
 * - `models`: job spec, state and status report
 * - `queue`: the submit/poll contract and the in-process tokio implementation
 */

pub mod models;
pub mod queue;

pub use models::{JobSpec, JobState, JobStatus};
pub use queue::{JobHandler, JobQueue, JobRetryPolicy, LocalJobQueue, short_id, wait_until_finished};
