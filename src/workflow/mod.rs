pub mod record;
pub mod state;
pub mod step;

pub use record::{EventFields, PendingRow, Record, RecordStatus};
pub use state::{Counters, ErrorEntry, RunReport, RunState, StateUpdate};
pub use step::{Step, Transition, route};
