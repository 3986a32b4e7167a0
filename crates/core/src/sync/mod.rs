//! Change-list synchronization: cursors, per-kind passes, orchestration and
//! background triggers.

mod change_list_model;
mod change_list_sync;
mod data_changed;
mod ports;
mod sync_scheduler;
mod sync_worker;

pub use change_list_model::*;
pub use change_list_sync::*;
pub use data_changed::*;
pub use ports::*;
pub use sync_scheduler::*;
pub use sync_worker::*;
