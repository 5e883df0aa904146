pub mod poll_timer;
pub mod processing_worker;
pub mod receive_queue;
pub mod reschedule;

pub use poll_timer::PollTimer;
pub use processing_worker::ProcessingWorker;
pub use receive_queue::ReceiveQueue;
pub use reschedule::next_poll_period_secs;
