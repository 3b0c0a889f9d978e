use crate::config::Config;
use crate::job;

pub struct State {
	pub config: Config,
	pub job_set: job::JobSet,
	pub last_status: u8,
	/// Set by the `exit` builtin; the read loop stops with this status.
	pub should_exit: Option<i32>,
}

impl State {
	pub fn new(config: Config) -> State {
		let job_set = job::JobSet::new();
		State { config: config, job_set: job_set, last_status: 0, should_exit: None }
	}
}
