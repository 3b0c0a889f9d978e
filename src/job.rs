use log::{debug,info};
use nix::errno::Errno;
use nix::unistd::{self,Pid};
use nix::sys::wait::{self,WaitPidFlag,WaitStatus};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum State { Active, Terminated }

pub trait WaitStatusExt {
	fn state(self) -> State;
	fn code(self) -> u8;
}

impl WaitStatusExt for WaitStatus {
	fn state(self) -> State {
		match self {
			WaitStatus::Exited(..) | WaitStatus::Signaled(..) => State::Terminated,
			_ => State::Active,
		}
	}
	fn code(self) -> u8 {
		match self {
			WaitStatus::Exited(_, c) => c as u8,
			WaitStatus::Signaled(_, sig, _) => 128u8.wrapping_add(sig as u8),
			_ => 0,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Process {
	pub pid: Pid,
	pub status: WaitStatus,
}

#[derive(Debug)]
pub struct Job {
	pub id: usize,
	pub command: String,
	pub is_background: bool,
	pub pgid: Option<Pid>,
	pub processes: Vec<Process>,
}

impl Job {
	pub fn state(&self) -> State {
		self.processes.iter().map(|pr| pr.status.state()).min().unwrap_or(State::Terminated)
	}

	pub fn last(&self) -> Option<&Process> {
		self.processes.last()
	}

	fn update(&mut self, status: WaitStatus) -> bool {
		match (status.pid(), status.state()) {
			(Some(pid), State::Terminated) => match self.processes.iter_mut().find(|pr| pr.pid == pid) {
				Some(pr) => {
					pr.status = status;
					true
				},
				None => false,
			},
			_ => false,
		}
	}
}

/// Collects the processes of one pipeline as they are forked.
#[derive(Debug)]
pub struct JobBuilder {
	imp: Job,
}

impl JobBuilder {
	pub fn new(command: &str, is_background: bool, size_hint: usize) -> JobBuilder {
		JobBuilder {
			imp: Job {
				id: 0,
				command: command.to_string(),
				is_background: is_background,
				pgid: None,
				processes: Vec::with_capacity(size_hint),
			}
		}
	}

	/// Forks one stage. Background stages share a new process group led by
	/// the first stage; both sides call setpgid so neither can race ahead.
	pub fn push_fork(&mut self) -> nix::Result<unistd::ForkResult> {
		let job = &mut self.imp;
		let pgid = job.pgid.unwrap_or(Pid::from_raw(0));

		let r = unsafe { unistd::fork() }?;
		match r {
			unistd::ForkResult::Parent{ child: pid } => {
				if job.is_background {
					// EACCES: the child already exec'd after joining the group itself.
					match unistd::setpgid(pid, if job.pgid.is_none() { pid } else { pgid }) {
						Ok(()) | Err(Errno::EACCES) => {},
						Err(e) => debug!("setpgid({}) failed: {}", pid, e),
					}
					if job.pgid.is_none() {
						job.pgid = Some(pid);
					}
				}
				debug!("forked {}", pid);
				job.processes.push(Process { pid: pid, status: WaitStatus::StillAlive });
			},
			unistd::ForkResult::Child => {
				if job.is_background {
					let _ = unistd::setpgid(Pid::from_raw(0), pgid);
				}
			},
		}
		Ok(r)
	}

	pub fn build(self) -> Job {
		self.imp
	}
}

fn wait_retrying(pid: Pid, flags: Option<WaitPidFlag>) -> nix::Result<WaitStatus> {
	loop {
		match wait::waitpid(pid, flags) {
			Err(Errno::EINTR) => {},
			r => return r,
		}
	}
}

#[derive(Debug, Default)]
pub struct JobSet {
	jobs: Vec<Job>,
}

impl JobSet {
	pub fn new() -> JobSet {
		JobSet { jobs: vec![] }
	}

	fn update_job_set(&mut self, status: WaitStatus) {
		if !self.jobs.iter_mut().any(|job| job.update(status)) {
			debug!("reaped untracked child: {:?}", status);
		}
	}

	fn next_id(&self) -> usize {
		let background = || self.jobs.iter().filter(|job| job.is_background);
		(1..).find(|id| background().all(|job| job.id != *id)).unwrap_or(1)
	}

	/// Registers a launched job. Background jobs are numbered among
	/// themselves and the number is returned; foreground jobs get 0.
	pub fn push(&mut self, mut job: Job) -> usize {
		job.id = if job.is_background { self.next_id() } else { 0 };
		let id = job.id;
		if job.is_background {
			info!("job [{}] started in background: {}", id, job.command);
		}
		self.jobs.push(job);
		id
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.jobs.len()
	}

	/// Blocks until `pid`, the last stage of a foreground job, has
	/// terminated and returns its exit code. The other stages are left to
	/// `reap`.
	pub fn wait(&mut self, pid: Pid) -> nix::Result<u8> {
		let code = loop {
			let status = wait_retrying(pid, None)?;
			self.update_job_set(status);
			if status.state() == State::Terminated {
				break status.code();
			}
		};
		self.remove_finished();
		Ok(code)
	}

	/// Collects every child that has exited, without blocking, and returns
	/// the jobs that are now completely finished.
	pub fn reap(&mut self) -> nix::Result<Vec<Job>> {
		loop {
			match wait_retrying(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
				Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => { break; },
				Ok(status) => self.update_job_set(status),
				Err(e) => return Err(e),
			}
		}
		Ok(self.remove_finished())
	}

	fn remove_finished(&mut self) -> Vec<Job> {
		let (done, running): (Vec<Job>, Vec<Job>) = self.jobs.drain(..).partition(|job| job.state() == State::Terminated);
		self.jobs = running;
		for job in &done {
			debug!("job [{}] finished: {}", job.id, job.command);
		}
		done
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use nix::sys::signal::Signal;

	fn job(pids: &[i32], is_background: bool) -> Job {
		Job {
			id: 0,
			command: "a | b".to_string(),
			is_background: is_background,
			pgid: None,
			processes: pids.iter().map(|&p| Process { pid: Pid::from_raw(p), status: WaitStatus::StillAlive }).collect(),
		}
	}

	#[test]
	fn wait_status_codes() {
		assert_eq!(WaitStatus::Exited(Pid::from_raw(1), 3).code(), 3);
		assert_eq!(WaitStatus::Signaled(Pid::from_raw(1), Signal::SIGINT, false).code(), 130);
		assert_eq!(WaitStatus::StillAlive.state(), State::Active);
	}

	#[test]
	fn job_terminates_when_every_stage_has() {
		let mut j = job(&[10, 11], false);
		assert_eq!(j.state(), State::Active);
		assert!(j.update(WaitStatus::Exited(Pid::from_raw(11), 0)));
		assert_eq!(j.state(), State::Active);
		assert!(!j.update(WaitStatus::Exited(Pid::from_raw(99), 0)));
		assert!(j.update(WaitStatus::Signaled(Pid::from_raw(10), Signal::SIGPIPE, false)));
		assert_eq!(j.state(), State::Terminated);
	}

	#[test]
	fn job_ids_are_reused() {
		let mut set = JobSet::new();
		assert_eq!(set.push(job(&[20], true)), 1);
		assert_eq!(set.push(job(&[21], true)), 2);
		set.update_job_set(WaitStatus::Exited(Pid::from_raw(20), 0));
		let done = set.remove_finished();
		assert_eq!(done.len(), 1);
		assert_eq!(done[0].id, 1);
		assert_eq!(set.len(), 1);
		assert_eq!(set.push(job(&[22], true)), 1);
	}

	#[test]
	fn foreground_jobs_do_not_take_background_numbers() {
		let mut set = JobSet::new();
		assert_eq!(set.push(job(&[30, 31], false)), 0);
		assert_eq!(set.push(job(&[32], false)), 0);
		assert_eq!(set.push(job(&[33], true)), 1);
		let background: Vec<usize> = set.jobs.iter().filter(|j| j.is_background).map(|j| j.id).collect();
		assert_eq!(background, vec![1]);
	}

	#[test]
	fn wait_runs_real_child() {
		let mut builder = JobBuilder::new("exit 7", false, 1);
		match builder.push_fork().unwrap() {
			unistd::ForkResult::Child => unsafe { libc::_exit(7) },
			unistd::ForkResult::Parent{..} => {},
		}
		let job = builder.build();
		let pid = job.last().unwrap().pid;
		let mut set = JobSet::new();
		set.push(job);
		assert_eq!(set.wait(pid).unwrap(), 7);
		assert_eq!(set.len(), 0);
	}
}
