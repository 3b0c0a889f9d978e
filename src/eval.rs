use crate::builtin;
use crate::error::ShellError;
use crate::global;
use crate::job;
use crate::launcher::{self,Program};
use crate::parser;
use crate::types::Pipeline;

use std::io::Write;
use std::os::fd::OwnedFd;
use log::debug;
use nix::unistd;
use nix::fcntl::OFlag;

/// Forks one child per program. Each pipe's write end goes to the stage
/// that produces into it and its read end to the next stage; the parent
/// drops its copies as soon as the consuming child exists.
fn spawn_commands(programs: &[Program], job_builder: &mut job::JobBuilder) -> Result<(), ShellError> {
	let mut upstream: Option<OwnedFd> = None;
	for (i, program) in programs.iter().enumerate() {
		let is_last = i + 1 == programs.len();
		let (pipe_read, pipe_write) = if is_last {
			(None, None)
		} else {
			let (r, w) = unistd::pipe2(OFlag::O_CLOEXEC).map_err(ShellError::Pipe)?;
			(Some(r), Some(w))
		};
		match job_builder.push_fork().map_err(ShellError::ProcessCreation)? {
			unistd::ForkResult::Parent{ child } => {
				debug!("stage {} ({}) is pid {}", i, program.name(), child);
			},
			unistd::ForkResult::Child => {
				launcher::launch(program, upstream.as_ref(), pipe_write.as_ref());
			},
		}
		drop(pipe_write);
		upstream = pipe_read;
	}
	Ok(())
}

fn eval_pipeline(state: &mut global::State, pipeline: &Pipeline, command: &str, out: &mut dyn Write) -> Result<u8, ShellError> {
	let segments = &pipeline.segments;
	assert!(!segments.is_empty());

	let first = &segments[0];
	if segments.len() == 1 && first.redirect.is_none() && !pipeline.is_background {
		if let Some(func) = builtin::match_builtin(first.name()) {
			return func(state, first.arguments(), out);
		}
	}

	let programs = segments.iter().map(Program::prepare).collect::<Result<Vec<_>, _>>()?;
	// Nothing buffered may be duplicated into the children.
	out.flush()?;

	let mut job_builder = job::JobBuilder::new(command, pipeline.is_background, programs.len());
	let spawned = spawn_commands(&programs, &mut job_builder);
	let job = job_builder.build();
	let last_pid = match job.last() {
		Some(pr) => pr.pid,
		None => return spawned.map(|()| 0),
	};
	// Stages forked before a failure keep running and stay tracked.
	let id = state.job_set.push(job);
	spawned?;

	if pipeline.is_background {
		writeln!(out, "[{}] {}", id, last_pid)?;
		Ok(0)
	} else {
		Ok(state.job_set.wait(last_pid)?)
	}
}

/// Parses and runs one input line, returning the exit status of its last
/// stage (0 for background pipelines).
pub fn eval(state: &mut global::State, line: &[u8], out: &mut dyn Write) -> Result<u8, ShellError> {
	let pipeline = match parser::parse(line)? {
		Some(p) => p,
		None => return Ok(state.last_status),
	};
	let command = String::from_utf8_lossy(line).trim().to_string();
	eval_pipeline(state, &pipeline, &command, out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::Config;
	use std::{env,fs,process};

	fn state() -> global::State {
		global::State::new(Config::default())
	}

	#[test]
	fn pipeline_feeds_redirected_last_stage() {
		let path = env::temp_dir().join(format!("mysh-eval-{}-pipe.txt", process::id()));
		let line = format!("printf \"one two\" | tr a-z A-Z | tr O 0 > {}", path.display());
		let mut out: Vec<u8> = vec![];
		assert_eq!(eval(&mut state(), line.as_bytes(), &mut out).unwrap(), 0);
		assert_eq!(fs::read_to_string(&path).unwrap(), "0NE TW0");
		let _ = fs::remove_file(&path);
	}

	#[test]
	fn append_then_input_redirect() {
		let path = env::temp_dir().join(format!("mysh-eval-{}-append.txt", process::id()));
		let _ = fs::remove_file(&path);
		let mut s = state();
		let mut out: Vec<u8> = vec![];
		eval(&mut s, format!("echo first >> {}", path.display()).as_bytes(), &mut out).unwrap();
		eval(&mut s, format!("echo second >> {}", path.display()).as_bytes(), &mut out).unwrap();
		let copy = env::temp_dir().join(format!("mysh-eval-{}-copy.txt", process::id()));
		eval(&mut s, format!("cat < {} | tr a-z A-Z > {}", path.display(), copy.display()).as_bytes(), &mut out).unwrap();
		assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
		assert_eq!(fs::read_to_string(&copy).unwrap(), "FIRST\nSECOND\n");
		let _ = fs::remove_file(&path);
		let _ = fs::remove_file(&copy);
	}

	#[test]
	fn exit_status_of_last_stage() {
		let mut out: Vec<u8> = vec![];
		assert_eq!(eval(&mut state(), b"true | false", &mut out).unwrap(), 1);
		assert_eq!(eval(&mut state(), b"sh -c \"exit 3\"", &mut out).unwrap(), 3);
	}

	#[test]
	fn missing_program_exits_127() {
		let mut out: Vec<u8> = vec![];
		assert_eq!(eval(&mut state(), b"mysh_no_such_program_xyz", &mut out).unwrap(), 127);
	}

	#[test]
	fn builtin_runs_in_process() {
		let mut s = state();
		let mut out: Vec<u8> = vec![];
		assert_eq!(eval(&mut s, b"color red", &mut out).unwrap(), 0);
		assert_eq!(out, b"\x1b[0;31m".to_vec());
		assert_eq!(s.job_set.len(), 0);
	}

	#[test]
	fn blank_line_keeps_last_status() {
		let mut s = state();
		s.last_status = 4;
		let mut out: Vec<u8> = vec![];
		assert_eq!(eval(&mut s, b"   ", &mut out).unwrap(), 4);
	}
}
