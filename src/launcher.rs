use crate::error::{self,ShellError};
use crate::types::{RedirectSpec,Segment};

use std::convert::Infallible;
use std::ffi::CString;
use std::os::fd::{AsRawFd,OwnedFd,RawFd};
use nix::{unistd,fcntl};
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;

#[derive(Debug)]
struct Redirect {
	path: CString,
	flags: OFlag,
	target: RawFd,
}

impl Redirect {
	fn new(spec: &RedirectSpec) -> Result<Option<Redirect>, ShellError> {
		let (path, flags, target) = match *spec {
			RedirectSpec::None => return Ok(None),
			RedirectSpec::OutputTruncate(p) =>
				(p, OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC, libc::STDOUT_FILENO),
			RedirectSpec::OutputAppend(p) =>
				(p, OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND, libc::STDOUT_FILENO),
			RedirectSpec::Input(p) => (p, OFlag::O_RDONLY, libc::STDIN_FILENO),
		};
		Ok(Some(Redirect { path: CString::new(path)?, flags: flags, target: target }))
	}

	fn apply(&self) -> Result<(), ShellError> {
		let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
		let fd = fcntl::open(self.path.as_c_str(), self.flags, mode).map_err(|e| ShellError::Redirect {
			path: self.path.to_string_lossy().into_owned(),
			cause: e,
		})?;
		if fd != self.target {
			unistd::dup2(fd, self.target)?;
			unistd::close(fd)?;
		}
		Ok(())
	}
}

/// Everything a child needs to exec one segment, built in the parent so
/// the child only issues syscalls.
#[derive(Debug)]
pub struct Program {
	argv: Vec<CString>,
	redirect: Option<Redirect>,
}

impl Program {
	pub fn prepare(segment: &Segment) -> Result<Program, ShellError> {
		let argv = segment.args.iter().map(|&s| CString::new(s)).collect::<Result<Vec<_>, _>>()?;
		if argv.is_empty() {
			return Err(ShellError::EmptyCommand);
		}
		Ok(Program { argv: argv, redirect: Redirect::new(&segment.redirect)? })
	}

	pub fn name(&self) -> String {
		self.argv[0].to_string_lossy().into_owned()
	}
}

fn do_launch(program: &Program, stdin: Option<&OwnedFd>, stdout: Option<&OwnedFd>) -> Result<Infallible, ShellError> {
	if let Some(fd) = stdin {
		unistd::dup2(fd.as_raw_fd(), libc::STDIN_FILENO)?;
	}
	if let Some(fd) = stdout {
		unistd::dup2(fd.as_raw_fd(), libc::STDOUT_FILENO)?;
	}
	// A segment's own redirect wins over the pipe it was wired to.
	if let Some(ref redirect) = program.redirect {
		redirect.apply()?;
	}
	unistd::execvp(&program.argv[0], &program.argv).map_err(|e| ShellError::Launch {
		program: program.name(),
		cause: e,
	})
}

/// Replaces the current (forked) process image with `program`. Never
/// returns: on failure the error is reported and the child exits.
pub fn launch(program: &Program, stdin: Option<&OwnedFd>, stdout: Option<&OwnedFd>) -> ! {
	let s = match do_launch(program, stdin, stdout) {
		Ok(never) => match never {},
		Err(e) => {
			error::report(&e);
			e.exit_status()
		},
	};
	unsafe { libc::_exit(s as libc::c_int) }
}
