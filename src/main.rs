mod builtin;
mod config;
mod error;
mod eval;
mod global;
mod job;
mod launcher;
mod logging;
mod parser;
mod signal;
mod types;

use std::{fs,io,process};
use io::{BufRead,BufReader,Write};
use std::os::fd::AsFd;
use log::{info,warn};
use nix::errno::Errno;
use nix::poll::{self,PollFd,PollFlags,PollTimeout};

use config::Config;
use error::ShellError;
use signal::Interrupts;

enum Event {
	Line(Vec<u8>),
	Interrupt,
	Eof,
}

/// Waits until either a full line can be read or SIGINT arrives.
fn next_event(input: &mut BufReader<fs::File>, interrupts: &mut Interrupts) -> io::Result<Event> {
	loop {
		if interrupts.pending() {
			return Ok(Event::Interrupt);
		}
		if input.buffer().is_empty() {
			let input_ready = {
				let mut fds = [
					PollFd::new(input.get_ref().as_fd(), PollFlags::POLLIN),
					PollFd::new(interrupts.as_fd(), PollFlags::POLLIN),
				];
				match poll::poll(&mut fds, PollTimeout::NONE) {
					Ok(_) | Err(Errno::EINTR) => {},
					Err(e) => return Err(e.into()),
				}
				fds[0].revents().map_or(false, |r| !r.is_empty())
			};
			if !input_ready {
				continue;
			}
		}
		let mut line: Vec<u8> = vec![];
		if input.read_until(b'\n', &mut line)? == 0 {
			return Ok(Event::Eof);
		}
		if line.last() == Some(&b'\n') {
			line.pop();
		}
		return Ok(Event::Line(line));
	}
}

fn run(config: Config) -> Result<i32, ShellError> {
	let mut interrupts = Interrupts::register()?;
	// The shell reads through its own descriptor so children always get the
	// untouched fd 0.
	let mut input = BufReader::new(fs::File::from(io::stdin().as_fd().try_clone_to_owned()?));
	let mut state = global::State::new(config);
	let stdout = io::stdout();
	let mut out = stdout.lock();

	if let Some(color) = state.config.color.clone() {
		if let Err(e) = eval::eval(&mut state, format!("color {}", color).as_bytes(), &mut out) {
			error::report(&e);
		}
	}

	loop {
		match state.job_set.reap() {
			Ok(done) => for job in done.iter().filter(|job| job.is_background) {
				info!("job [{}] done: {}", job.id, job.command);
				let _ = writeln!(out, "[{}] done  {}", job.id, job.command);
			},
			Err(e) => warn!("reaping children failed: {}", e),
		}

		let _ = out.write_all(state.config.prompt.as_bytes());
		let _ = out.flush();

		match next_event(&mut input, &mut interrupts)? {
			Event::Interrupt => {
				let _ = signal::farewell(&mut out);
				return Ok(signal_hook::consts::SIGINT);
			},
			Event::Eof => {
				let _ = out.write_all(b"\n");
				let _ = out.flush();
				return Ok(0);
			},
			Event::Line(line) => {
				state.last_status = match eval::eval(&mut state, &line, &mut out) {
					Ok(s) => s,
					Err(e) => {
						let _ = out.flush();
						error::report(&e);
						e.exit_status()
					},
				};
			},
		}

		if let Some(code) = state.should_exit {
			return Ok(code);
		}
	}
}

fn main() {
	let config = Config::load();
	logging::init(&config);
	let code = match run(config) {
		Ok(code) => code,
		Err(e) => {
			error::report(&e);
			1
		},
	};
	info!("mysh exiting with status {}", code);
	process::exit(code)
}
