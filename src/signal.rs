use std::io;
use std::io::{Read,Write};
use std::os::fd::{AsFd,BorrowedFd};
use std::os::unix::net::UnixStream;

use signal_hook::consts::SIGINT;
use signal_hook::low_level::pipe;

/// Self-pipe fed by the SIGINT handler. The handler itself only writes a
/// byte; the read loop polls this and does the actual shutdown.
pub struct Interrupts {
	read: UnixStream,
}

impl Interrupts {
	pub fn register() -> io::Result<Interrupts> {
		let (read, write) = UnixStream::pair()?;
		read.set_nonblocking(true)?;
		pipe::register(SIGINT, write)?;
		Ok(Interrupts { read: read })
	}

	/// Drains the pipe; true if at least one SIGINT arrived since the last call.
	pub fn pending(&mut self) -> bool {
		let mut buf = [0u8; 16];
		let mut seen = false;
		loop {
			match self.read.read(&mut buf) {
				Ok(0) => return seen,
				Ok(_) => { seen = true; },
				Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {},
				Err(_) => return seen,
			}
		}
	}
}

impl AsFd for Interrupts {
	fn as_fd(&self) -> BorrowedFd<'_> {
		self.read.as_fd()
	}
}

pub fn farewell(out: &mut dyn Write) -> io::Result<()> {
	out.write_all(b"\x1b[0m\n\nexit signal received. quitting...\n")?;
	out.write_all(b"--- thank you for using \x1b[0;31mm\x1b[0;32my\x1b[0;33mS\x1b[0;34mh\x1b[0;35me\x1b[0;36ml\x1b[0ml ---\n")?;
	out.flush()
}
