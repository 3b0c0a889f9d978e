use std::{error,fmt,ffi,io};
use io::Write;
use nix::errno::Errno;

#[derive(Debug)]
pub enum ShellError {
	ProcessCreation(nix::Error),
	Launch { program: String, cause: nix::Error },
	DirectoryChange { dir: String, cause: nix::Error },
	UnknownColor(String),
	Redirect { path: String, cause: nix::Error },
	EmptyCommand,
	Pipe(nix::Error),
	NixError(nix::Error),
	IoError(io::Error),
	NulError(ffi::NulError),
}

impl From<nix::Error> for ShellError {
	fn from(e: nix::Error) -> ShellError {
		ShellError::NixError(e)
	}
}
impl From<io::Error> for ShellError {
	fn from(e: io::Error) -> ShellError {
		ShellError::IoError(e)
	}
}
impl From<ffi::NulError> for ShellError {
	fn from(e: ffi::NulError) -> ShellError {
		ShellError::NulError(e)
	}
}

impl ShellError {
	/// Number shown in `Error (<code>):` reports.
	pub fn code(&self) -> u8 {
		match *self {
			ShellError::ProcessCreation(..) => 0,
			ShellError::Launch { .. } => 1,
			ShellError::DirectoryChange { .. } => 2,
			ShellError::UnknownColor(..) => 3,
			ShellError::Redirect { .. } => 4,
			ShellError::EmptyCommand => 5,
			ShellError::Pipe(..) => 6,
			ShellError::NixError(..) | ShellError::IoError(..) | ShellError::NulError(..) => 7,
		}
	}

	/// Status a child exits with, or the shell records, after this error.
	pub fn exit_status(&self) -> u8 {
		match *self {
			ShellError::Launch { cause: Errno::ENOENT, .. } => 127,
			ShellError::Launch { .. } => 126,
			_ => 1,
		}
	}
}

impl fmt::Display for ShellError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			ShellError::ProcessCreation(ref e) => write!(f, "child process could not be created: {}", e),
			ShellError::Launch { ref program, ref cause } =>
				write!(f, "unexpected error during process execution: {}: {}", program, cause.desc()),
			ShellError::DirectoryChange { ref dir, ref cause } => write!(f, "no such directory: {} ({})", dir, cause.desc()),
			ShellError::UnknownColor(ref name) => write!(f, "no such color found: {}", name),
			ShellError::Redirect { ref path, ref cause } => write!(f, "cannot open {}: {}", path, cause.desc()),
			ShellError::EmptyCommand => write!(f, "missing command in pipeline"),
			ShellError::Pipe(ref e) => write!(f, "pipe could not be created: {}", e),
			ShellError::NixError(ref e) => write!(f, "Nix error: {}", e),
			ShellError::IoError(ref e) => write!(f, "IO error: {}", e),
			ShellError::NulError(ref e) => write!(f, "Nul char error: {}", e),
		}
	}
}

impl error::Error for ShellError {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match *self {
			ShellError::ProcessCreation(ref e) | ShellError::Pipe(ref e) | ShellError::NixError(ref e) => Some(e),
			ShellError::Launch { ref cause, .. } => Some(cause),
			ShellError::DirectoryChange { ref cause, .. } => Some(cause),
			ShellError::Redirect { ref cause, .. } => Some(cause),
			ShellError::IoError(ref e) => Some(e),
			ShellError::NulError(ref e) => Some(e),
			ShellError::UnknownColor(..) | ShellError::EmptyCommand => None,
		}
	}
}

pub fn write_report(w: &mut dyn Write, e: &ShellError) -> io::Result<()> {
	match *e {
		// Must not touch the color the user picked earlier.
		ShellError::UnknownColor(..) => writeln!(w, "Error ({}): {}", e.code(), e),
		_ => writeln!(w, "\x1b[0;31mError ({}):\x1b[0m {}", e.code(), e),
	}
}

/// Prints the error on stderr. Also used from forked children.
pub fn report(e: &ShellError) {
	let mut stderr = io::stderr();
	let _ = write_report(&mut stderr, e);
	let _ = stderr.flush();
}
