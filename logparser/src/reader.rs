//! The `LineSource` reader contract (SPEC_FULL.md §4.1.1): "read one line
//! up to and including its newline, or end-of-stream." Blanket-implemented
//! over anything that already implements [`std::io::BufRead`], so a
//! buffered file, an in-memory `Cursor<&[u8]>` (used for `--test-log` and
//! unit tests), and a spawned child process's stdout are all valid
//! sources without three bespoke wrapper types.

use std::io::{self, BufRead};

pub trait LineSource {
    /// Reads one line, including its trailing `\n` if present, appending
    /// it to `buf`. Returns the number of bytes read; `0` signals
    /// end-of-stream.
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize>;
}

impl<R: BufRead> LineSource for R {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        BufRead::read_line(self, buf)
    }
}

/// Wraps a literal string as a [`LineSource`], for `--test-log` fixtures
/// and unit tests.
pub fn str_source(s: &str) -> impl LineSource + '_ {
    io::BufReader::new(io::Cursor::new(s.as_bytes()))
}
