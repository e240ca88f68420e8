//! Destination for text written by `print` statements.
//!
//! Scripts and the prompt write to stdout; tests capture into a buffer and
//! assert on what was printed.

use std::io::{self, Write};

pub enum Output {
    Stdout,
    Buffer(String),
}

impl Output {
    pub fn buffer() -> Output {
        Output::Buffer(String::new())
    }

    /// Writes `msg` followed by a newline. Fails when stdout is closed,
    /// e.g. the reading end of a pipe has gone away.
    pub fn println(&mut self, msg: &str) -> io::Result<()> {
        match self {
            Output::Stdout => write_line(&mut io::stdout().lock(), msg),
            Output::Buffer(buf) => {
                buf.push_str(msg);
                buf.push('\n');
                Ok(())
            }
        }
    }

    /// Everything captured so far. Always empty for stdout.
    pub fn contents(&self) -> &str {
        match self {
            Output::Stdout => "",
            Output::Buffer(buf) => buf,
        }
    }

    /// Drains the captured text.
    pub fn take(&mut self) -> String {
        match self {
            Output::Stdout => String::new(),
            Output::Buffer(buf) => std::mem::take(buf),
        }
    }
}

fn write_line<W: Write>(out: &mut W, msg: &str) -> io::Result<()> {
    writeln!(out, "{}", msg)?;
    out.flush()
}

impl Default for Output {
    fn default() -> Self {
        Output::Stdout
    }
}

#[cfg(test)]
mod output_tests {
    use crate::output::{write_line, Output};
    use std::io::{self, Write};

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn buffer_captures_lines() {
        let mut output = Output::buffer();
        output.println("hello").unwrap();
        output.println("world").unwrap();
        assert_eq!(output.contents(), "hello\nworld\n");
        assert_eq!(output.take(), "hello\nworld\n");
        assert_eq!(output.contents(), "");
    }

    #[test]
    fn stdout_captures_nothing() {
        let mut output = Output::Stdout;
        output.println("visible on the terminal").unwrap();
        assert_eq!(output.contents(), "");
        assert_eq!(output.take(), "");
    }

    #[test]
    fn write_failures_are_returned() {
        let err = write_line(&mut ClosedPipe, "lost").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        let mut written: Vec<u8> = Vec::new();
        write_line(&mut written, "kept").unwrap();
        assert_eq!(written, b"kept\n");
    }
}
