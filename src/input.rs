use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// File or stdin input, buffered.
pub struct InputReader {
    reader: Box<dyn Read>,
}

impl InputReader {
    /// Use "-" for stdin pipe input
    pub fn new<P: AsRef<Path>>(input_path: P) -> io::Result<Self> {
        let reader: Box<dyn Read> = if is_pipe(&input_path) {
            Box::new(io::stdin().lock())
        } else {
            let file = File::open(input_path)?;
            Box::new(BufReader::new(file))
        };

        Ok(Self { reader })
    }
}

impl Read for InputReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Whether `input_path` names stdin.
pub fn is_pipe<P: AsRef<Path>>(input_path: P) -> bool {
    input_path.as_ref().as_os_str() == "-"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/stereo16.flac");
        let mut reader = InputReader::new(path).unwrap();

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).unwrap();
        assert_eq!(&magic, b"fLaC");
    }

    #[test]
    fn dash_is_stdin() {
        assert!(is_pipe("-"));
        assert!(!is_pipe("./-"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(InputReader::new("/nonexistent-directory/in.flac").is_err());
    }
}
