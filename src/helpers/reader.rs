use crate::spreadsheet::loader::Source;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;

/// Seekable reader over either a local file or an in-memory stream
pub(crate) enum UnifiedReader {
    Local(BufReader<File>),
    Memory(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    pub(crate) fn new(source: &Source) -> std::io::Result<UnifiedReader> {
        match source {
            Source::Path(path) => Ok(UnifiedReader::Local(BufReader::new(File::open(path)?))),
            Source::Stream { bytes, .. } => Ok(UnifiedReader::Memory(Cursor::new(bytes.to_owned()))),
        }
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Memory(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_local_and_memory_sources() {
        let mut reader = UnifiedReader::new(&Source::from("Cargo.toml")).unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();
        assert!(content.contains("[package]"));

        assert!(UnifiedReader::new(&Source::from("non_existent_file.xlsx")).is_err());

        let stream = Source::Stream { name: "memory.xlsx".to_owned(), bytes: b"PK".to_vec() };
        let mut reader = UnifiedReader::new(&stream).unwrap();
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, b"PK");
    }
}
