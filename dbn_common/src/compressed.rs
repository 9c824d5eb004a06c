//! Byte sources and sinks for DBN files, optionally zstd-compressed.
//!
//! The scanner never decompresses by itself; these helpers hand it an already
//! wrapped reader. `-` names stdin or stdout.
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;

use crate::result::Result;

/// zstd level used when writing. Zero selects the library default.
pub const ZSTD_LEVEL: i32 = 0;

/// Returns `true` for paths ending in `.zst` or `.zstd`.
pub fn is_zstd_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("zst") | Some("zstd")
    )
}

fn is_std_stream(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Opens `path` for reading, decompressing zstd when the extension says so
/// or `force_zstd` is set.
pub fn open_reader(path: impl AsRef<Path>, force_zstd: bool) -> Result<Box<dyn Read>> {
    let path = path.as_ref();
    let zstd = force_zstd || is_zstd_path(path);
    debug!("Opening {} for reading (zstd: {})", path.display(), zstd);
    let raw: Box<dyn Read> = if is_std_stream(path) {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(path)?)
    };
    if zstd {
        Ok(Box::new(zstd::stream::read::Decoder::new(raw)?))
    } else {
        Ok(Box::new(BufReader::new(raw)))
    }
}

/// Creates `path` for writing, compressing with zstd when the extension says
/// so or `force_zstd` is set. The compressed frame is finished when the
/// returned writer is dropped.
pub fn create_writer(path: impl AsRef<Path>, force_zstd: bool) -> Result<Box<dyn Write>> {
    let path = path.as_ref();
    let zstd = force_zstd || is_zstd_path(path);
    debug!("Opening {} for writing (zstd: {})", path.display(), zstd);
    let raw: Box<dyn Write> = if is_std_stream(path) {
        Box::new(io::stdout().lock())
    } else {
        Box::new(BufWriter::new(File::create(path)?))
    };
    if zstd {
        let encoder = zstd::stream::write::Encoder::new(raw, ZSTD_LEVEL)?;
        Ok(Box::new(encoder.auto_finish()))
    } else {
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_extensions() {
        assert!(is_zstd_path(Path::new("data/test.dbn.zst")));
        assert!(is_zstd_path(Path::new("test.dbn.zstd")));
        assert!(!is_zstd_path(Path::new("test.dbn")));
        assert!(!is_zstd_path(Path::new("-")));
    }

    #[test]
    fn zstd_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bytes.dbn.zst");
        let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        {
            let mut writer = create_writer(&path, false).unwrap();
            writer.write_all(&payload).unwrap();
        }
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(&on_disk[..4], &[0x28, 0xB5, 0x2F, 0xFD]);

        let mut out = Vec::new();
        open_reader(&path, false)
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn plain_file_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bytes.dbn");
        {
            let mut writer = create_writer(&path, false).unwrap();
            writer.write_all(b"DBN\x02").unwrap();
        }
        assert_eq!(std::fs::read(&path).unwrap(), b"DBN\x02");
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            open_reader("/nonexistent/file.dbn", false),
            Err(crate::error::DbnError::Io(_))
        ));
    }
}
