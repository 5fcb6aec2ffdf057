//! Streaming XXH64 content hashing.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use xxhash_rust::xxh64::{Xxh64, xxh64};

use treescan_core::{ContentHash, Operation, ScanError};

/// Seed used for every content hash.
pub const HASH_SEED: u64 = 0;

/// Read buffer size for streaming files through the hasher.
pub const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Hash a byte slice in one shot.
///
/// Produces the same digest as streaming the same bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    ContentHash::new(xxh64(data, HASH_SEED))
}

/// Stream a reader to its end through the hasher.
///
/// Returns the digest and the number of bytes consumed.
pub fn hash_reader<R: Read>(mut reader: R) -> std::io::Result<(ContentHash, u64)> {
    let mut hasher = Xxh64::new(HASH_SEED);
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        hasher.update(&buffer[..bytes_read]);
        total += bytes_read as u64;
    }

    Ok((ContentHash::new(hasher.digest()), total))
}

/// Hash the full content of a file.
///
/// The file handle is closed before this returns, on success and on error.
pub fn hash_file(path: &Path) -> Result<(ContentHash, u64), ScanError> {
    let file = File::open(path).map_err(|e| ScanError::io(path, Operation::Open, e))?;
    hash_source(path, file)
}

/// Hash an already-opened source, attributing read failures to `path`.
fn hash_source<R: Read>(path: &Path, reader: R) -> Result<(ContentHash, u64), ScanError> {
    hash_reader(reader).map_err(|e| ScanError::io(path, Operation::Read, e))
}
