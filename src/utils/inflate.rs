use std::io::Read;

use flate2::read::ZlibDecoder;
use parking_lot::Mutex;

use crate::error::BBIError;

const SCRATCH_CAPACITY: usize = 64 * 1024;

/// zlib inflater with a pool of reusable scratch buffers, bounding
/// allocation under concurrent block decoding.
pub(crate) struct Inflate {
    pool: Mutex<Vec<Vec<u8>>>,
}

impl Inflate {
    pub(crate) fn new() -> Inflate {
        Inflate {
            pool: Mutex::new(Vec::new()),
        }
    }

    /// Inflates `data` when `compressed` is set; otherwise returns the input
    /// unchanged. The scratch buffer goes back to the pool on every path.
    pub(crate) fn decompress(&self, data: &[u8], compressed: bool) -> Result<Vec<u8>, BBIError> {
        if !compressed {
            return Ok(data.to_vec());
        }

        let mut scratch = self
            .pool
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(SCRATCH_CAPACITY));
        scratch.clear();

        let mut decoder = ZlibDecoder::new(data);
        let result = match decoder.read_to_end(&mut scratch) {
            Ok(_) => Ok(scratch.clone()),
            Err(e) => Err(BBIError::Decompress(e)),
        };
        self.pool.lock().push(scratch);
        result
    }
}
