//! K-mer window extraction
//!
//! [`KmerWindows`] turns one read into its length-k all-ACGT windows, left
//! to right, as rolling 2k-bit codes. A non-ACGT byte (N included) is a
//! hard break: the rolling state resets and k further valid bases are
//! required before the next window is emitted. Reads shorter than k, k = 0,
//! and k beyond the storage width all yield an empty sequence rather than
//! an error.

use crate::encoding::encode_base;
use crate::kmer::KmerInt;

/// Iterator over the k-mer windows of a single read.
pub struct KmerWindows<'a, W: KmerInt> {
    read: &'a [u8],
    k: usize,
    pos: usize,
    /// Valid bases currently held in `code`, saturating at k.
    filled: usize,
    code: W,
    mask: W,
}

impl<'a, W: KmerInt> KmerWindows<'a, W> {
    /// Create an extractor for `read` with window length `k`.
    pub fn new(read: &'a [u8], k: usize) -> Self {
        let degenerate = k == 0 || k > W::MAX_K || read.len() < k;
        Self {
            read,
            k,
            // Degenerate parameters exhaust the iterator immediately.
            pos: if degenerate { read.len() } else { 0 },
            filled: 0,
            code: W::zero(),
            mask: W::window_mask(k),
        }
    }
}

impl<'a, W: KmerInt> Iterator for KmerWindows<'a, W> {
    type Item = W;

    #[inline]
    fn next(&mut self) -> Option<W> {
        while self.pos < self.read.len() {
            let base = self.read[self.pos];
            self.pos += 1;
            match encode_base(base) {
                Ok(code) => {
                    self.code = self.code.push_base(self.mask, code);
                    if self.filled < self.k {
                        self.filled += 1;
                    }
                    if self.filled == self.k {
                        return Some(self.code);
                    }
                }
                Err(_) => {
                    // Hard break: restart the window after the bad base.
                    self.filled = 0;
                    self.code = W::zero();
                }
            }
        }
        None
    }
}

/// Count the k-mer windows of a read without materializing them.
///
/// Width-independent: a window exists for every position i such that
/// `read[i..i+k]` is all-ACGT, which is what [`KmerWindows`] emits.
pub fn count_windows(read: &[u8], k: usize) -> u64 {
    if k == 0 {
        return 0;
    }
    let mut windows = 0u64;
    let mut run = 0usize;
    for &base in read {
        if crate::encoding::is_acgt(base) {
            run += 1;
            if run >= k {
                windows += 1;
            }
        } else {
            run = 0;
        }
    }
    windows
}
