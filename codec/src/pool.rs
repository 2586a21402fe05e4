//! Process-wide buffer pools.
//!
//! Two freelists back the copy loops and whole-input decoders: growable
//! byte buffers (4 KiB initial capacity) and fixed 32 KiB scratch chunks.
//! Both are pure optimizations; nothing may depend on getting a particular
//! buffer back. Guards return their buffer on drop, so every exit path
//! (including errors) releases what it borrowed.

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// Scratch chunk length, the common transfer size for generic copies.
pub(crate) const CHUNK_SIZE: usize = 32 * 1024;

/// Initial capacity for pooled byte buffers.
const BUFFER_CAPACITY: usize = 4096;

/// Retained buffers per pool; excess buffers are simply dropped.
const POOL_LIMIT: usize = 16;

static BUFFERS: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());
static CHUNKS: Mutex<Vec<Box<[u8; CHUNK_SIZE]>>> = Mutex::new(Vec::new());

/// A pooled growable byte buffer, returned to the pool on drop.
pub(crate) struct PooledBuf {
    buf: Vec<u8>,
}

impl Deref for PooledBuf {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuf {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        let mut pool = BUFFERS.lock().unwrap_or_else(|e| e.into_inner());
        if pool.len() < POOL_LIMIT {
            pool.push(buf);
        }
    }
}

/// Borrows a cleared byte buffer from the pool.
pub(crate) fn buffer() -> PooledBuf {
    let buf = {
        let mut pool = BUFFERS.lock().unwrap_or_else(|e| e.into_inner());
        pool.pop()
    };
    PooledBuf {
        buf: buf.unwrap_or_else(|| Vec::with_capacity(BUFFER_CAPACITY)),
    }
}

/// A pooled fixed-size scratch chunk, returned to the pool on drop.
pub(crate) struct PooledChunk {
    chunk: Option<Box<[u8; CHUNK_SIZE]>>,
}

impl Deref for PooledChunk {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.chunk.as_deref().expect("chunk present until drop")
    }
}

impl DerefMut for PooledChunk {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.chunk.as_deref_mut().expect("chunk present until drop")
    }
}

impl Drop for PooledChunk {
    fn drop(&mut self) {
        if let Some(chunk) = self.chunk.take() {
            let mut pool = CHUNKS.lock().unwrap_or_else(|e| e.into_inner());
            if pool.len() < POOL_LIMIT {
                pool.push(chunk);
            }
        }
    }
}

/// Borrows a 32 KiB scratch chunk from the pool. Contents are unspecified.
pub(crate) fn chunk() -> PooledChunk {
    let chunk = {
        let mut pool = CHUNKS.lock().unwrap_or_else(|e| e.into_inner());
        pool.pop()
    };
    PooledChunk {
        chunk: Some(chunk.unwrap_or_else(|| Box::new([0u8; CHUNK_SIZE]))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_comes_back_cleared() {
        let mut a = buffer();
        a.extend_from_slice(b"hello");
        drop(a);

        let b = buffer();
        assert!(b.is_empty());
    }

    #[test]
    fn test_chunk_size() {
        let c = chunk();
        assert_eq!(c.len(), CHUNK_SIZE);
    }

    #[test]
    fn test_concurrent_borrow() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                std::thread::spawn(move || {
                    let mut buf = buffer();
                    buf.resize(64 + i, i as u8);
                    let mut c = chunk();
                    c[0] = i as u8;
                    buf.len()
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().expect("thread") >= 64);
        }
    }
}
