use std::ops::{Deref, DerefMut};
use std::sync::{Arc, LazyLock};

use crossbeam_queue::ArrayQueue;

const POOL_CAPACITY: usize = 128;

pub static GLOBAL_BUFFER_POOL: LazyLock<Arc<BufferPool>> =
    LazyLock::new(|| Arc::new(BufferPool::default()));

/// A pooled packet buffer that returns itself to the pool on drop.
pub struct PooledBuffer {
    pool: Arc<BufferPool>,
    inner: Vec<u8>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let vec = std::mem::take(&mut self.inner);
        self.pool.return_buffer(vec);
    }
}

/// Read buffers shared by the result sets of all sessions using the pool.
///
/// A result set holds one buffer while it reads packets; a streaming result set
/// holds it until it is drained or closed.
#[derive(Debug)]
pub struct BufferPool {
    buffers: ArrayQueue<Vec<u8>>,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: ArrayQueue::new(capacity.max(1)),
        }
    }

    pub fn get_buffer(self: &Arc<Self>) -> PooledBuffer {
        let inner = self.buffers.pop().unwrap_or_default();
        PooledBuffer {
            pool: Arc::clone(self),
            inner,
        }
    }

    pub fn return_buffer(&self, mut vec: Vec<u8>) {
        // Clear but preserve capacity
        vec.clear();
        // Ignore if pool is full
        let _ = self.buffers.push(vec);
    }

    /// Number of idle buffers
    pub fn idle(&self) -> usize {
        self.buffers.len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(POOL_CAPACITY)
    }
}
