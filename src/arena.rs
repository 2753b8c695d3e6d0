//! Bump-allocated, aligned, resettable scratch memory for node buffers.
//!
//! Ported from the teacher's `graph::buffer_pool` (a pool of owned `Tensor`
//! buffers keyed by node index) and the original's `vectoria::memory::Arena`
//! (a growing list of owned blocks handed out sequentially). Buffers here are
//! raw byte ranges rather than `ndarray` tensors: the execution engine deals
//! in pointers/counts/dims at the kernel boundary (spec §4.4), so the arena
//! exposes typed slice views directly instead of a higher-level tensor type.

use crate::errors::{VectoriaError, VectoriaResult};

/// Default block size when a fresh block must be appended.
const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// All node buffers use this alignment to admit the widest vector family.
pub const BUFFER_ALIGNMENT: usize = 64;

struct Block {
    data: Vec<u8>,
    used: usize,
}

impl Block {
    fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size],
            used: 0,
        }
    }

    fn try_allocate(&mut self, size: usize, alignment: usize) -> Option<usize> {
        let base = self.data.as_ptr() as usize;
        let aligned_start = align_up(base + self.used, alignment) - base;
        if aligned_start + size <= self.data.len() {
            self.used = aligned_start + size;
            Some(aligned_start)
        } else {
            None
        }
    }
}

fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// A handle into one arena-owned buffer. Distinct from a raw pointer: it
/// stays valid for the arena's lifetime and is resolved back to a slice via
/// `Arena::view`/`Arena::view_mut`, per the design note that arena addresses
/// must never leak past the engine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle {
    block: usize,
    offset: usize,
    len: usize,
}

impl BufferHandle {
    /// A handle representing a zero-sized allocation. Distinguishable from
    /// an allocation failure: `Arena::allocate` never returns `Err` for a
    /// zero-sized request.
    pub fn null() -> Self {
        BufferHandle {
            block: usize::MAX,
            offset: 0,
            len: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

pub struct Arena {
    default_block_size: usize,
    blocks: Vec<Block>,
    max_bytes: Option<usize>,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

impl Arena {
    pub fn new(default_block_size: usize) -> Self {
        Self {
            default_block_size,
            blocks: Vec::new(),
            max_bytes: None,
        }
    }

    /// Test-only: an arena that reports `ResourceError` once growing past
    /// `max_bytes` would be required, instead of growing without bound.
    /// Lets `VectoriaError::Resource`'s propagation through `compile()` be
    /// exercised without allocating enough real memory to force an actual
    /// OS-level allocation failure.
    #[cfg(test)]
    pub(crate) fn capped(default_block_size: usize, max_bytes: usize) -> Self {
        Self {
            default_block_size,
            blocks: Vec::new(),
            max_bytes: Some(max_bytes),
        }
    }

    /// Allocates `size` bytes aligned to `alignment`. Scans existing blocks
    /// for the first aligned sub-region that fits; otherwise appends a new
    /// block sized `max(size + alignment, default_block_size)`.
    pub fn allocate(&mut self, size: usize, alignment: usize) -> VectoriaResult<BufferHandle> {
        if size == 0 {
            return Ok(BufferHandle::null());
        }

        for (idx, block) in self.blocks.iter_mut().enumerate() {
            if let Some(offset) = block.try_allocate(size, alignment) {
                return Ok(BufferHandle {
                    block: idx,
                    offset,
                    len: size,
                });
            }
        }

        let new_block_size = std::cmp::max(size + alignment, self.default_block_size);
        if let Some(max_bytes) = self.max_bytes {
            let already_used: usize = self.blocks.iter().map(|b| b.data.len()).sum();
            if already_used + new_block_size > max_bytes {
                return Err(VectoriaError::resource(format!(
                    "arena exhausted: allocating {} more bytes would exceed the {} byte cap",
                    new_block_size, max_bytes
                )));
            }
        }
        self.blocks.push(Block::new(new_block_size));
        let idx = self.blocks.len() - 1;
        let offset = self.blocks[idx]
            .try_allocate(size, alignment)
            .ok_or_else(|| {
                VectoriaError::resource("freshly appended arena block could not satisfy allocation")
            })?;
        Ok(BufferHandle {
            block: idx,
            offset,
            len: size,
        })
    }

    /// Resets every block's used-marker to zero without releasing memory,
    /// so a subsequent `compile()` can reuse capacity.
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            block.used = 0;
        }
    }

    /// Total bytes currently allocated across all blocks.
    pub fn allocated_bytes(&self) -> usize {
        self.blocks.iter().map(|b| b.used).sum()
    }

    pub fn view(&self, handle: BufferHandle) -> &[u8] {
        if handle.is_null() {
            return &[];
        }
        &self.blocks[handle.block].data[handle.offset..handle.offset + handle.len]
    }

    pub fn view_mut(&mut self, handle: BufferHandle) -> &mut [u8] {
        if handle.is_null() {
            return &mut [];
        }
        &mut self.blocks[handle.block].data[handle.offset..handle.offset + handle.len]
    }

    /// Typed f32 view. `handle`'s byte length must be a multiple of 4; the
    /// underlying block storage is always 64-byte aligned at the handle's
    /// offset, so this reinterpretation is sound.
    pub fn view_f32(&self, handle: BufferHandle) -> &[f32] {
        bytes_to_f32(self.view(handle))
    }

    pub fn view_f32_mut(&mut self, handle: BufferHandle) -> &mut [f32] {
        bytes_to_f32_mut(self.view_mut(handle))
    }
}

fn bytes_to_f32(bytes: &[u8]) -> &[f32] {
    debug_assert_eq!(bytes.len() % 4, 0);
    debug_assert_eq!(bytes.as_ptr() as usize % 4, 0);
    // SAFETY: bytes originates from an Arena block allocated with alignment
    // >= 4 (BUFFER_ALIGNMENT == 64) and a length that is a multiple of
    // size_of::<f32>(); `len / 4` is therefore a valid f32 element count.
    unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const f32, bytes.len() / 4) }
}

fn bytes_to_f32_mut(bytes: &mut [u8]) -> &mut [f32] {
    debug_assert_eq!(bytes.len() % 4, 0);
    debug_assert_eq!(bytes.as_ptr() as usize % 4, 0);
    // SAFETY: see `bytes_to_f32`.
    unsafe { std::slice::from_raw_parts_mut(bytes.as_mut_ptr() as *mut f32, bytes.len() / 4) }
}
