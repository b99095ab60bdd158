//! Buffer handle resolution.
//!
//! The allocation subsystem owns scan-out buffers and registers their
//! framebuffers with the driver. The display pipeline only ever asks it
//! which framebuffer id a handle is bound to.

use std::collections::HashMap;

use anyhow::{anyhow, Result};

/// Maps opaque buffer handles to registered framebuffer ids.
pub trait HandleResolver {
    type Handle: ?Sized;

    /// Framebuffer id bound to `handle`. Zero means "not a scan-out buffer".
    fn resolve(&self, handle: &Self::Handle) -> Result<u32>;

    /// Releases the allocator device backing the handles.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Opaque handle issued by a `BufferTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// In-memory handle registry.
#[derive(Debug, Default)]
pub struct BufferTable {
    entries: HashMap<BufferHandle, u32>,
    next_handle: u64,
}

impl BufferTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a new handle to an already registered framebuffer id.
    pub fn insert(&mut self, fb_id: u32) -> BufferHandle {
        self.next_handle += 1;
        let handle = BufferHandle(self.next_handle);
        self.entries.insert(handle, fb_id);
        handle
    }

    pub fn remove(&mut self, handle: BufferHandle) -> Option<u32> {
        self.entries.remove(&handle)
    }
}

impl HandleResolver for BufferTable {
    type Handle = BufferHandle;

    fn resolve(&self, handle: &BufferHandle) -> Result<u32> {
        self.entries
            .get(handle)
            .copied()
            .ok_or_else(|| anyhow!("unknown buffer handle {}", handle.0))
    }

    fn close(&mut self) -> Result<()> {
        tracing::debug!("Releasing {} buffer handles", self.entries.len());
        self.entries.clear();
        Ok(())
    }
}
