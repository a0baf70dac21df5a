//! Command buffer recorded by the application each frame.
//!
//! The buffer carries an opcode byte stream and a side list of referenced
//! objects. Webview operations ride in that list behind a zero-area clip and
//! an input marker, so the host hit-tests nothing and renders nothing for
//! them.

use std::any::Any;

use inlay_common::Point;

/// Command buffer layout this crate understands.
pub const HOST_LAYOUT_VERSION: u32 = 1;

/// An auxiliary object referenced from the opcode stream.
pub type OpRef = Box<dyn Any + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum OpCode {
    ClipPush = 1,
    ClipPop = 2,
    Input = 3,
}

/// One frame's worth of recorded operations.
pub struct CommandBuffer {
    version: u32,
    layout: u32,
    data: Vec<u8>,
    refs: Vec<OpRef>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::with_layout(HOST_LAYOUT_VERSION)
    }

    /// A buffer that claims a different layout. Used to model a host whose
    /// internals drifted from the pinned version.
    pub fn with_layout(layout: u32) -> Self {
        Self {
            version: 0,
            layout,
            data: Vec::new(),
            refs: Vec::new(),
        }
    }

    /// Clear all recorded operations, keeping allocations.
    pub fn reset(&mut self) {
        self.version = self.version.wrapping_add(1);
        self.data.clear();
        self.refs.clear();
    }

    /// Number of resets so far.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn layout_version(&self) -> u32 {
        self.layout
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn refs(&self) -> &[OpRef] {
        &self.refs
    }

    pub fn refs_mut(&mut self) -> &mut [OpRef] {
        &mut self.refs
    }

    /// Push a rectangular clip of the given size at the current origin.
    pub fn push_clip(&mut self, size: Point) -> ClipStack {
        self.data.push(OpCode::ClipPush as u8);
        self.data.extend_from_slice(&size.x.to_le_bytes());
        self.data.extend_from_slice(&size.y.to_le_bytes());
        ClipStack {
            version: self.version,
        }
    }

    /// Register a hit-test target whose tag is `tag`.
    pub fn add_input(&mut self, tag: OpRef) {
        let index = self.refs.len() as u32;
        self.data.push(OpCode::Input as u8);
        self.data.extend_from_slice(&index.to_le_bytes());
        self.refs.push(tag);
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("version", &self.version)
            .field("layout", &self.layout)
            .field("data_len", &self.data.len())
            .field("refs", &self.refs.len())
            .finish()
    }
}

/// A pushed clip, popped with [`ClipStack::pop`].
#[must_use = "a pushed clip must be popped"]
#[derive(Debug)]
pub struct ClipStack {
    version: u32,
}

impl ClipStack {
    pub fn pop(self, ops: &mut CommandBuffer) {
        // A reset between push and pop already discarded the clip.
        if ops.version == self.version {
            ops.data.push(OpCode::ClipPop as u8);
        }
    }
}
