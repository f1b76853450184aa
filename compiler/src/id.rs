// id.rs — Stable identifiers for IR nodes and solved bindings
//
// `ExprId` indexes into the `ExprArena` owned by one parse; it is only
// meaningful together with that arena. `BindingId` is produced by a naming
// strategy during solving and keys the binding registry.

use std::fmt;

/// Index of an expression node inside its `ExprArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a solved binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u32);

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding_{}", self.0)
    }
}

/// Monotonic counter shared by a naming strategy for fresh binding ids and
/// synthetic names. Produces ids in allocation order, so a fixed traversal
/// yields a fixed assignment.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn alloc_binding(&mut self) -> BindingId {
        BindingId(self.alloc())
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}
