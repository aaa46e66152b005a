use crate::brigade::Brigade;
use crate::error::ReadStatus;

/// What a read call asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadMode {
    /// Presence probe: no bytes are moved.
    Init,
    /// Consume up to the byte budget.
    Bytes,
    /// Copy up to the byte budget without consuming it.
    Speculative,
    /// Consume up to and including the next line feed.
    GetLine,
    /// Consume everything currently obtainable.
    Exhaustive,
}

impl ReadMode {
    /// True when the read removes bytes from the source.
    pub fn consumes(self) -> bool {
        matches!(self, Self::Bytes | Self::GetLine | Self::Exhaustive)
    }
}

/// Whether a read may suspend the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockMode {
    #[default]
    Block,
    NonBlock,
}

/// A pull-based byte source: the next stage a filter reads from.
///
/// Implementations append whatever they produce to `out` and report the
/// outcome as a [`ReadStatus`]. A `max_bytes` of zero means "no limit".
pub trait Upstream {
    fn read(
        &mut self,
        out: &mut Brigade,
        mode: ReadMode,
        block: BlockMode,
        max_bytes: usize,
    ) -> ReadStatus;

    /// Whether the connection behind this source has been aborted.
    fn is_aborted(&self) -> bool {
        false
    }
}

impl<U: Upstream + ?Sized> Upstream for &mut U {
    fn read(
        &mut self,
        out: &mut Brigade,
        mode: ReadMode,
        block: BlockMode,
        max_bytes: usize,
    ) -> ReadStatus {
        (**self).read(out, mode, block, max_bytes)
    }

    fn is_aborted(&self) -> bool {
        (**self).is_aborted()
    }
}

impl<U: Upstream + ?Sized> Upstream for Box<U> {
    fn read(
        &mut self,
        out: &mut Brigade,
        mode: ReadMode,
        block: BlockMode,
        max_bytes: usize,
    ) -> ReadStatus {
        (**self).read(out, mode, block, max_bytes)
    }

    fn is_aborted(&self) -> bool {
        (**self).is_aborted()
    }
}
