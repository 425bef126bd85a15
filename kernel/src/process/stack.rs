use alloc::vec::Vec;
use core::mem::size_of;

/// Sentinel written at both ends of every process stack.
pub const STACK_CANARY: usize = 0xCCAA_DDBB;

/// Pattern painted over the unused part of a fresh stack, used to find the
/// high-water mark.
const STACK_PAINT: usize = 0x5A5A_5A5A;

const WORD: usize = size_of::<usize>();
const STACK_ALIGN: usize = 8;

/// Kernel-mode stack of a process
///
/// The lowest and the highest word hold [`STACK_CANARY`]; everything in
/// between starts out painted. Deallocated on drop.
pub struct ProcessStack {
    words: Vec<usize>,
}

impl ProcessStack {
    /// Allocate a stack of at least `size` bytes.
    pub fn new(size: usize) -> Result<Self, StackError> {
        let len = size.div_ceil(WORD).max(4);
        let mut words = Vec::new();
        words
            .try_reserve_exact(len)
            .map_err(|_| StackError::OutOfMemory)?;
        words.resize(len, STACK_PAINT);
        words[0] = STACK_CANARY;
        words[len - 1] = STACK_CANARY;
        Ok(Self { words })
    }

    /// Get the bottom of the stack (lowest address)
    pub fn bottom(&self) -> usize {
        self.words.as_ptr() as usize
    }

    /// Get the top of the stack (highest address, stack grows downward)
    pub fn top(&self) -> usize {
        self.bottom() + self.size()
    }

    /// Get the size of the stack in bytes
    pub fn size(&self) -> usize {
        self.words.len() * WORD
    }

    /// Whether `addr` lies in the usable part of the stack (canaries excluded).
    pub fn contains(&self, addr: usize) -> bool {
        addr > self.bottom() && addr < self.top() - WORD
    }

    pub fn canaries_intact(&self) -> bool {
        self.words[0] == STACK_CANARY && self.words[self.words.len() - 1] == STACK_CANARY
    }

    /// Bytes between the canaries.
    pub fn usable(&self) -> usize {
        (self.words.len() - 2) * WORD
    }

    /// Deepest usage observed so far, in bytes.
    pub fn high_water_mark(&self) -> usize {
        let usable = &self.words[1..self.words.len() - 1];
        let untouched = usable.iter().take_while(|w| **w == STACK_PAINT).count();
        (usable.len() - untouched) * WORD
    }

    /// Percentage of the stack that has never been used.
    pub fn available_percent(&self) -> u8 {
        let usable = self.usable();
        let free = usable - self.high_water_mark();
        (free * 100 / usable) as u8
    }

    /// Write `frame` just below the top canary, ending on an aligned
    /// boundary, and return the address of its first word.
    pub fn push_initial_frame(&mut self, frame: &[usize]) -> Option<usize> {
        let top_canary = self.bottom() + (self.words.len() - 1) * WORD;
        let end = top_canary & !(STACK_ALIGN - 1);
        let start = end.checked_sub(frame.len() * WORD)?;
        if start < self.bottom() + WORD {
            return None;
        }
        let first = (start - self.bottom()) / WORD;
        self.words[first..first + frame.len()].copy_from_slice(frame);
        Some(start)
    }

    #[cfg(test)]
    pub(crate) fn smash_canary(&mut self) {
        self.words[0] = 0;
    }
}

/// Stack allocation error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// Not enough memory to allocate stack
    OutOfMemory,
}
