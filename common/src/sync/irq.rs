use core::fmt::Debug;

/// Architecture-specific local interrupt masking interface.
///
/// Only the interrupts of the executing core are affected. Implemented by
/// the architecture layer (CPSR on ARM, a per-thread flag on the hosted port).
pub trait IrqControl: 'static {
    /// Saved interrupt state
    type State: Copy + Debug;

    /// Disable local interrupts and return the previous state.
    fn disable() -> Self::State;

    /// Restore local interrupts to a previously saved state.
    fn restore(state: Self::State);

    /// Unconditionally enable local interrupts.
    fn enable();

    /// Whether local interrupts are currently enabled.
    fn enabled() -> bool;
}
