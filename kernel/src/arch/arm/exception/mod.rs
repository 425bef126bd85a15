pub mod trap;

pub use trap::TrapFrame;
