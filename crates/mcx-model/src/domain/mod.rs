mod generation;
pub use generation::Generation;

mod invariant;
pub use invariant::{Invariant, InvariantKind};

mod unit;
pub use unit::{CheckableUnit, ModelSource};
