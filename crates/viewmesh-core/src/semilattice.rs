//! Join semilattice foundation
//!
//! For any state-based CRDT `S`, the join operation `⊔` must satisfy:
//!
//! - **Commutativity**: `a ⊔ b = b ⊔ a`
//! - **Associativity**: `(a ⊔ b) ⊔ c = a ⊔ (b ⊔ c)`
//! - **Idempotency**: `a ⊔ a = a`
//!
//! Together these make replay, duplication and arbitrary delivery order
//! safe: replicas converge regardless of how sync messages arrive.

/// State that can be merged with another state of the same type
pub trait JoinSemilattice: Clone {
    /// Least upper bound of `self` and `other`
    fn join(&self, other: &Self) -> Self;

    /// In-place join; the default delegates to [`JoinSemilattice::join`]
    fn join_assign(&mut self, other: &Self) {
        *self = self.join(other);
    }
}

/// Least element of a semilattice (`bottom ⊔ a = a`)
pub trait Bottom {
    /// The bottom element
    fn bottom() -> Self;
}

impl JoinSemilattice for u64 {
    fn join(&self, other: &Self) -> Self {
        (*self).max(*other)
    }
}

impl Bottom for u64 {
    fn bottom() -> Self {
        0
    }
}
