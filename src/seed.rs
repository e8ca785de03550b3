//! Request-scoped random context.
//!
//! One integer seed drives three independent sources: the tensor framework,
//! the general runtime, and the array library. The array source only takes
//! 32-bit seeds, so it receives `seed mod 2^32`.
//!
//! Each source is a `ChaCha8Rng` built on demand, so two contexts made from
//! the same seed always produce identical streams and no global state is
//! touched.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedContext {
    framework_seed: u64,
    runtime_seed: u64,
    array_seed: u32,
}

impl SeedContext {
    pub fn new(seed: u64) -> Self {
        Self {
            framework_seed: seed,
            runtime_seed: seed,
            array_seed: (seed % (1u64 << 32)) as u32,
        }
    }

    pub fn framework_seed(&self) -> u64 {
        self.framework_seed
    }

    pub fn runtime_seed(&self) -> u64 {
        self.runtime_seed
    }

    pub fn array_seed(&self) -> u32 {
        self.array_seed
    }

    pub fn framework_rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.framework_seed)
    }

    pub fn runtime_rng(&self) -> ChaCha8Rng {
        // Separate stream so the runtime source never mirrors the framework one.
        let mut rng = ChaCha8Rng::seed_from_u64(self.runtime_seed);
        rng.set_stream(1);
        rng
    }

    pub fn array_rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(u64::from(self.array_seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn array_seed_is_reduced_mod_2_32() {
        let ctx = SeedContext::new(u64::MAX);
        assert_eq!(ctx.framework_seed(), u64::MAX);
        assert_eq!(ctx.runtime_seed(), u64::MAX);
        assert_eq!(ctx.array_seed(), u32::MAX);

        let ctx = SeedContext::new((1u64 << 32) + 7);
        assert_eq!(ctx.array_seed(), 7);
        assert_eq!(ctx.framework_seed(), (1u64 << 32) + 7);
    }

    #[test]
    fn same_seed_gives_same_streams() {
        let a = SeedContext::new(1337);
        let b = SeedContext::new(1337);
        assert_eq!(a, b);
        assert_eq!(
            a.framework_rng().random::<u64>(),
            b.framework_rng().random::<u64>()
        );
        assert_eq!(a.runtime_rng().random::<u64>(), b.runtime_rng().random::<u64>());
        assert_eq!(a.array_rng().random::<u64>(), b.array_rng().random::<u64>());
    }

    #[test]
    fn runtime_stream_differs_from_framework_stream() {
        let ctx = SeedContext::new(42);
        assert_ne!(
            ctx.framework_rng().random::<u64>(),
            ctx.runtime_rng().random::<u64>()
        );
    }
}
