//! Typed-key containers used by the sound caches.
#![warn(missing_docs)]

/// Easily creates typed keys for a simple slab.
#[macro_export]
macro_rules! create_simple_key {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Ord, Eq, Hash)]
        pub struct $name(u32);

        impl $crate::SimpleKey for $name {
            fn new(key: u32) -> Self {
                Self(key)
            }

            fn key(&self) -> u32 {
                self.0
            }
        }
    };
    ($name:ident) => {
        create_simple_key!($name, "no documentation");
    };
}

/// Easily creates typed keys for a generational slab.
#[macro_export]
macro_rules! create_generational_key {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Ord, Eq, Hash)]
        pub struct $name {
            key: u32,
            generation: core::num::NonZeroU32,
        }

        impl $crate::GenerationalKey for $name {
            fn new(key: u32, generation: core::num::NonZeroU32) -> Self {
                Self { key, generation }
            }

            fn key(&self) -> u32 {
                self.key
            }

            fn generation(&self) -> core::num::NonZeroU32 {
                self.generation
            }
        }
    };
    ($name:ident) => {
        create_generational_key!($name, "no documentation");
    };
}

mod generational_slab;
mod simple_slab;

pub use generational_slab::{GenerationalIter, GenerationalKey, GenerationalSlab};
pub use simple_slab::{SimpleIterator, SimpleKey, SimpleSlab};

/// Something that can be cached.
pub trait Cacheable {
    /// Must return the size of the object. The size can be the actual byte
    /// size of a struct or the size that is allocated for an external
    /// resource.
    fn size(&self) -> usize;
}

impl Cacheable for Vec<u8> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<T: Cacheable> Cacheable for std::sync::Arc<T> {
    fn size(&self) -> usize {
        self.as_ref().size()
    }
}

impl Cacheable for std::sync::Arc<[u8]> {
    fn size(&self) -> usize {
        self.len()
    }
}
