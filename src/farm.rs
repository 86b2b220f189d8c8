//! Faster (but not DoS-resistant) hashmap for token lookups
use std::collections::HashMap;
use std::hash::{Hash, Hasher, BuildHasherDefault};

/// Hasher that farmhashes each write and folds it into the running value
///
/// farmhash isn't a streaming hash. `str` hashes as its bytes followed by a 0xff marker
/// byte, so the marker write is folded into the previous hash instead of replacing it.
#[derive(Default)]
pub struct FarmHashLie(u64);

impl Hasher for FarmHashLie {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        self.0 = self.0.rotate_left(5) ^ farmhash::hash64(bytes);
    }
}

pub type Farm = BuildHasherDefault<FarmHashLie>;
pub type FarmMap<X, Y> = HashMap<X, Y, Farm>;

pub fn new_farm<X: Hash + Eq, Y>() -> FarmMap<X, Y> {
    Default::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_tokens_do_not_collide() {
        let mut map = new_farm();
        map.insert("casa".to_string(), 0u32);
        map.insert("cão".to_string(), 1u32);
        map.insert("".to_string(), 2u32);
        assert_eq!(map.get("casa"), Some(&0));
        assert_eq!(map.get("cão"), Some(&1));
        assert_eq!(map.get(""), Some(&2));
        assert_eq!(map.get("casas"), None);
    }
}
