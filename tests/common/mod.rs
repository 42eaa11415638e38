/*!
 * Shared test helpers
 */

#![allow(dead_code)]

use std::hash::{BuildHasherDefault, Hasher};
use std::thread;
use std::time::{Duration, Instant};

/// Hashes a u64 to itself so tests can choose which ids share a slot
#[derive(Default)]
pub struct IdentityHasher(u64);

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.0 = (self.0 << 8) | u64::from(*b);
        }
    }

    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
}

pub type Identity = BuildHasherDefault<IdentityHasher>;

/// Poll `condition` until it holds, failing the test after five seconds
pub fn wait_until<F: FnMut() -> bool>(mut condition: F, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(1));
    }
}
