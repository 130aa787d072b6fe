use lazy_static::lazy_static;
use log::warn;
use rand::rngs::OsRng;
use rand::{RngCore, SeedableRng};
use std::sync::Mutex;

// A process-wide CSPRNG used for SASL nonces, client context ids and scan
// session jitter. Seeded once from the OS entropy source; if that source is
// unavailable the thread RNG keeps the library functional.
lazy_static! {
    static ref GENERATOR: Mutex<rand::rngs::StdRng> = {
        match rand::rngs::StdRng::from_rng(OsRng) {
            Ok(rng) => Mutex::new(rng),
            Err(e) => {
                warn!("System CSPRNG unavailable, falling back to thread rng: {e}");
                Mutex::new(rand::rngs::StdRng::from_rng(rand::thread_rng()).unwrap())
            }
        }
    };
}

pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    fill_random(&mut buf);
    buf
}

pub fn fill_random(buf: &mut [u8]) {
    let mut guard = GENERATOR.lock().unwrap();
    guard.fill_bytes(buf);
}

pub fn random_u64() -> u64 {
    let mut guard = GENERATOR.lock().unwrap();
    guard.next_u64()
}

pub fn random_usize_below(bound: usize) -> usize {
    if bound <= 1 {
        return 0;
    }

    (random_u64() % bound as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_requested_length() {
        assert_eq!(random_bytes(16).len(), 16);
        assert_eq!(random_bytes(0).len(), 0);
    }

    #[test]
    fn bound_is_respected() {
        for _ in 0..64 {
            assert!(random_usize_below(3) < 3);
        }
        assert_eq!(random_usize_below(0), 0);
        assert_eq!(random_usize_below(1), 0);
    }

    #[test]
    fn consecutive_draws_differ() {
        let a = random_bytes(32);
        let b = random_bytes(32);
        assert_ne!(a, b);
    }
}
