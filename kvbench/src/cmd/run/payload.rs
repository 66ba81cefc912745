use rand::Rng;

use crate::{
    config::{KeySpace, WorkloadMode},
    protocol::{KvRequest, RequestPayload},
};

/// Share of `GET_PUT_MIX` requests that are reads.
const MIX_READ_RATIO: f64 = 0.5;
/// Cumulative share of reads and writes, the remainder are deletes.
const MIX_READ_WRITE_RATIO: f64 = 0.9;
/// Upper bound of the `mix_<n>` values written by `GET_PUT_MIX`.
const MIX_VALUE_MAX: u32 = 1024;

/// Maps a workload mode to fresh requests.
///
/// Holds no mutable state: every call draws from its own randomness,
/// so a single generator can be shared by any number of workers.
#[derive(Debug, Clone)]
pub struct PayloadGenerator {
    keyspace: KeySpace,
    heavy_value: String,
}

impl PayloadGenerator {
    pub fn new(keyspace: KeySpace) -> Self {
        Self {
            heavy_value: "X".repeat(keyspace.value_size),
            keyspace: KeySpace {
                hot_keys: keyspace.hot_keys.max(1),
                cold_keys: keyspace.cold_keys.max(1),
                value_size: keyspace.value_size,
            },
        }
    }

    /// Generate the payload of one request using thread local randomness.
    pub fn generate(&self, mode: WorkloadMode, directive: &str) -> RequestPayload {
        self.generate_with_rng(mode, directive, &mut rand::rng())
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        mode: WorkloadMode,
        directive: &str,
        rng: &mut R,
    ) -> RequestPayload {
        self.plan(mode, rng).encode(directive)
    }

    /// Decide operation, key and value of the next request.
    pub fn plan<R: Rng + ?Sized>(&self, mode: WorkloadMode, rng: &mut R) -> KvRequest {
        match mode {
            WorkloadMode::GetPopular => {
                KvRequest::get(rng.random_range(1..=self.keyspace.hot_keys))
            }
            WorkloadMode::GetAll => KvRequest::get(self.cold_key(rng)),
            WorkloadMode::PutAll => KvRequest::set(self.cold_key(rng), self.heavy_value.as_str()),
            WorkloadMode::GetPutMix => {
                let key = self.cold_key(rng);
                let selector: f64 = rng.random();
                if selector < MIX_READ_RATIO {
                    KvRequest::get(key)
                } else if selector < MIX_READ_WRITE_RATIO {
                    let n = rng.random_range(1..=MIX_VALUE_MAX);
                    KvRequest::set(key, format!("mix_{n}"))
                } else {
                    KvRequest::delete(key)
                }
            }
        }
    }

    fn cold_key<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.random_range(1..=self.keyspace.cold_keys)
    }
}

impl Default for PayloadGenerator {
    fn default() -> Self {
        Self::new(KeySpace::default())
    }
}

/// Generate one payload with the default key space.
pub fn generate(mode: WorkloadMode, directive: &str) -> RequestPayload {
    PayloadGenerator::default().generate(mode, directive)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng as _, rngs::SmallRng};

    use super::*;
    use crate::{cmd::mock::protocol::parse_request_head, protocol::KvOperation};

    const ALL_MODES: [WorkloadMode; 4] = [
        WorkloadMode::GetPopular,
        WorkloadMode::GetAll,
        WorkloadMode::PutAll,
        WorkloadMode::GetPutMix,
    ];

    #[test]
    fn test_keys_stay_within_mode_range() {
        let generator = PayloadGenerator::default();
        let mut rng = SmallRng::seed_from_u64(1);

        for mode in ALL_MODES {
            let max = match mode {
                WorkloadMode::GetPopular => 50,
                _ => 10_000_000,
            };
            for _ in 0..20_000 {
                let req = generator.plan(mode, &mut rng);
                assert!(
                    (1..=max).contains(&req.key),
                    "mode {mode}: key {} out of range",
                    req.key
                );
            }
        }
    }

    #[test]
    fn test_small_keyspace_hits_both_bounds() {
        let generator = PayloadGenerator::new(KeySpace {
            hot_keys: 3,
            cold_keys: 5,
            value_size: 1,
        });
        let mut rng = SmallRng::seed_from_u64(2);

        let mut hot_seen = [false; 3];
        let mut cold_seen = [false; 5];
        for _ in 0..1_000 {
            let hot = generator.plan(WorkloadMode::GetPopular, &mut rng).key;
            hot_seen[(hot - 1) as usize] = true;
            let cold = generator.plan(WorkloadMode::GetAll, &mut rng).key;
            cold_seen[(cold - 1) as usize] = true;
        }
        assert!(hot_seen.iter().all(|seen| *seen), "{hot_seen:?}");
        assert!(cold_seen.iter().all(|seen| *seen), "{cold_seen:?}");
    }

    #[test]
    fn test_operation_per_mode() {
        let generator = PayloadGenerator::default();
        let mut rng = SmallRng::seed_from_u64(3);

        for _ in 0..1_000 {
            assert_eq!(
                generator.plan(WorkloadMode::GetPopular, &mut rng).op,
                KvOperation::Get
            );
            assert_eq!(
                generator.plan(WorkloadMode::GetAll, &mut rng).op,
                KvOperation::Get
            );

            let put = generator.plan(WorkloadMode::PutAll, &mut rng);
            assert_eq!(put.op, KvOperation::Set);
            let value = put.value.unwrap();
            assert_eq!(value.len(), 512);
            assert!(value.bytes().all(|b| b == b'X'));
        }
    }

    #[test]
    fn test_mix_ratio_converges() {
        const N: usize = 200_000;

        let generator = PayloadGenerator::default();
        let mut rng = SmallRng::seed_from_u64(4);

        let (mut reads, mut writes, mut deletes) = (0usize, 0usize, 0usize);
        for _ in 0..N {
            let req = generator.plan(WorkloadMode::GetPutMix, &mut rng);
            match req.op {
                KvOperation::Get => {
                    assert!(req.value.is_none());
                    reads += 1;
                }
                KvOperation::Set => {
                    let value = req.value.unwrap();
                    let n: u32 = value.strip_prefix("mix_").unwrap().parse().unwrap();
                    assert!((1..=1024).contains(&n), "value: {value}");
                    writes += 1;
                }
                KvOperation::Delete => {
                    assert!(req.value.is_none());
                    deletes += 1;
                }
            }
        }

        let ratio = |count: usize| count as f64 / N as f64;
        assert!((ratio(reads) - 0.5).abs() < 0.01, "reads: {}", ratio(reads));
        assert!((ratio(writes) - 0.4).abs() < 0.01, "writes: {}", ratio(writes));
        assert!((ratio(deletes) - 0.1).abs() < 0.01, "deletes: {}", ratio(deletes));
    }

    #[test]
    fn test_generated_payload_is_a_valid_request_head() {
        let generator = PayloadGenerator::default();
        let mut rng = SmallRng::seed_from_u64(5);

        for mode in ALL_MODES {
            for directive in ["keep-alive", "close"] {
                let payload = generator.generate_with_rng(mode, directive, &mut rng);
                let head = parse_request_head(payload.as_bytes()).unwrap();
                assert_eq!(head.keep_alive, directive == "keep-alive");
                assert!(head.route.is_some(), "mode {mode}: {head:?}");
            }
        }
    }

    #[test]
    fn test_generate_uses_default_keyspace() {
        let payload = generate(WorkloadMode::GetPopular, "close");
        let head = parse_request_head(payload.as_bytes()).unwrap();
        let route = head.route.unwrap();
        let key: u64 = route.key.parse().unwrap();
        assert!((1..=50).contains(&key));
        assert!(!head.keep_alive);
    }
}
