use std::sync::Arc;
use std::thread;

use compress::{Capabilities, CodecId, Compressor, CompressorConfig, ResourcePool};
use proptest::prelude::*;

fn codecs() -> Vec<CodecId> {
    Capabilities::compiled()
        .available()
        .filter(|codec| !codec.is_none())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn concurrent_round_trips_never_mix_handles(
        payloads in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 0..2048),
            100..140,
        ),
    ) {
        let pool = Arc::new(ResourcePool::new());
        let compressors: Vec<Compressor> = codecs()
            .into_iter()
            .map(|codec| {
                Compressor::new(CompressorConfig::new(codec))
                    .unwrap()
                    .with_pool(Arc::clone(&pool))
            })
            .collect();

        let failures: usize = thread::scope(|scope| {
            let workers: Vec<_> = payloads
                .iter()
                .enumerate()
                .map(|(index, payload)| {
                    let compressor = &compressors[index % compressors.len()];
                    scope.spawn(move || {
                        let encoded = compressor.compress(payload).unwrap();
                        let decoded = compressor.decompress(encoded.as_bytes()).unwrap();
                        usize::from(decoded.as_bytes() != &payload[..])
                    })
                })
                .collect();
            workers.into_iter().map(|worker| worker.join().unwrap()).sum()
        });

        prop_assert_eq!(failures, 0);
        let total_calls = 2 * payloads.len() as u64;
        prop_assert_eq!(pool.created() + pool.reused(), total_calls);
        let idle: usize = codecs().into_iter().map(|codec| pool.idle(codec)).sum();
        prop_assert_eq!(idle as u64, pool.created());
    }
}

#[test]
fn sequential_calls_reuse_one_handle_per_role() {
    let pool = Arc::new(ResourcePool::new());
    let compressor = Compressor::new(CompressorConfig::new(CodecId::Gzip))
        .unwrap()
        .with_pool(Arc::clone(&pool));
    for round in 0..50u32 {
        let payload = round.to_le_bytes().repeat(100);
        let encoded = compressor.compress(&payload).unwrap();
        assert_eq!(compressor.decompress(encoded.as_bytes()).unwrap().as_bytes(), &payload[..]);
    }
    assert_eq!(pool.created(), 2);
    assert_eq!(pool.reused(), 98);
    assert_eq!(pool.idle(CodecId::Gzip), 2);
}

#[test]
fn failed_operations_return_handles() {
    let pool = Arc::new(ResourcePool::new());
    let compressor = Compressor::new(CompressorConfig::new(CodecId::Gzip))
        .unwrap()
        .with_pool(Arc::clone(&pool));
    for _ in 0..10 {
        assert!(compressor.decompress(&[0x1F, 0x8B, 0x08, 0x00, 0xFF]).is_err());
    }
    assert_eq!(pool.created(), 1);
    assert_eq!(pool.idle(CodecId::Gzip), 1);
}
