use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use rand::rngs::StdRng;
use rand::SeedableRng;
use securebytes::{MemoryProtection, SecureBytes, SecureBytesError};
use subtle::ConstantTimeEq;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_zero() {
    init_logging();
    for len in [0, 1, 16, 4095, 4096, 4097, 10_000] {
        let bytes = SecureBytes::zero(len).expect("SecureBytes::zero failed");
        assert_eq!(bytes.len(), len);
        bytes.read(|data| {
            assert_eq!(data.len(), len);
            assert!(data.iter().all(|&b| b == 0), "zero({}) returned non-zero bytes", len);
        });
    }
}

#[test]
fn test_random_samples_are_unique() {
    init_logging();
    const SAMPLES: usize = 16_384;

    let mut seen = HashSet::with_capacity(SAMPLES);
    for _ in 0..SAMPLES {
        let bytes = SecureBytes::random(16).expect("SecureBytes::random failed");
        assert_eq!(bytes.len(), 16);
        let sample = bytes.read(|data| data.to_vec());
        assert!(seen.insert(sample), "random(16) produced a duplicate sample");
    }
}

#[test]
fn test_random_empty() {
    let bytes = SecureBytes::random(0).expect("SecureBytes::random(0) failed");
    assert!(bytes.is_empty());
    bytes.read(|data| assert!(data.is_empty()));
}

#[test]
fn test_random_with_caller_generator() {
    let mut first_rng = StdRng::seed_from_u64(7);
    let mut second_rng = StdRng::seed_from_u64(7);
    let mut other_rng = StdRng::seed_from_u64(8);

    let first = SecureBytes::random_with(32, &mut first_rng).expect("random_with failed");
    let second = SecureBytes::random_with(32, &mut second_rng).expect("random_with failed");
    let other = SecureBytes::random_with(32, &mut other_rng).expect("random_with failed");

    assert_eq!(first, second, "same seed should give the same bytes");
    assert_ne!(first, other, "different seeds should give different bytes");
}

#[test]
fn test_copying_round_trip() {
    let source = b"the quick brown fox jumps over the lazy dog".to_vec();
    let bytes = SecureBytes::copying(&source).expect("SecureBytes::copying failed");

    assert_eq!(bytes.len(), source.len());
    bytes.read(|data| assert_eq!(data, source.as_slice()));
    assert_eq!(source, b"the quick brown fox jumps over the lazy dog", "copying must not touch the source");
}

#[test]
fn test_erasing_wipes_source() {
    let mut source = b"testing".to_vec();
    let bytes = SecureBytes::erasing(&mut source).expect("SecureBytes::erasing failed");

    assert_eq!(source, vec![0; 7], "erasing should zero the source");
    bytes.read(|data| assert_eq!(data, b"testing"));
}

#[test]
fn test_resize_grow() {
    let mut bytes = SecureBytes::copying(&[9, 8, 7, 6]).expect("copying failed");
    bytes.resize(10, 0x42).expect("resize failed");

    assert_eq!(bytes.len(), 10);
    bytes.read(|data| {
        assert_eq!(&data[..4], &[9, 8, 7, 6]);
        assert!(data[4..].iter().all(|&b| b == 0x42));
    });
}

#[test]
fn test_resize_shrink() {
    let mut bytes = SecureBytes::copying(b"abcdefgh").expect("copying failed");
    bytes.resize(3, 0).expect("resize failed");

    assert_eq!(bytes.len(), 3);
    bytes.read(|data| assert_eq!(data, b"abc"));

    // Growing again must not resurrect the dropped tail.
    bytes.resize(8, 0).expect("resize failed");
    bytes.read(|data| assert_eq!(data, b"abc\0\0\0\0\0"));
}

#[test]
fn test_resize_to_and_from_empty() {
    let mut bytes = SecureBytes::copying(b"abc").expect("copying failed");
    bytes.resize(0, 0xEE).expect("resize to zero failed");
    assert!(bytes.is_empty());

    bytes.resize(2, 0xEE).expect("resize from zero failed");
    bytes.read(|data| assert_eq!(data, [0xEE, 0xEE]));
}

#[test]
fn test_resize_end_to_end() {
    let mut b = SecureBytes::copying(&[0x01, 0x02, 0x03]).expect("copying failed");

    b.resize(5, 0xFF).expect("resize failed");
    b.read(|data| assert_eq!(data, [0x01, 0x02, 0x03, 0xFF, 0xFF]));

    b.resize(2, 0).expect("resize failed");
    b.read(|data| assert_eq!(data, [0x01, 0x02]));
}

#[test]
fn test_allocation_error() {
    let result = SecureBytes::zero(usize::MAX / 2);
    match result {
        Err(SecureBytesError::Allocation(err)) => {
            assert_eq!(err.requested_len(), usize::MAX / 2);
        }
        other => panic!("expected an allocation error, got {:?}", other),
    }

    assert!(matches!(
        SecureBytes::copying(&[]).map(|b| b.len()),
        Ok(0)
    ));
}

#[test]
fn test_protection_outside_accessors() {
    let mut bytes = SecureBytes::zero(32).expect("zero failed");
    assert_eq!(bytes.protection(), MemoryProtection::NoAccess);

    bytes.read(|_| {
        assert_eq!(bytes.protection(), MemoryProtection::ReadOnly);
        bytes.read(|_| assert_eq!(bytes.protection(), MemoryProtection::ReadOnly));
        assert_eq!(bytes.protection(), MemoryProtection::ReadOnly);
    });
    assert_eq!(bytes.protection(), MemoryProtection::NoAccess);

    bytes.write(|data| data[0] = 1);
    assert_eq!(bytes.protection(), MemoryProtection::NoAccess);
}

#[test]
fn test_body_error_propagates() {
    let bytes = SecureBytes::copying(b"abc").expect("copying failed");

    let result: Result<usize, String> = bytes.read(|data| {
        if data.starts_with(b"a") {
            return Err("rejected".to_string());
        }
        Ok(data.len())
    });

    assert_eq!(result, Err("rejected".to_string()));
    assert_eq!(bytes.protection(), MemoryProtection::NoAccess);
}

#[test]
fn test_body_panic_releases_access() {
    let mut bytes = SecureBytes::zero(8).expect("zero failed");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        bytes.write(|data| {
            data.fill(3);
            panic!("simulated failure inside write");
        })
    }));
    assert!(outcome.is_err());
    assert_eq!(bytes.protection(), MemoryProtection::NoAccess);

    bytes.read(|data| assert_eq!(data, [3; 8]));
}

#[test]
fn test_try_clone_is_independent() {
    let mut original = SecureBytes::copying(b"secret").expect("copying failed");
    let copy = original.try_clone().expect("try_clone failed");
    assert_eq!(original, copy);

    original.write(|data| data[0] = b'S');
    copy.read(|data| assert_eq!(data, b"secret"));
    assert_ne!(original, copy);
}

#[test]
fn test_constant_time_eq() {
    let a = SecureBytes::copying(b"same").expect("copying failed");
    let b = SecureBytes::copying(b"same").expect("copying failed");
    let c = SecureBytes::copying(b"diff").expect("copying failed");
    let d = SecureBytes::copying(b"longer").expect("copying failed");

    assert!(bool::from(a.ct_eq(&b)));
    assert!(!bool::from(a.ct_eq(&c)));
    assert!(!bool::from(a.ct_eq(&d)));

    // Comparing a value with itself nests two reads on one region.
    let same = &a;
    assert!(bool::from(a.ct_eq(same)));
    assert_eq!(a.protection(), MemoryProtection::NoAccess);
}

#[test]
fn test_wipe() {
    let mut bytes = SecureBytes::copying(&[0xCC; 64]).expect("copying failed");
    bytes.wipe();
    assert_eq!(bytes.len(), 64);
    bytes.read(|data| assert!(data.iter().all(|&b| b == 0)));
}

#[test]
fn test_debug_is_redacted() {
    let bytes = SecureBytes::copying(b"do not print").expect("copying failed");
    let rendered = format!("{:?}", bytes);
    assert!(rendered.contains("len: 12"));
    assert!(!rendered.contains("print"));
}
