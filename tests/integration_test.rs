use homhash::{Backend, Blake2Xb, HashError, LtHash16, LtHash20, LtHash32, OutputLen};


fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

const OBJ1: &[u8] = b"spherical cow";
const OBJ2: &[u8] = b"hello world";
const OBJ3: &[u8] = b"penguins";

#[test]
fn add_remove_walkthrough() -> Result<(), HashError> {
    let mut hash = LtHash16::new()?;
    let c0 = hash.checksum().to_vec();
    assert!(c0.iter().all(|&b| b == 0));

    hash.add(OBJ1)?;
    let c1 = hash.checksum().to_vec();
    assert_ne!(c1, c0);

    hash.add(OBJ2)?;
    let c2 = hash.checksum().to_vec();
    assert_ne!(c2, c1);

    hash.remove(OBJ2)?;
    let c3 = hash.checksum().to_vec();
    assert_eq!(c3, c1);
    Ok(())
}

#[test]
fn insertion_order_does_not_matter() -> Result<(), HashError> {
    let mut forward = LtHash16::new()?;
    forward.add(OBJ1)?.add(OBJ2)?;

    let mut backward = LtHash16::new()?;
    backward.add(OBJ2)?.add(OBJ1)?;

    assert_eq!(forward.checksum(), backward.checksum());

    // A longer permutation, all three sizings.
    let objs: Vec<Vec<u8>> = (0u32..20).map(|i| i.to_le_bytes().to_vec()).collect();
    let mut rotated = objs.clone();
    rotated.rotate_left(7);
    rotated.swap(0, 13);

    macro_rules! check_permutation {
        ($ty:ty) => {{
            let mut in_order = <$ty>::new()?;
            in_order.add_all(&objs)?;
            let mut permuted = <$ty>::new()?;
            permuted.add_all(&rotated)?;
            assert_eq!(in_order, permuted);
        }};
    }
    check_permutation!(LtHash16);
    check_permutation!(LtHash20);
    check_permutation!(LtHash32);
    Ok(())
}

#[test]
fn add_remove_is_identity_from_any_state() -> Result<(), HashError> {
    let mut base = LtHash20::new()?;
    base.add(OBJ1)?.add(OBJ3)?;

    let mut probe = base.clone();
    probe.add(OBJ2)?.remove(OBJ2)?;
    assert_eq!(probe, base);

    // Removal first goes through a negative multiset and comes back.
    let mut probe = base.clone();
    probe.remove(OBJ2)?.add(OBJ2)?;
    assert_eq!(probe, base);
    Ok(())
}

#[test]
fn combine_equals_sum_of_singletons() -> Result<(), HashError> {
    let mut a = LtHash16::new()?;
    a.add(OBJ1)?;
    let mut b = LtHash16::new()?;
    b.add(OBJ2)?;
    let mut joint = LtHash16::new()?;
    joint.add(OBJ1)?.add(OBJ2)?;

    let mut combined = a.clone();
    combined.combine_add(&b)?;
    assert_eq!(combined.checksum(), joint.checksum());

    // And subtracting B gets back to A.
    combined.combine_remove(&b)?;
    assert_eq!(combined, a);
    Ok(())
}

#[test]
fn combine_with_different_keys_is_rejected() -> Result<(), HashError> {
    let mut a = LtHash16::new()?;
    a.set_key(b"0123456789abcdef")?;
    a.add(OBJ1)?;

    let mut b = LtHash16::new()?;
    b.set_key(b"fedcba9876543210")?;
    b.add(OBJ1)?;

    assert_ne!(a.checksum(), b.checksum());
    assert!(matches!(a.combine_add(&b), Err(HashError::KeyMismatch)));
    assert!(matches!(a.combine_remove(&b), Err(HashError::KeyMismatch)));

    // Same key combines fine.
    let mut c = LtHash16::new()?;
    c.set_key(b"0123456789abcdef")?;
    c.add(OBJ2)?;
    a.combine_add(&c)?;
    Ok(())
}

#[test]
fn blake2xb_reference_vectors() -> Result<(), HashError> {
    for vector in test_vectors::blake2xb::NON_KEYED_VECTORS {
        let mut out = vec![0u8; vector.output_length];
        Blake2Xb::hash_single(&mut out, vector.input, None)?;
        assert_eq!(
            hex(&out),
            vector.expected,
            "unkeyed, output length {}",
            vector.output_length
        );
    }

    for vector in test_vectors::blake2xb::KEYED_VECTORS {
        let mut out = vec![0u8; vector.output_length];
        Blake2Xb::hash_single(&mut out, vector.input, Some(vector.key))?;
        assert_eq!(
            hex(&out),
            vector.expected,
            "keyed, output length {}",
            vector.output_length
        );
    }
    Ok(())
}

#[test]
fn lthash_reference_vectors() -> Result<(), HashError> {
    for vector in test_vectors::lthash::LTHASH_16_1024_VECTORS {
        let mut hash = LtHash16::new()?;
        if !vector.input.is_empty() {
            hash.add(vector.input)?;
        }
        assert_eq!(
            hex(&hash.checksum()[..16]),
            vector.expected_first_16_bytes,
            "LtHash16 {}",
            vector.name
        );
    }

    for vector in test_vectors::lthash::LTHASH_20_1008_VECTORS {
        let mut hash = LtHash20::new()?;
        if !vector.input.is_empty() {
            hash.add(vector.input)?;
        }
        assert_eq!(
            hex(&hash.checksum()[..16]),
            vector.expected_first_16_bytes,
            "LtHash20 {}",
            vector.name
        );
    }

    for vector in test_vectors::lthash::LTHASH_32_1024_VECTORS {
        let mut hash = LtHash32::new()?;
        if !vector.input.is_empty() {
            hash.add(vector.input)?;
        }
        assert_eq!(
            hex(&hash.checksum()[..16]),
            vector.expected_first_16_bytes,
            "LtHash32 {}",
            vector.name
        );
    }
    Ok(())
}

#[test]
fn padding_bit_in_initial_checksum_is_rejected() -> Result<(), HashError> {
    let mut checksum = vec![0u8; LtHash20::CHECKSUM_LEN];
    // Bit 62 of word 0 is one of the four padding bits per word.
    checksum[7] |= 0x40;
    assert!(matches!(
        LtHash20::with_checksum(&checksum),
        Err(HashError::InvalidChecksumPadding)
    ));

    // Each of the four padding positions is caught.
    for bit in [20u32, 41, 62, 63] {
        let mut checksum = vec![0u8; LtHash20::CHECKSUM_LEN];
        checksum[(bit / 8) as usize] |= 1u8 << (bit % 8);
        assert!(
            matches!(
                LtHash20::with_checksum(&checksum),
                Err(HashError::InvalidChecksumPadding)
            ),
            "padding bit {bit}"
        );
    }

    // The unpadded sizings accept any bit pattern of the right length.
    let filled = vec![0xffu8; LtHash16::CHECKSUM_LEN];
    LtHash16::with_checksum(&filled)?;
    Ok(())
}

#[test]
fn checksum_round_trips_through_bytes() -> Result<(), HashError> {
    let mut original = LtHash20::new()?;
    original.add(OBJ1)?.add(OBJ2)?.add(OBJ3)?;

    let exported = original.checksum().to_vec();
    let restored = LtHash20::with_checksum(&exported)?;
    assert_eq!(restored, original);
    assert_eq!(restored.checksum(), exported.as_slice());

    // The restored instance keeps working.
    let mut restored = restored;
    restored.remove(OBJ2)?;
    let mut expected = LtHash20::new()?;
    expected.add(OBJ1)?.add(OBJ3)?;
    assert_eq!(restored, expected);
    Ok(())
}

#[test]
fn key_size_boundaries() -> Result<(), HashError> {
    let mut hash = LtHash16::new()?;
    assert!(matches!(
        hash.set_key(&[7u8; 15]),
        Err(HashError::InvalidKeySize { .. })
    ));
    assert!(matches!(
        hash.set_key(&[7u8; 65]),
        Err(HashError::InvalidKeySize { .. })
    ));
    hash.set_key(&[7u8; 16])?;
    hash.set_key(&[7u8; 64])?;

    hash.clear_key();
    assert!(hash.key_equal_bytes(&[]));
    Ok(())
}

#[test]
fn empty_object_is_not_identity() -> Result<(), HashError> {
    let mut hash = LtHash16::new()?;
    hash.add(&[])?;
    assert!(!hash.is_zero());

    // It is the BLAKE2Xb digest of the empty string.
    let mut expected = vec![0u8; LtHash16::CHECKSUM_LEN];
    Blake2Xb::hash_single(&mut expected, &[], None)?;
    assert_eq!(hash.checksum(), expected.as_slice());

    hash.remove(&[])?;
    assert!(hash.is_zero());
    Ok(())
}

#[test]
fn backends_agree_end_to_end() -> Result<(), HashError> {
    let backends: Vec<Backend> = [Backend::Scalar, Backend::Sse2, Backend::Avx2]
        .into_iter()
        .filter(|b| b.is_available())
        .collect();
    let objs: Vec<Vec<u8>> = (0u32..32).map(|i| vec![i as u8; (i as usize % 7) + 1]).collect();

    macro_rules! check_backends {
        ($ty:ty) => {{
            let mut reference = <$ty>::with_backend(Backend::Scalar)?;
            reference.add_all(&objs)?;
            reference.remove(&objs[0])?;

            for &backend in &backends {
                let mut hash = <$ty>::with_backend(backend)?;
                hash.add_all(&objs)?;
                hash.remove(&objs[0])?;
                assert_eq!(
                    hash.checksum(),
                    reference.checksum(),
                    "{backend:?} disagrees with scalar"
                );
            }
        }};
    }
    check_backends!(LtHash16);
    check_backends!(LtHash20);
    check_backends!(LtHash32);
    Ok(())
}

#[test]
fn blake2xb_determinism_and_length_domain_separation() -> Result<(), HashError> {
    let mut first = vec![0u8; 32];
    let mut second = vec![0u8; 32];
    Blake2Xb::hash_single(&mut first, OBJ1, None)?;
    Blake2Xb::hash_single(&mut second, OBJ1, None)?;
    assert_eq!(first, second);

    // Different output lengths diverge from the first byte: the final
    // block size enters every expansion parameter block.
    let mut longer = vec![0u8; 64];
    Blake2Xb::hash_single(&mut longer, OBJ1, None)?;
    assert_ne!(first.as_slice(), &longer[..32]);
    Ok(())
}

#[test]
fn deferred_and_fixed_lengths_are_distinct_domains() -> Result<(), HashError> {
    // The deferred sentinel sits in the root parameter block, so even for
    // the same final length the two modes produce unrelated digests.
    let mut fixed = vec![0u8; 96];
    let mut xof = Blake2Xb::new(OutputLen::Fixed(96), None)?;
    xof.digest(OBJ2);
    xof.finish(&mut fixed)?;

    let mut deferred = vec![0u8; 96];
    let mut xof = Blake2Xb::new(OutputLen::DeferredUntilFinish, None)?;
    xof.digest(OBJ2);
    xof.finish(&mut deferred)?;

    assert_ne!(fixed, deferred);
    Ok(())
}

#[test]
fn streaming_equals_in_memory() -> Result<(), HashError> {
    let data = b"The quick brown fox jumps over the lazy dog. ".repeat(1000);

    let mut in_memory = LtHash16::new()?;
    in_memory.add(&data)?;

    let mut streamed = LtHash16::new()?;
    streamed.add_stream(std::io::Cursor::new(&data))?;
    assert_eq!(in_memory.checksum(), streamed.checksum());

    streamed.remove_stream(std::io::Cursor::new(&data))?;
    assert!(streamed.is_zero());
    Ok(())
}

#[test]
fn streaming_respects_key() -> Result<(), HashError> {
    let data = vec![0x5au8; 100_000];
    let key = [3u8; 32];

    let mut in_memory = LtHash20::new()?;
    in_memory.set_key(&key)?;
    in_memory.add(&data)?;

    let mut streamed = LtHash20::new()?;
    streamed.set_key(&key)?;
    streamed.add_stream(std::io::Cursor::new(&data))?;
    assert_eq!(in_memory, streamed);
    Ok(())
}

#[test]
fn constant_time_comparison_agrees_with_plain() -> Result<(), HashError> {
    let mut a = LtHash32::new()?;
    a.add(OBJ1)?;
    let mut b = LtHash32::new()?;
    b.add(OBJ1)?;
    let mut c = LtHash32::new()?;
    c.add(OBJ2)?;

    assert!(a.checksum_equal(&b));
    assert!(a.checksum_equal_constant_time(&b));
    assert!(!a.checksum_equal(&c));
    assert!(!a.checksum_equal_constant_time(&c));

    assert!(a.checksum_equal_bytes(b.checksum()));
    assert!(a.checksum_equal_constant_time_bytes(b.checksum()));
    assert!(!a.checksum_equal_bytes(&[]));
    assert!(!a.checksum_equal_constant_time_bytes(&[]));
    Ok(())
}

#[test]
fn batch_helpers_match_single_operations() -> Result<(), HashError> {
    let items: Vec<&[u8]> = vec![b"alpha", b"beta", b"gamma"];

    let mut batch = LtHash16::new()?;
    batch.add_all(&items)?;

    let mut singles = LtHash16::new()?;
    for item in &items {
        singles.add(item)?;
    }
    assert_eq!(batch, singles);

    batch.remove_all(&items[..2])?;
    let mut remaining = LtHash16::new()?;
    remaining.add(b"gamma")?;
    assert_eq!(batch, remaining);
    Ok(())
}

#[test]
fn keyed_multisets_keep_their_algebra() -> Result<(), HashError> {
    let key = b"an-exemplary-32-byte-secret-key!";

    let mut a = LtHash16::new()?;
    a.set_key(key)?;
    a.add(OBJ1)?.add(OBJ2)?;

    let mut b = LtHash16::new()?;
    b.set_key(key)?;
    b.add(OBJ2)?.add(OBJ1)?;
    assert_eq!(a, b);

    a.remove(OBJ1)?;
    let mut just_obj2 = LtHash16::new()?;
    just_obj2.set_key(key)?;
    just_obj2.add(OBJ2)?;
    assert_eq!(a, just_obj2);
    Ok(())
}
