use k256::elliptic_curve::group::Curve as _;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use proptest::prelude::*;
use puf_sign::{
    derive_private_key, encode, fixed_challenge, respond, sign, verify, ArbiterPuf, Challenge,
    Curve, NonceMode, PufError,
};

const P256_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xbc, 0xe6, 0xfa, 0xad, 0xa7, 0x17, 0x9e, 0x84, 0xf3, 0xb9, 0xca, 0xc2, 0xfc, 0x63, 0x25, 0x51,
];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn puf_is_deterministic(n in 1usize..96, seed in any::<u64>(), challenge_seed in any::<u64>()) {
        let challenge = fixed_challenge(n, challenge_seed);
        let a = ArbiterPuf::new(n, seed).unwrap();
        let b = ArbiterPuf::new(n, seed).unwrap();
        prop_assert_eq!(a.evaluate_one(&challenge).unwrap(), b.evaluate_one(&challenge).unwrap());
        prop_assert_eq!(respond(&a, &challenge).unwrap(), respond(&b, &challenge).unwrap());
    }

    #[test]
    fn wrong_width_always_fails(n in 1usize..64, delta in 1usize..8, seed in any::<u64>()) {
        let puf = ArbiterPuf::new(n, seed).unwrap();
        let wide = Challenge::from_bits(vec![false; n + delta]);
        let is_length_error = matches!(
            puf.evaluate(&[wide]),
            Err(PufError::InvalidChallengeLength { .. })
        );
        prop_assert!(is_length_error);
    }

    #[test]
    fn encoded_length_is_ceil(responses in proptest::collection::vec(-1i8..=1, 0..300)) {
        let encoded = encode(&responses);
        prop_assert_eq!(encoded.as_bytes().len(), responses.len().div_ceil(8));
        let expected: Vec<bool> = responses.iter().map(|&r| r > 0).collect();
        prop_assert_eq!(encoded.bits(), expected);
    }

    #[test]
    fn respond_length_tracks_stage_count(n in 1usize..80, seed in any::<u64>()) {
        let puf = ArbiterPuf::new(n, seed).unwrap();
        let bytes = respond(&puf, &fixed_challenge(n, 1)).unwrap();
        prop_assert_eq!(bytes.as_bytes().len(), n.div_ceil(8));
    }

    #[test]
    fn derived_key_is_stable_and_in_range(response in proptest::collection::vec(any::<u8>(), 0..64)) {
        let a = derive_private_key(&response, Curve::P256).unwrap();
        let b = derive_private_key(&response, Curve::P256).unwrap();
        prop_assert_eq!(a.private_key_bytes(), b.private_key_bytes());
        prop_assert_eq!(a.public_key(), b.public_key());
        prop_assert!(a.private_key_bytes() < P256_ORDER);
        prop_assert!(a.private_key_bytes() != [0u8; 32]);

        let secret = p256::NonZeroScalar::try_from(&a.private_key_bytes()[..]).unwrap();
        let point = (p256::ProjectivePoint::GENERATOR * *secret).to_affine();
        let expected = point.to_encoded_point(false);
        let actual = a.public_key().to_uncompressed();
        prop_assert_eq!(
            expected.as_bytes(),
            actual.as_slice()
        );

        let k = derive_private_key(&response, Curve::Secp256k1).unwrap();
        let secret = k256::NonZeroScalar::try_from(&k.private_key_bytes()[..]).unwrap();
        let point = (k256::ProjectivePoint::GENERATOR * *secret).to_affine();
        let expected = point.to_encoded_point(false);
        let actual = k.public_key().to_uncompressed();
        prop_assert_eq!(
            expected.as_bytes(),
            actual.as_slice()
        );
    }

    #[test]
    fn signatures_verify(
        response in proptest::collection::vec(any::<u8>(), 1..48),
        message in proptest::collection::vec(any::<u8>(), 1..128),
        deterministic in any::<bool>(),
    ) {
        let nonce = if deterministic { NonceMode::Deterministic } else { NonceMode::Random };
        for curve in [Curve::P256, Curve::Secp256k1] {
            let key = derive_private_key(&response, curve).unwrap();
            let signature = sign(&key, &message, nonce).unwrap();
            prop_assert!(verify(key.public_key(), &message, &signature).unwrap());
        }
    }

    #[test]
    fn distinct_messages_distinct_signatures(
        m1 in proptest::collection::vec(any::<u8>(), 1..64),
        m2 in proptest::collection::vec(any::<u8>(), 1..64),
    ) {
        prop_assume!(m1 != m2);
        let key = derive_private_key(b"distinct", Curve::P256).unwrap();
        let s1 = sign(&key, &m1, NonceMode::Deterministic).unwrap();
        let s2 = sign(&key, &m2, NonceMode::Deterministic).unwrap();
        prop_assert_ne!(s1.to_der(), s2.to_der());
    }
}
