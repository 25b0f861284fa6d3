//! Property-based tests for the cache wire format
//!
//! proptest drives the codecs across arbitrary keys and records to pin
//! down the round-trip guarantee and the strictness of decoding.

use std::path::PathBuf;

use proptest::prelude::*;
use quarry_artifact_cache::{
    ArtifactId, ArtifactKey, ArtifactKeyCodec, BinaryCodec, CachedArtifact, CachedArtifactCodec,
    Decoder, DescriptorHash, Encoder,
};

/// Repository identifiers as the settings layer produces them
fn repository_id_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_-]{0,30}"
}

/// Opaque artifact identifier bytes, including non-UTF-8 payloads
fn artifact_id_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 1..64)
}

/// Digests of the fixed size the upstream hasher emits
fn descriptor_hash_strategy() -> impl Strategy<Value = DescriptorHash> {
    proptest::collection::vec(any::<u8>(), 32..=32).prop_map(DescriptorHash::from_bytes)
}

fn key_strategy() -> impl Strategy<Value = ArtifactKey> {
    (repository_id_strategy(), artifact_id_strategy())
        .prop_map(|(repo, id)| ArtifactKey::new(repo, ArtifactId::from_bytes(id)))
}

fn hit_strategy() -> impl Strategy<Value = CachedArtifact> {
    ("/[a-zA-Z0-9/._-]{1,80}", any::<i64>(), descriptor_hash_strategy()).prop_map(
        |(path, cached_at, descriptor_hash)| CachedArtifact::Hit {
            cached_file: PathBuf::from(path),
            cached_at,
            descriptor_hash,
        },
    )
}

fn miss_strategy() -> impl Strategy<Value = CachedArtifact> {
    (
        proptest::collection::vec("[ -~]{0,60}", 0..8),
        any::<i64>(),
        descriptor_hash_strategy(),
    )
        .prop_map(
            |(attempted_locations, cached_at, descriptor_hash)| CachedArtifact::Miss {
                attempted_locations,
                cached_at,
                descriptor_hash,
            },
        )
}

fn record_strategy() -> impl Strategy<Value = CachedArtifact> {
    prop_oneof![hit_strategy(), miss_strategy()]
}

fn encode_record(record: &CachedArtifact) -> Vec<u8> {
    let mut encoder = Encoder::new();
    CachedArtifactCodec.encode(record, &mut encoder);
    encoder.into_bytes()
}

proptest! {
    #[test]
    fn key_round_trips_for_any_identifier(key in key_strategy()) {
        let mut encoder = Encoder::new();
        ArtifactKeyCodec.encode(&key, &mut encoder);
        let bytes = encoder.into_bytes();

        let mut decoder = Decoder::new(&bytes);
        let decoded = ArtifactKeyCodec.decode(&mut decoder).unwrap();
        decoder.finish().unwrap();

        prop_assert_eq!(decoded, key);
    }

    #[test]
    fn record_round_trips_for_both_variants(record in record_strategy()) {
        let bytes = encode_record(&record);

        let mut decoder = Decoder::new(&bytes);
        let decoded = CachedArtifactCodec.decode(&mut decoder).unwrap();
        decoder.finish().unwrap();

        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn encoding_is_deterministic(record in record_strategy()) {
        prop_assert_eq!(encode_record(&record), encode_record(&record));
    }

    #[test]
    fn any_strict_prefix_of_a_record_fails_to_decode(
        record in record_strategy(),
        cut in any::<prop::sample::Index>(),
    ) {
        let bytes = encode_record(&record);
        let cut = cut.index(bytes.len());
        let prefix = &bytes[..cut];

        // The full encoding consumes the buffer exactly, so every strict
        // prefix must fail either mid-parse or at the trailing check;
        // never panic, never return a value.
        let mut decoder = Decoder::new(prefix);
        let outcome = CachedArtifactCodec
            .decode(&mut decoder)
            .and_then(|_| decoder.finish());
        prop_assert!(outcome.is_err());
    }

    #[test]
    fn varints_round_trip(value in any::<u64>()) {
        let mut encoder = Encoder::new();
        encoder.write_varint(value);
        let bytes = encoder.into_bytes();
        let mut decoder = Decoder::new(&bytes);
        prop_assert_eq!(decoder.read_varint().unwrap(), value);
        decoder.finish().unwrap();
    }

    #[test]
    fn signed_values_round_trip(value in any::<i64>()) {
        let mut encoder = Encoder::new();
        encoder.write_i64(value);
        let bytes = encoder.into_bytes();
        let mut decoder = Decoder::new(&bytes);
        prop_assert_eq!(decoder.read_i64().unwrap(), value);
        decoder.finish().unwrap();
    }
}
