use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quarry_artifact_cache::{
    ArtifactId, ArtifactKey, ArtifactKeyCodec, BinaryCodec, CachedArtifact, CachedArtifactCodec,
    Decoder, DescriptorHash, Encoder,
};
use std::path::PathBuf;

fn sample_key() -> ArtifactKey {
    ArtifactKey::new(
        "central",
        ArtifactId::from_bytes("com.acme:some-library:2.14.1:jar"),
    )
}

fn sample_hit() -> CachedArtifact {
    CachedArtifact::Hit {
        cached_file: PathBuf::from("/home/user/.quarry/cache/modules/com.acme/some-library-2.14.1.jar"),
        cached_at: 1_722_000_000_000,
        descriptor_hash: DescriptorHash::of(b"module descriptor content"),
    }
}

fn sample_miss() -> CachedArtifact {
    CachedArtifact::Miss {
        attempted_locations: vec![
            "https://repo.example.com/com/acme/some-library/2.14.1/some-library-2.14.1.jar"
                .to_string(),
            "https://mirror.example.com/com/acme/some-library/2.14.1/some-library-2.14.1.jar"
                .to_string(),
        ],
        cached_at: 1_722_000_000_000,
        descriptor_hash: DescriptorHash::of(b"module descriptor content"),
    }
}

fn encode_record(record: &CachedArtifact) -> Vec<u8> {
    let mut encoder = Encoder::new();
    CachedArtifactCodec.encode(record, &mut encoder);
    encoder.into_bytes()
}

fn bench_codec(c: &mut Criterion) {
    c.bench_function("encode_key", |b| {
        let key = sample_key();
        b.iter(|| {
            let mut encoder = Encoder::new();
            ArtifactKeyCodec.encode(black_box(&key), &mut encoder);
            encoder.into_bytes()
        })
    });

    c.bench_function("encode_hit_record", |b| {
        let record = sample_hit();
        b.iter(|| encode_record(black_box(&record)))
    });

    c.bench_function("decode_hit_record", |b| {
        let bytes = encode_record(&sample_hit());
        b.iter(|| {
            let mut decoder = Decoder::new(black_box(&bytes));
            CachedArtifactCodec.decode(&mut decoder).unwrap()
        })
    });

    c.bench_function("decode_miss_record", |b| {
        let bytes = encode_record(&sample_miss());
        b.iter(|| {
            let mut decoder = Decoder::new(black_box(&bytes));
            CachedArtifactCodec.decode(&mut decoder).unwrap()
        })
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
