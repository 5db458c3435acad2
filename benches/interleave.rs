//! Benchmarks for interleave validation and chunk repair
//!
//! Uses synthetic chunky films with every chunk's video placed before its
//! audio, so validation reports desyncs and repair does real work.

use bytes::Bytes;
use cinefilm_media::film::{
    AudioDescription, ChunkBody, CompressionType, FilmBody, FilmImage, FrameDescription,
    SampleData, SampleRecord, AUDIO_TIME,
};
use cinefilm_media::{repair_film, validate_interleave, Film, NullSink};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// `frames` 50-tick frames at timescale 1000, three frames per chunk.
fn misordered_film(frames: u32) -> Bytes {
    let frame = |i: u32| SampleData {
        record: SampleRecord {
            start: 0,
            size: 2048,
            time: i * 50,
            shadow_sync: i % 12 == 0,
            duration: 50,
        },
        payload: Bytes::from(vec![(i % 251) as u8; 2048]),
    };
    let sound = |i: u32| SampleData {
        record: SampleRecord {
            start: 0,
            size: 800,
            time: AUDIO_TIME,
            shadow_sync: false,
            duration: 0,
        },
        payload: Bytes::from(vec![(i % 241) as u8; 800]),
    };

    let mut pattern = 0x2020_2020u32;
    let chunks = (0..frames)
        .step_by(3)
        .map(|first| {
            let last = (first + 3).min(frames);
            let mut samples: Vec<SampleData> = (first..last).map(frame).collect();
            samples.extend((first..last).map(sound));
            let chunk = ChunkBody {
                time: first * 50,
                sync_pattern: pattern,
                samples,
            };
            pattern = cinefilm_media::repair::next_sync_pattern(pattern);
            chunk
        })
        .collect();

    FilmImage {
        frame: FrameDescription {
            compression: CompressionType::Cinepak,
            width: 320,
            height: 224,
        },
        audio: AudioDescription {
            sclk: 25,
            drift_rate: 0,
            ..AudioDescription::default()
        },
        timescale: 1000,
        body: FilmBody::Chunky(chunks),
    }
    .encode()
    .unwrap()
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_interleave");

    for frames in [300u32, 3000] {
        let data = misordered_film(frames);
        let film = Film::decode(&data, &NullSink).unwrap();

        group.throughput(Throughput::Elements(u64::from(frames) * 2));
        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, _| {
            b.iter(|| black_box(validate_interleave(&film, &data, &NullSink).unwrap()));
        });
    }

    group.finish();
}

fn bench_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("repair_film");

    for frames in [300u32, 3000] {
        let data = misordered_film(frames);
        let film = Film::decode(&data, &NullSink).unwrap();

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("plan", frames), &frames, |b, _| {
            b.iter(|| {
                let repairer = cinefilm_media::ChunkRepairer::new(&film, &data);
                black_box(repairer.plan().unwrap())
            });
        });
        group.bench_with_input(BenchmarkId::new("repair_encode", frames), &frames, |b, _| {
            b.iter(|| {
                let outcome = repair_film(&film, &data, &NullSink).unwrap();
                black_box(outcome.image.encode().unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_validate, bench_repair);
criterion_main!(benches);
