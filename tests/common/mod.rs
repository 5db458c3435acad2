//! Shared synthetic films for integration tests.
//!
//! Films are built with the library's own encoder so every fixture is a
//! well-formed container with known content.

#![allow(dead_code)]

use bytes::Bytes;
use cinefilm_media::film::{
    AudioDescription, ChunkBody, CompressionType, FilmBody, FilmImage, FrameDescription,
    SampleData, SampleRecord, AUDIO_TIME,
};
use std::path::PathBuf;
use tempfile::TempDir;

pub const TIMESCALE: u32 = 1000;

/// About 15980 Hz: 800 bytes of audio last a little over 50 ticks.
pub fn audio_description() -> AudioDescription {
    AudioDescription {
        sclk: 25,
        drift_rate: 0,
        ..AudioDescription::default()
    }
}

pub fn frame() -> FrameDescription {
    FrameDescription {
        compression: CompressionType::Cinepak,
        width: 320,
        height: 224,
    }
}

pub fn audio(tag: u8, size: usize) -> SampleData {
    SampleData {
        record: SampleRecord {
            start: 0,
            size: size as u32,
            time: AUDIO_TIME,
            shadow_sync: false,
            duration: 0,
        },
        payload: Bytes::from(vec![tag; size]),
    }
}

pub fn video(tag: u8, size: usize, time: u32, duration: u32) -> SampleData {
    SampleData {
        record: SampleRecord {
            start: 0,
            size: size as u32,
            time,
            shadow_sync: time == 0,
            duration,
        },
        payload: Bytes::from(vec![tag; size]),
    }
}

pub fn chunky(chunks: Vec<ChunkBody>) -> FilmImage {
    FilmImage {
        frame: frame(),
        audio: audio_description(),
        timescale: TIMESCALE,
        body: FilmBody::Chunky(chunks),
    }
}

pub fn smooth(samples: Vec<SampleData>) -> FilmImage {
    FilmImage {
        frame: frame(),
        audio: audio_description(),
        timescale: TIMESCALE,
        body: FilmBody::Smooth(samples),
    }
}

/// `frames` 50-tick video frames, each with one 800-byte audio sample.
fn frame_pairs(frames: u8) -> (Vec<SampleData>, Vec<SampleData>) {
    let videos = (0..frames)
        .map(|i| video(i, 24 + usize::from(i), u32::from(i) * 50, 50))
        .collect();
    let audios = (0..frames).map(|i| audio(128 + i, 800)).collect();
    (videos, audios)
}

/// Chunky film in correct clock order, four samples per 100-tick chunk.
pub fn interleaved_film(frames: u8) -> FilmImage {
    let (videos, audios) = frame_pairs(frames);
    let mut ordered = Vec::new();
    for (v, a) in videos.into_iter().zip(audios) {
        ordered.push(a);
        ordered.push(v);
    }

    let mut pattern = 0x2020_2020u32;
    let chunks = ordered
        .chunks(4)
        .enumerate()
        .map(|(i, samples)| {
            let chunk = ChunkBody {
                time: i as u32 * 100,
                sync_pattern: pattern,
                samples: samples.to_vec(),
            };
            pattern = cinefilm_media::repair::next_sync_pattern(pattern);
            chunk
        })
        .collect();
    chunky(chunks)
}

/// Chunky film with all video of each chunk placed before its audio.
pub fn misordered_film(frames: u8) -> FilmImage {
    let (videos, audios) = frame_pairs(frames);
    let mut chunks = Vec::new();
    let mut pattern = 0x2020_2020u32;

    for (i, (v, a)) in videos.chunks(3).zip(audios.chunks(3)).enumerate() {
        let mut samples = v.to_vec();
        samples.extend_from_slice(a);
        chunks.push(ChunkBody {
            time: i as u32 * 150,
            sync_pattern: pattern,
            samples,
        });
        pattern = cinefilm_media::repair::next_sync_pattern(pattern);
    }
    chunky(chunks)
}

/// Write `image` into a fresh temp dir.
pub fn write_film(image: &FilmImage, name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, image.encode().unwrap()).unwrap();
    (dir, path)
}
