//! Integration tests across decode, traversal, validation and repair.

mod common;

use assert_matches::assert_matches;
use bytes::Bytes;
use cinefilm_media::film::{Film, FilmBody, FilmImage, SampleKind, SampleLayout};
use cinefilm_media::traversal::SampleCursor;
use cinefilm_media::{
    repair_film, validate_interleave, Diagnostics, Error, FilmEvent, NullSink, SeekSource,
};
use common::{audio, chunky, interleaved_film, misordered_film, smooth, video, write_film};
use std::io::Cursor;

fn decode(data: &Bytes) -> Film {
    Film::decode(data, &NullSink).unwrap()
}

#[test]
fn test_interleaved_film_validates_clean() {
    let data = interleaved_film(12).encode().unwrap();
    let film = decode(&data);

    let diagnostics = Diagnostics::new();
    let report = validate_interleave(&film, &data, &diagnostics).unwrap();

    assert!(report.is_synchronized());
    assert!(diagnostics.is_empty());
    assert_eq!(report.samples, 24);
    assert_eq!(report.audio_samples, 12);
    assert_eq!(report.video_time, 600);
}

#[test]
fn test_misordered_film_reports_every_desync() {
    let data = misordered_film(9).encode().unwrap();
    let film = decode(&data);

    let diagnostics = Diagnostics::new();
    let report = validate_interleave(&film, &data, &diagnostics).unwrap();

    assert!(!report.is_synchronized());
    // Validation runs to the end regardless of mismatches.
    assert_eq!(report.samples, 18);

    let first = &report.desyncs[0];
    assert_eq!(first.index, 0);
    assert_eq!(first.expected, SampleKind::Audio);
    assert_eq!(first.actual, SampleKind::Video);
    assert_eq!(first.position.chunk, Some(0));

    let reported = diagnostics
        .events()
        .into_iter()
        .filter(|e| matches!(e, FilmEvent::Desync(_)))
        .count();
    assert_eq!(reported, report.desyncs.len());
}

#[test]
fn test_repair_fixes_misordered_film() {
    let data = misordered_film(9).encode().unwrap();
    let film = decode(&data);
    let before = validate_interleave(&film, &data, &NullSink).unwrap();

    let outcome = repair_film(&film, &data, &NullSink).unwrap();
    assert_eq!(outcome.plan.target_duration, 150);

    let repaired_data = outcome.image.encode().unwrap();
    let repaired = decode(&repaired_data);
    assert_eq!(
        repaired.layout,
        SampleLayout::Chunky(outcome.plan.table.clone())
    );

    let after = validate_interleave(&repaired, &repaired_data, &NullSink).unwrap();
    assert!(after.is_synchronized(), "desyncs: {:?}", after.desyncs);
    assert_eq!(after.samples, before.samples);
    assert_eq!(after.video_time, before.video_time);
}

#[test]
fn test_repair_keeps_every_payload() {
    let data = misordered_film(9).encode().unwrap();
    let film = decode(&data);

    let mut original: Vec<Bytes> = SampleCursor::new(&film, &data, &NullSink)
        .with_payload(true)
        .map(|s| s.unwrap().payload.unwrap())
        .collect();

    let repaired_data = repair_film(&film, &data, &NullSink).unwrap().image.encode().unwrap();
    let repaired = decode(&repaired_data);
    let mut rebuilt: Vec<Bytes> = SampleCursor::new(&repaired, &repaired_data, &NullSink)
        .with_payload(true)
        .map(|s| s.unwrap().payload.unwrap())
        .collect();

    original.sort();
    rebuilt.sort();
    assert_eq!(original, rebuilt);
}

#[test]
fn test_repair_of_interleaved_film_is_identity() {
    let data = interleaved_film(10).encode().unwrap();
    let film = decode(&data);

    let repaired = repair_film(&film, &data, &NullSink).unwrap().image.encode().unwrap();
    assert_eq!(repaired, data);
}

#[test]
fn test_repair_needs_two_chunks() {
    let data = chunky(vec![cinefilm_media::film::ChunkBody {
        time: 0,
        sync_pattern: 0x2020_2020,
        samples: vec![audio(1, 800), video(2, 30, 0, 50)],
    }])
    .encode()
    .unwrap();
    let film = decode(&data);

    assert_matches!(
        repair_film(&film, &data, &NullSink),
        Err(Error::InsufficientChunks { count: 1 })
    );
}

#[test]
fn test_repair_rejects_smooth_film() {
    let data = smooth(vec![audio(1, 800), video(2, 30, 0, 50)]).encode().unwrap();
    let film = decode(&data);
    assert!(!film.is_chunky());

    assert_matches!(repair_film(&film, &data, &NullSink), Err(Error::NotChunky));
}

#[test]
fn test_film_image_round_trip() {
    let data = misordered_film(6).encode().unwrap();
    let film = decode(&data);

    let image = FilmImage::read(&film, &data, &NullSink).unwrap();
    assert_eq!(image.encode().unwrap(), data);
    assert_matches!(image.body, FilmBody::Chunky(ref chunks) if chunks.len() == 2);
}

#[test]
fn test_decode_from_disk_matches_memory() {
    let image = misordered_film(6);
    let (_dir, path) = write_film(&image, "movie.film");

    let file_source = SeekSource::open(&path).unwrap();
    let from_disk = Film::decode(&file_source, &NullSink).unwrap();
    let in_memory = decode(&image.encode().unwrap());
    assert_eq!(from_disk, in_memory);

    let from_disk = validate_interleave(&from_disk, &file_source, &NullSink).unwrap();
    let in_memory = validate_interleave(&in_memory, &image.encode().unwrap(), &NullSink).unwrap();
    assert_eq!(from_disk, in_memory);
}

#[test]
fn test_truncated_film_fails_with_io_error() {
    let data = misordered_film(6).encode().unwrap();
    let film = decode(&data);
    // Cut inside the second chunk's sync preamble.
    let second = film.chunk_table().unwrap().records[1];
    let cut = film.data_offset() as usize + second.start as usize + 40;
    let truncated = Cursor::new(data[..cut].to_vec());
    let source = SeekSource::new(truncated);

    let err = validate_interleave(&film, &source, &NullSink).unwrap_err();
    assert_matches!(err, Error::Io(_));
}

#[test]
fn test_wrong_magic_is_structural() {
    let mut data = interleaved_film(4).encode().unwrap().to_vec();
    data[0..4].copy_from_slice(b"RIFF");

    let err = Film::decode(&data, &NullSink).unwrap_err();
    assert!(err.is_structural());
    assert_matches!(err, Error::UnexpectedTag { offset: 0, .. });
}

#[test]
fn test_two_chunk_film_in_order_has_no_desyncs() {
    let data = chunky(vec![
        cinefilm_media::film::ChunkBody {
            time: 0,
            sync_pattern: 0x2020_2020,
            samples: vec![audio(1, 800), video(2, 30, 0, 50)],
        },
        cinefilm_media::film::ChunkBody {
            time: 50,
            sync_pattern: 0x2121_2121,
            samples: vec![audio(3, 800), video(4, 30, 50, 50)],
        },
    ])
    .encode()
    .unwrap();
    let film = decode(&data);

    let report = validate_interleave(&film, &data, &NullSink).unwrap();
    assert!(report.is_synchronized());
    assert_eq!(report.samples, 4);
}

#[test]
fn test_video_where_audio_due_is_one_desync() {
    let data = chunky(vec![
        cinefilm_media::film::ChunkBody {
            time: 0,
            sync_pattern: 0x2020_2020,
            samples: vec![audio(1, 800), video(2, 30, 0, 50)],
        },
        cinefilm_media::film::ChunkBody {
            time: 50,
            sync_pattern: 0x2121_2121,
            samples: vec![video(4, 30, 50, 50), audio(3, 800)],
        },
    ])
    .encode()
    .unwrap();
    let film = decode(&data);

    let report = validate_interleave(&film, &data, &NullSink).unwrap();
    assert_eq!(report.desyncs.len(), 1);
    let desync = &report.desyncs[0];
    assert_eq!(desync.index, 2);
    assert_eq!(desync.position.chunk, Some(1));
    assert_eq!(desync.position.sample, 0);
    assert_eq!(desync.expected, SampleKind::Audio);
    assert_eq!(desync.video_time, 50);
}

#[test]
fn test_missing_audio_description_uses_platform_rate() {
    let encoded = interleaved_film(4).encode().unwrap();
    // Drop the 20-byte ADSC atom that follows FILM (16) and FDSC (20).
    let mut data = encoded[..36].to_vec();
    data.extend_from_slice(&encoded[56..]);
    let declared = u32::from_be_bytes([data[4], data[5], data[6], data[7]]) - 20;
    data[4..8].copy_from_slice(&declared.to_be_bytes());

    let film = Film::decode(&data, &NullSink).unwrap();
    assert!(!film.has_audio_description);
    assert_eq!(film.audio.channels, 1);
    assert_eq!(film.audio.bit_depth, 8);
    assert_eq!(film.audio.sclk, 0x18);
    assert_eq!(film.audio.drift_rate, 0x0481_db08);

    let nominal = 26_590_906.0 / (2.0 * 25.0 * 32.0);
    let expected = nominal + nominal * (f64::from(0x0481_db08u32) / 4_294_967_296.0);
    assert!((film.audio.sample_rate() - expected).abs() < 1e-6);

    // Chunks still resolve against the shorter header.
    let report = validate_interleave(&film, &data, &NullSink).unwrap();
    assert_eq!(report.samples, 8);
}
