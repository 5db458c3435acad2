//! Serializable film summaries for `info` output.

use cinefilm_media::film::{Film, SampleLayout};
use cinefilm_media::{FilmEvent, InterleaveReport};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FilmSummary {
    pub frame: FrameSummary,
    pub audio: AudioSummary,
    pub layout: LayoutSummary,
    pub interleave: InterleaveSummary,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameSummary {
    /// Four-character compression tag
    pub compression: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AudioSummary {
    /// Whether the file carries its own audio description
    pub described: bool,
    pub channels: u8,
    pub bit_depth: u8,
    pub signed: bool,
    pub format: String,
    pub sclk: u32,
    pub drift_rate: u32,
    pub sample_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutSummary {
    /// `smooth` or `chunky`
    pub kind: &'static str,
    pub timescale: u32,
    /// Sample records (smooth) or chunk records (chunky)
    pub entries: usize,
    pub table_size: u32,
    pub data_offset: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterleaveSummary {
    pub samples: u64,
    pub audio_samples: u64,
    pub video_samples: u64,
    pub video_time: u64,
    /// Video duration in seconds
    pub duration_secs: f64,
    pub desyncs: usize,
}

impl FilmSummary {
    pub fn new(film: &Film, report: &InterleaveReport, events: &[FilmEvent]) -> Self {
        let compression = film.frame.compression;
        let audio = &film.audio;

        let (kind, entries) = match &film.layout {
            SampleLayout::Smooth(table) => ("smooth", table.len()),
            SampleLayout::Chunky(table) => ("chunky", table.len()),
        };

        let timescale = film.timescale();
        let duration_secs = if timescale == 0 {
            0.0
        } else {
            report.video_time as f64 / f64::from(timescale)
        };

        Self {
            frame: FrameSummary {
                compression: String::from_utf8_lossy(&compression.tag()).into_owned(),
                description: compression.description().to_string(),
                width: film.frame.width,
                height: film.frame.height,
            },
            audio: AudioSummary {
                described: film.has_audio_description,
                channels: audio.channels,
                bit_depth: audio.bit_depth,
                signed: audio.signed,
                format: audio.format_summary(),
                sclk: audio.sclk,
                drift_rate: audio.drift_rate,
                sample_rate: audio.sample_rate(),
            },
            layout: LayoutSummary {
                kind,
                timescale,
                entries,
                table_size: film.layout.table_size(),
                data_offset: film.data_offset(),
            },
            interleave: InterleaveSummary {
                samples: report.samples,
                audio_samples: report.audio_samples,
                video_samples: report.video_samples,
                video_time: report.video_time,
                duration_secs,
                desyncs: report.desyncs.len(),
            },
            warnings: events
                .iter()
                .filter(|e| !matches!(e, FilmEvent::Desync(_)))
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Print the summary as plain text.
    pub fn print(&self) {
        println!(
            "Video: {} ({}) {}x{}",
            self.frame.compression, self.frame.description, self.frame.width, self.frame.height
        );
        print!(
            "Audio: {}, {:.3} Hz",
            self.audio.format, self.audio.sample_rate
        );
        if !self.audio.described {
            print!(" [default description]");
        }
        println!();
        println!(
            "Layout: {} ({} entries, timescale {})",
            self.layout.kind, self.layout.entries, self.layout.timescale
        );
        println!("Data offset: {}", self.layout.data_offset);
        println!(
            "Samples: {} ({} audio, {} video)",
            self.interleave.samples, self.interleave.audio_samples, self.interleave.video_samples
        );
        println!("Duration: {:.3}s", self.interleave.duration_secs);
        println!("Interleave desyncs: {}", self.interleave.desyncs);

        if !self.warnings.is_empty() {
            println!("\nWarnings: {}", self.warnings.len());
            for warning in &self.warnings {
                println!("  - {}", warning);
            }
        }
    }
}
