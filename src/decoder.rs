//! Base64 payload and container decoding.

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::DetectError;

/// Mono waveform decoded from a single request payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Decode a base64 payload into raw container bytes.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, DetectError> {
    Ok(BASE64.decode(payload.trim())?)
}

/// Decode container bytes into a mono clip at the source sample rate.
///
/// The container is sniffed from the bytes themselves. Multi-channel audio is
/// averaged down to one channel. Packets that fail to decode are skipped,
/// but a container that cannot be read to its end is rejected.
pub fn decode_audio(bytes: Vec<u8>) -> Result<AudioClip, DetectError> {
    if bytes.is_empty() {
        return Err(DetectError::Decode("audio payload is empty".into()));
    }

    let mss = MediaSourceStream::new(
        Box::new(Cursor::new(bytes)),
        MediaSourceStreamOptions::default(),
    );

    let probed = symphonia::default::get_probe().format(
        &Hint::new(),
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| DetectError::Decode("no audio track found".into()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut max_frames: usize = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(e) if is_end_of_stream(&e) => break,
            Err(e) => {
                tracing::warn!(error = %e, decoded = samples.len(), "Container is truncated or corrupt");
                return Err(e.into());
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(error = %e, "Skipping corrupt packet");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        if sample_rate.is_none() {
            sample_rate = Some(spec.rate);
        }
        let channels = spec.channels.count().max(1);
        let num_frames = decoded.capacity();

        // Reallocate only when a packet outgrows the current buffer.
        if sample_buf.is_none() || num_frames > max_frames {
            sample_buf = Some(SampleBuffer::<f32>::new(num_frames as u64, spec));
            max_frames = num_frames;
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        samples.extend(
            buf.samples()
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    let sample_rate = sample_rate
        .filter(|rate| *rate > 0)
        .ok_or_else(|| DetectError::Decode("stream does not declare a sample rate".into()))?;

    if samples.is_empty() {
        return Err(DetectError::Decode("audio contains no samples".into()));
    }

    let clip = AudioClip {
        samples,
        sample_rate,
    };
    tracing::debug!(
        samples = clip.samples.len(),
        sample_rate,
        duration_secs = clip.duration_secs(),
        "Decoded audio payload"
    );
    Ok(clip)
}

/// Whether a `next_packet` error marks the normal end of the stream rather
/// than a broken container.
fn is_end_of_stream(err: &SymphoniaError) -> bool {
    match err {
        SymphoniaError::IoError(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
        SymphoniaError::ResetRequired => true,
        _ => false,
    }
}
