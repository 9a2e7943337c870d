//! Decoding of raw device notification payloads.

use crate::window::SampleWindow;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload too short for {layout:?}: need {needed} bytes, got {got}")]
    TooShort {
        layout: PayloadLayout,
        needed: usize,
        got: usize,
    },
}

/// Byte layout of one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadLayout {
    /// Breathing belt: leading 4-byte big-endian unsigned amplitude. Any
    /// trailing bytes (e.g. a second LED channel) are ignored.
    BreathBelt,
    /// Heart-rate measurement: flags byte, bit 0 selects a 16-bit
    /// little-endian value over a single byte.
    HeartRate,
}

impl PayloadLayout {
    pub fn decode(self, payload: &[u8]) -> Result<f64, PayloadError> {
        match self {
            PayloadLayout::BreathBelt => {
                let bytes: [u8; 4] = payload
                    .get(0..4)
                    .and_then(|b| b.try_into().ok())
                    .ok_or_else(|| self.too_short(4, payload.len()))?;
                Ok(u32::from_be_bytes(bytes) as f64)
            }
            PayloadLayout::HeartRate => {
                let flags = *payload.first().ok_or_else(|| self.too_short(2, 0))?;
                if flags & 0x01 != 0 {
                    let bytes: [u8; 2] = payload
                        .get(1..3)
                        .and_then(|b| b.try_into().ok())
                        .ok_or_else(|| self.too_short(3, payload.len()))?;
                    Ok(u16::from_le_bytes(bytes) as f64)
                } else {
                    let hr = *payload
                        .get(1)
                        .ok_or_else(|| self.too_short(2, payload.len()))?;
                    Ok(hr as f64)
                }
            }
        }
    }

    fn too_short(self, needed: usize, got: usize) -> PayloadError {
        PayloadError::TooShort {
            layout: self,
            needed,
            got,
        }
    }
}

/// Min-max scaling against a trailing window of raw values.
#[derive(Debug, Clone)]
pub struct MinMaxNormalizer {
    window: SampleWindow,
}

impl MinMaxNormalizer {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: SampleWindow::new(capacity),
        }
    }

    pub fn with_seconds(fs: f64, seconds: f64) -> Self {
        Self {
            window: SampleWindow::with_seconds(fs, seconds),
        }
    }

    /// Record `raw` and return it scaled into `[0, 1]` by the window's range.
    ///
    /// A degenerate range (`min == max`) yields 0.
    pub fn normalize(&mut self, raw: f64) -> f64 {
        self.window.push(raw);
        match self.window.min_max() {
            Some((lo, hi)) if hi > lo => (raw - lo) / (hi - lo),
            _ => 0.0,
        }
    }
}

/// One device feed: payload decoding plus optional normalization.
#[derive(Debug, Clone)]
pub struct DeviceChannel {
    layout: PayloadLayout,
    normalizer: Option<MinMaxNormalizer>,
}

impl DeviceChannel {
    pub fn new(layout: PayloadLayout, normalizer: Option<MinMaxNormalizer>) -> Self {
        Self { layout, normalizer }
    }

    pub fn layout(&self) -> PayloadLayout {
        self.layout
    }

    /// Decode one notification and return the value to publish.
    pub fn ingest(&mut self, payload: &[u8]) -> Result<f64, PayloadError> {
        let raw = self.layout.decode(payload)?;
        Ok(match self.normalizer.as_mut() {
            Some(norm) => norm.normalize(raw),
            None => raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn belt_reads_big_endian_u32() {
        let payload = [0x00, 0x01, 0x02, 0x03, 0xff, 0xff, 0xff, 0xff];
        assert_eq!(PayloadLayout::BreathBelt.decode(&payload), Ok(66051.0));
    }

    #[test]
    fn belt_rejects_short_payload() {
        let err = PayloadLayout::BreathBelt.decode(&[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            PayloadError::TooShort {
                layout: PayloadLayout::BreathBelt,
                needed: 4,
                got: 3
            }
        );
    }

    #[test]
    fn heart_rate_honours_format_flag() {
        assert_eq!(PayloadLayout::HeartRate.decode(&[0x00, 72]), Ok(72.0));
        assert_eq!(
            PayloadLayout::HeartRate.decode(&[0x01, 0x2c, 0x01]),
            Ok(300.0)
        );
        // other flag bits do not change the value format
        assert_eq!(PayloadLayout::HeartRate.decode(&[0x16, 64, 0x20]), Ok(64.0));
        assert!(PayloadLayout::HeartRate.decode(&[0x01, 0x2c]).is_err());
        assert!(PayloadLayout::HeartRate.decode(&[]).is_err());
    }

    #[test]
    fn constant_input_normalizes_to_zero() {
        let mut norm = MinMaxNormalizer::new(16);
        for _ in 0..40 {
            assert_eq!(norm.normalize(1234.0), 0.0);
        }
    }

    #[test]
    fn normalization_tracks_trailing_range() {
        let mut norm = MinMaxNormalizer::new(3);
        assert_eq!(norm.normalize(10.0), 0.0);
        assert_eq!(norm.normalize(20.0), 1.0);
        assert_eq!(norm.normalize(15.0), 0.5);
        // 10 has left the window; range is now 15..20
        assert_eq!(norm.normalize(15.0), 0.0);
    }

    #[test]
    fn channel_normalizes_belt_values() {
        let mut channel = DeviceChannel::new(
            PayloadLayout::BreathBelt,
            Some(MinMaxNormalizer::with_seconds(12.0, 20.0)),
        );
        assert_eq!(channel.ingest(&100u32.to_be_bytes()), Ok(0.0));
        assert_eq!(channel.ingest(&300u32.to_be_bytes()), Ok(1.0));
        assert_eq!(channel.ingest(&200u32.to_be_bytes()), Ok(0.5));
    }
}
