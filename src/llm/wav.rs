//! WAV container for raw PCM speech.

/// Layout of little-endian signed PCM samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl Default for PcmFormat {
    /// Gemini TTS output: 24 kHz mono 16-bit.
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            channels: 1,
            bits_per_sample: 16,
        }
    }
}

impl PcmFormat {
    /// Read the rate from a mime type like `audio/L16;codec=pcm;rate=24000`.
    pub fn from_mime(mime: &str) -> Self {
        let sample_rate = mime
            .split(';')
            .filter_map(|param| param.trim().strip_prefix("rate="))
            .find_map(|rate| rate.parse().ok());

        Self {
            sample_rate: sample_rate.unwrap_or(Self::default().sample_rate),
            ..Self::default()
        }
    }

    fn block_align(self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }
}

/// Wrap PCM samples in a 44-byte RIFF/WAVE header.
pub fn from_pcm(pcm: &[u8], format: PcmFormat) -> Vec<u8> {
    let data_len = u32::try_from(pcm.len()).unwrap_or(u32::MAX);
    let block_align = format.block_align();
    let byte_rate = format.sample_rate * u32::from(block_align);

    let mut out = Vec::with_capacity(44 + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&data_len.saturating_add(36).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&format.channels.to_le_bytes());
    out.extend_from_slice(&format.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&format.bits_per_sample.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let wav = from_pcm(&[1, 2, 3, 4], PcmFormat::default());

        assert_eq!(wav.len(), 48);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(wav[4..8].try_into().unwrap()), 40);
        assert_eq!(&wav[8..16], b"WAVEfmt ");
        assert_eq!(u32::from_le_bytes(wav[24..28].try_into().unwrap()), 24_000);
        // byte rate = 24000 * 1 channel * 2 bytes
        assert_eq!(u32::from_le_bytes(wav[28..32].try_into().unwrap()), 48_000);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32::from_le_bytes(wav[40..44].try_into().unwrap()), 4);
        assert_eq!(&wav[44..], [1, 2, 3, 4]);
    }

    #[test]
    fn test_rate_from_mime() {
        assert_eq!(PcmFormat::from_mime("audio/L16;codec=pcm;rate=16000").sample_rate, 16_000);
        assert_eq!(PcmFormat::from_mime("audio/L16").sample_rate, 24_000);
        assert_eq!(PcmFormat::from_mime("audio/L16; rate=bogus").sample_rate, 24_000);
    }
}
