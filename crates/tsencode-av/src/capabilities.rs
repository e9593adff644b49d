//! Optional encoder/decoder detection and codec selection.
//!
//! ffmpeg builds differ in which optional components they carry. The
//! [`CapabilityProbe`] trait reports each capability as a tri-state
//! [`Availability`]; [`CodecCapabilities::detect`] applies the per-capability
//! default for the `Unknown` case and the rest of the crate only ever sees
//! plain booleans.

use crate::tools::run_capture;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Identifier the ARIB caption decoder shows up as in ffmpeg's build string.
pub const CAPTION_DECODER: &str = "libaribb24";

/// Result of a single capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
    /// The check itself could not be performed.
    Unknown,
}

impl Availability {
    /// Collapse to a boolean, using `default` when the check could not run.
    pub fn resolve(self, default: bool) -> bool {
        match self {
            Availability::Available => true,
            Availability::Unavailable => false,
            Availability::Unknown => default,
        }
    }
}

impl From<bool> for Availability {
    fn from(available: bool) -> Self {
        if available {
            Availability::Available
        } else {
            Availability::Unavailable
        }
    }
}

/// Hardware H.264 encoder backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HardwareEncoder {
    /// Intel Quick Sync Video.
    #[default]
    #[serde(rename = "h264_qsv")]
    Qsv,
    /// VA-API.
    #[serde(rename = "h264_vaapi")]
    Vaapi,
}

impl HardwareEncoder {
    /// Encoder name in `ffmpeg -encoders`.
    pub fn encoder_name(self) -> &'static str {
        match self {
            HardwareEncoder::Qsv => "h264_qsv",
            HardwareEncoder::Vaapi => "h264_vaapi",
        }
    }

    /// Backend name in `ffmpeg -hwaccels`.
    pub fn hwaccel_name(self) -> &'static str {
        match self {
            HardwareEncoder::Qsv => "qsv",
            HardwareEncoder::Vaapi => "vaapi",
        }
    }

    pub fn video_codec(self) -> VideoCodec {
        match self {
            HardwareEncoder::Qsv => VideoCodec::H264Qsv,
            HardwareEncoder::Vaapi => VideoCodec::H264Vaapi,
        }
    }
}

/// Video encoders the assembler knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    /// Software x264, always available.
    Libx264,
    H264Qsv,
    H264Vaapi,
}

impl VideoCodec {
    /// Get the ffmpeg encoder name.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            VideoCodec::Libx264 => "libx264",
            VideoCodec::H264Qsv => "h264_qsv",
            VideoCodec::H264Vaapi => "h264_vaapi",
        }
    }

    pub fn is_hardware(self) -> bool {
        !matches!(self, VideoCodec::Libx264)
    }
}

/// AAC encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    /// Fraunhofer FDK AAC (non-free, optional in ffmpeg builds).
    FdkAac,
    /// ffmpeg's native AAC encoder.
    Aac,
}

impl AudioCodec {
    /// Get the ffmpeg encoder name.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            AudioCodec::FdkAac => "libfdk_aac",
            AudioCodec::Aac => "aac",
        }
    }
}

/// A source of capability information about the transcoder.
pub trait CapabilityProbe {
    /// Whether the ARIB caption decoder is compiled in.
    fn caption_decoder(&self) -> Availability;

    /// Whether the FDK AAC encoder is compiled in.
    fn alternate_aac_encoder(&self) -> Availability;

    /// Whether the hardware encoder is listed and its acceleration backend is reachable.
    fn hardware_video_encoder(&self, encoder: HardwareEncoder) -> Availability;
}

/// Capability probe that parses `ffmpeg` self-description output.
#[derive(Debug, Clone)]
pub struct FfmpegCapabilityProbe {
    ffmpeg_path: PathBuf,
}

impl FfmpegCapabilityProbe {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    fn query(&self, flag: &str) -> Result<String> {
        run_capture(&self.ffmpeg_path, &[flag])
    }
}

impl CapabilityProbe for FfmpegCapabilityProbe {
    fn caption_decoder(&self) -> Availability {
        match self.query("-version") {
            Ok(version) => {
                let available = version_has_caption_decoder(&version);
                if !available {
                    let configuration = version
                        .lines()
                        .find(|line| line.contains("configuration:"))
                        .unwrap_or("");
                    debug!("Build configuration: {}", configuration);
                }
                available.into()
            }
            Err(e) => {
                warn!("Caption decoder check failed: {}", e);
                Availability::Unknown
            }
        }
    }

    fn alternate_aac_encoder(&self) -> Availability {
        match self.query("-encoders") {
            Ok(encoders) => encoders_list_fdk_aac(&encoders).into(),
            Err(e) => {
                warn!("Error checking libfdk_aac availability: {}", e);
                Availability::Unknown
            }
        }
    }

    fn hardware_video_encoder(&self, encoder: HardwareEncoder) -> Availability {
        let encoders = match self.query("-encoders") {
            Ok(encoders) => encoders,
            Err(e) => {
                warn!(
                    "Error checking {} availability: {}",
                    encoder.encoder_name(),
                    e
                );
                return Availability::Unknown;
            }
        };

        if !encoders_list_h264(&encoders, encoder.encoder_name()) {
            return Availability::Unavailable;
        }

        match self.query("-hwaccels") {
            Ok(hwaccels) if hwaccels_list(&hwaccels, encoder.hwaccel_name()) => {
                Availability::Available
            }
            Ok(_) => {
                info!(
                    "{} encoder exists but no {} hardware acceleration available",
                    encoder.encoder_name(),
                    encoder.hwaccel_name()
                );
                Availability::Unavailable
            }
            Err(e) => {
                info!(
                    "Could not check hardware acceleration ({}), assuming {} is available",
                    e,
                    encoder.encoder_name()
                );
                Availability::Available
            }
        }
    }
}

/// Capabilities resolved for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecCapabilities {
    pub caption_decoder: bool,
    pub alternate_aac_encoder: bool,
    pub hardware_video_encoder: bool,
    pub hardware: HardwareEncoder,
}

impl CodecCapabilities {
    /// Run all checks.
    ///
    /// An unknown caption decoder counts as available so subtitles are not
    /// dropped on a flaky check; the encoders count as unavailable.
    pub fn detect(probe: &dyn CapabilityProbe, hardware: HardwareEncoder) -> Self {
        let caps = Self {
            caption_decoder: probe.caption_decoder().resolve(true),
            alternate_aac_encoder: probe.alternate_aac_encoder().resolve(false),
            hardware_video_encoder: probe.hardware_video_encoder(hardware).resolve(false),
            hardware,
        };

        info!(
            "{} available: {}, libfdk_aac available: {}, {} available: {}",
            CAPTION_DECODER,
            caps.caption_decoder,
            caps.alternate_aac_encoder,
            hardware.encoder_name(),
            caps.hardware_video_encoder
        );

        caps
    }

    /// Hardware encoder when usable, otherwise libx264.
    pub fn video_codec(&self) -> VideoCodec {
        if self.hardware_video_encoder {
            self.hardware.video_codec()
        } else {
            VideoCodec::Libx264
        }
    }

    /// libfdk_aac when compiled in, otherwise ffmpeg's native AAC.
    pub fn audio_codec(&self) -> AudioCodec {
        if self.alternate_aac_encoder {
            AudioCodec::FdkAac
        } else {
            AudioCodec::Aac
        }
    }
}

fn version_has_caption_decoder(version: &str) -> bool {
    version.contains(CAPTION_DECODER)
}

fn encoders_list_fdk_aac(encoders: &str) -> bool {
    encoders.contains("libfdk_aac") && encoders.contains("AAC")
}

fn encoders_list_h264(encoders: &str, name: &str) -> bool {
    encoders.contains(name) && encoders.contains("H.264")
}

fn hwaccels_list(hwaccels: &str, backend: &str) -> bool {
    hwaccels.lines().any(|line| line.trim() == backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const VERSION: &str = "ffmpeg version 6.1.1 Copyright (c) 2000-2023 the FFmpeg developers\n\
        built with gcc 13 (Ubuntu 13.2.0-23ubuntu3)\n\
        configuration: --enable-gpl --enable-libaribb24 --enable-libx264\n";

    const ENCODERS: &str = "Encoders:\n V..... = Video\n ------\n\
        V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10 (codec h264)\n\
        V..... h264_qsv             H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10 (Intel Quick Sync Video acceleration) (codec h264)\n\
        A....D aac                  AAC (Advanced Audio Coding)\n\
        A..... libfdk_aac           Fraunhofer FDK AAC (codec aac)\n";

    const HWACCELS: &str = "Hardware acceleration methods:\nvdpau\ncuda\nvaapi\nqsv\n";

    struct FakeProbe {
        caption: Availability,
        aac: Availability,
        hardware: Availability,
    }

    impl CapabilityProbe for FakeProbe {
        fn caption_decoder(&self) -> Availability {
            self.caption
        }
        fn alternate_aac_encoder(&self) -> Availability {
            self.aac
        }
        fn hardware_video_encoder(&self, _encoder: HardwareEncoder) -> Availability {
            self.hardware
        }
    }

    #[test]
    fn test_detects_caption_decoder_in_build_string() {
        assert!(version_has_caption_decoder(VERSION));
        assert!(!version_has_caption_decoder(
            "ffmpeg version 6.1.1\nconfiguration: --enable-gpl\n"
        ));
    }

    #[test]
    fn test_detects_encoders() {
        assert!(encoders_list_fdk_aac(ENCODERS));
        assert!(encoders_list_h264(ENCODERS, "h264_qsv"));
        assert!(!encoders_list_h264(ENCODERS, "h264_vaapi"));
        assert!(!encoders_list_fdk_aac("A....D aac  AAC (Advanced Audio Coding)\n"));
    }

    #[test]
    fn test_hwaccels_match_whole_lines() {
        assert!(hwaccels_list(HWACCELS, "qsv"));
        assert!(hwaccels_list(HWACCELS, "vaapi"));
        assert!(!hwaccels_list("Hardware acceleration methods:\ncuda\n", "qsv"));
    }

    #[test]
    fn test_unknown_defaults_are_asymmetric() {
        let probe = FakeProbe {
            caption: Availability::Unknown,
            aac: Availability::Unknown,
            hardware: Availability::Unknown,
        };
        let caps = CodecCapabilities::detect(&probe, HardwareEncoder::Qsv);
        assert!(caps.caption_decoder);
        assert!(!caps.alternate_aac_encoder);
        assert!(!caps.hardware_video_encoder);
        assert_eq!(caps.video_codec(), VideoCodec::Libx264);
        assert_eq!(caps.audio_codec(), AudioCodec::Aac);
    }

    #[test]
    fn test_prefers_optional_encoders() {
        let probe = FakeProbe {
            caption: Availability::Unavailable,
            aac: Availability::Available,
            hardware: Availability::Available,
        };
        let caps = CodecCapabilities::detect(&probe, HardwareEncoder::Vaapi);
        assert!(!caps.caption_decoder);
        assert_eq!(caps.video_codec(), VideoCodec::H264Vaapi);
        assert_eq!(caps.audio_codec(), AudioCodec::FdkAac);
        assert_eq!(caps.audio_codec().ffmpeg_name(), "libfdk_aac");
    }

    #[test]
    fn test_unreachable_ffmpeg() {
        let probe = FfmpegCapabilityProbe::new(Path::new("nonexistent_ffmpeg_12345"));
        assert_eq!(probe.caption_decoder(), Availability::Unknown);
        assert_eq!(probe.alternate_aac_encoder(), Availability::Unknown);
        assert_eq!(
            probe.hardware_video_encoder(HardwareEncoder::Qsv),
            Availability::Unknown
        );
    }

    /// Write an executable ffmpeg stand-in that answers `-encoders` and `-hwaccels`.
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, hwaccels: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffmpeg");
        let script = format!(
            "#!/bin/sh\ncase \"$1\" in\n  -encoders) printf '%s' '{}' ;;\n  -hwaccels) {} ;;\n  *) exit 1 ;;\nesac\n",
            ENCODERS, hwaccels
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_listed_encoder_without_backend_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(
            dir.path(),
            "printf 'Hardware acceleration methods:\\ncuda\\n'",
        );
        let probe = FfmpegCapabilityProbe::new(ffmpeg);

        assert_eq!(
            probe.hardware_video_encoder(HardwareEncoder::Qsv),
            Availability::Unavailable
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_listed_encoder_with_backend_is_available() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(
            dir.path(),
            "printf 'Hardware acceleration methods:\\nqsv\\n'",
        );
        let probe = FfmpegCapabilityProbe::new(ffmpeg);

        assert_eq!(
            probe.hardware_video_encoder(HardwareEncoder::Qsv),
            Availability::Available
        );
        // h264_vaapi is not in the encoder list at all
        assert_eq!(
            probe.hardware_video_encoder(HardwareEncoder::Vaapi),
            Availability::Unavailable
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_hwaccels_listing_assumes_available() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), "echo 'unrecognized option' >&2; exit 1");
        let probe = FfmpegCapabilityProbe::new(ffmpeg);

        assert_eq!(
            probe.hardware_video_encoder(HardwareEncoder::Qsv),
            Availability::Available
        );
        let caps = CodecCapabilities::detect(&probe, HardwareEncoder::Qsv);
        assert_eq!(caps.video_codec(), VideoCodec::H264Qsv);
        assert!(caps.video_codec().is_hardware());
    }

    #[test]
    fn test_hardware_encoder_names() {
        assert_eq!(HardwareEncoder::Qsv.video_codec().ffmpeg_name(), "h264_qsv");
        assert_eq!(HardwareEncoder::Vaapi.hwaccel_name(), "vaapi");
        assert!(VideoCodec::H264Qsv.is_hardware());
        assert!(!VideoCodec::Libx264.is_hardware());
    }
}
