//! V4L2 webcam backend

use ouroboros::self_referencing;
use tracing::{info, warn};

use crate::{CameraConfig, CameraError, FrameSourceStats, VideoFrame};

#[self_referencing]
struct StreamState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

/// Pixel layouts we know how to turn into RGB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireFormat {
    Rgb3,
    Yuyv,
    Mjpeg,
}

impl WireFormat {
    fn from_fourcc(fourcc: v4l::FourCC) -> Option<Self> {
        match &fourcc.repr {
            b"RGB3" => Some(Self::Rgb3),
            b"YUYV" => Some(Self::Yuyv),
            b"MJPG" => Some(Self::Mjpeg),
            _ => None,
        }
    }
}

pub(crate) struct V4l2Camera {
    config: CameraConfig,
    state: StreamState,
    format: WireFormat,
    width: u32,
    height: u32,
    sequence: u32,
}

impl V4l2Camera {
    pub(crate) fn open(config: CameraConfig) -> Result<Self, CameraError> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&config.device)
            .map_err(|e| CameraError::Open(format!("{}: {}", config.device, e)))?;
        let mut format = device
            .format()
            .map_err(|e| CameraError::Format(e.to_string()))?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                warn!("Camera {}: failed to set format: {}", config.device, err);
                device
                    .format()
                    .map_err(|e| CameraError::Format(e.to_string()))?
            }
        };

        let wire = WireFormat::from_fourcc(format.fourcc).ok_or_else(|| {
            CameraError::Format(format!("unsupported pixel format {}", format.fourcc))
        })?;

        if config.fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.fps);
            if let Err(err) = device.set_params(&params) {
                warn!("Camera {}: failed to set fps: {}", config.device, err);
            }
        }

        let state = StreamStateTryBuilder {
            device,
            stream_builder: |device: &mut v4l::Device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|e| CameraError::Stream(e.to_string()))
            },
        }
        .try_build()?;

        info!(
            "Camera {}: streaming {}x{} {:?}",
            config.device, format.width, format.height, wire
        );

        Ok(Self {
            config,
            state,
            format: wire,
            width: format.width,
            height: format.height,
            sequence: 0,
        })
    }

    pub(crate) fn next_frame(&mut self) -> Result<VideoFrame, CameraError> {
        use v4l::io::traits::CaptureStream;

        let (format, width, height) = (self.format, self.width, self.height);
        let (data, timestamp_ns) = self.state.with_stream_mut(|stream| {
            let (buf, meta) = stream
                .next()
                .map_err(|e| CameraError::Stream(e.to_string()))?;
            let timestamp_ns =
                meta.timestamp.sec as u64 * 1_000_000_000 + meta.timestamp.usec as u64 * 1_000;
            let payload = &buf[..(meta.bytesused as usize).min(buf.len())];
            let rgb = match format {
                WireFormat::Rgb3 => payload.to_vec(),
                WireFormat::Yuyv => yuyv_to_rgb(payload),
                WireFormat::Mjpeg => crate::frame::decode_image(payload)?.data,
            };
            Ok::<_, CameraError>((rgb, timestamp_ns))
        })?;

        let expected = (width * height * 3) as usize;
        if data.len() != expected {
            return Err(CameraError::Format(format!(
                "captured {} bytes, expected {}",
                data.len(),
                expected
            )));
        }

        let frame = VideoFrame::new(data, width, height, timestamp_ns, self.sequence);
        self.sequence = self.sequence.wrapping_add(1);
        Ok(frame)
    }

    pub(crate) fn stats(&self) -> FrameSourceStats {
        FrameSourceStats {
            frames_captured: self.sequence as u64,
            source: self.config.device.clone(),
        }
    }
}

/// BT.601 YUYV 4:2:2 to packed RGB
fn yuyv_to_rgb(yuyv: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(yuyv.len() / 2 * 3);
    for px in yuyv.chunks_exact(4) {
        let (y0, u, y1, v) = (px[0] as f32, px[1] as f32 - 128.0, px[2] as f32, px[3] as f32 - 128.0);
        for y in [y0, y1] {
            rgb.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
            rgb.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
            rgb.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
        }
    }
    rgb
}
