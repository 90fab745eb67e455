//! Video frame types and processing

use image::{codecs::jpeg::JpegEncoder, imageops, ImageBuffer, Rgb, RgbImage};

use crate::CameraError;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Create a frame from a decoded RGB image
    pub fn from_image(image: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, timestamp_ns, sequence)
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.data
            .get(idx..idx + 3)
            .map(|p| [p[0], p[1], p[2]])
    }

    /// Flip the frame horizontally in place (selfie view)
    pub fn mirror(&mut self) -> Result<(), CameraError> {
        let (width, height) = (self.width, self.height);
        let expected = self.expected_len();
        let actual = self.data.len();
        let mut view = ImageBuffer::<Rgb<u8>, &mut [u8]>::from_raw(width, height, &mut self.data[..])
            .ok_or_else(|| size_mismatch(width, height, expected, actual))?;
        imageops::flip_horizontal_in_place(&mut view);
        Ok(())
    }

    /// Borrow the frame as an `image` buffer.
    ///
    /// Fails when the pixel buffer does not match the frame dimensions.
    pub fn to_image(&self) -> Result<RgbImage, CameraError> {
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            size_mismatch(self.width, self.height, self.expected_len(), self.data.len())
        })
    }

    fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Encode as baseline JPEG
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, CameraError> {
        let image = self.to_image()?;
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
            .encode_image(&image)
            .map_err(|e| CameraError::Encode(e.to_string()))?;
        Ok(jpeg)
    }
}

fn size_mismatch(width: u32, height: u32, expected: usize, actual: usize) -> CameraError {
    CameraError::Format(format!(
        "expected {} RGB bytes for {}x{}, got {}",
        expected, width, height, actual
    ))
}

/// Decode a JPEG/PNG buffer into an RGB frame
pub fn decode_image(bytes: &[u8]) -> Result<VideoFrame, CameraError> {
    let img = image::load_from_memory(bytes).map_err(|e| CameraError::Decode(e.to_string()))?;
    Ok(VideoFrame::from_image(img.to_rgb8(), 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> VideoFrame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 7]);
            }
        }
        VideoFrame::new(data, width, height, 0, 0)
    }

    #[test]
    fn test_get_pixel_bounds() {
        let frame = gradient(4, 3);
        assert_eq!(frame.get_pixel(3, 2), Some([3, 2, 7]));
        assert_eq!(frame.get_pixel(4, 0), None);
        assert_eq!(frame.get_pixel(0, 3), None);
    }

    #[test]
    fn test_mirror_flips_rows() {
        let mut frame = gradient(5, 2);
        frame.mirror().unwrap();
        assert_eq!(frame.get_pixel(0, 0), Some([4, 0, 7]));
        assert_eq!(frame.get_pixel(4, 1), Some([0, 1, 7]));
        assert_eq!(frame.get_pixel(2, 1), Some([2, 1, 7]));
    }

    #[test]
    fn test_jpeg_decodes_back_to_same_size() {
        let frame = gradient(16, 8);
        let jpeg = frame.to_jpeg(80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let decoded = decode_image(&jpeg).unwrap();
        assert_eq!((decoded.width, decoded.height), (16, 8));
    }

    #[test]
    fn test_short_buffer_is_format_error() {
        let frame = VideoFrame::new(vec![0; 5], 4, 4, 0, 0);
        assert!(matches!(frame.to_jpeg(80), Err(CameraError::Format(_))));
    }

    #[test]
    fn test_mirror_rejects_short_buffer() {
        let mut frame = VideoFrame::new(vec![1, 2, 3, 4, 5], 4, 4, 0, 0);
        assert!(matches!(frame.mirror(), Err(CameraError::Format(_))));
        assert_eq!(frame.data, vec![1, 2, 3, 4, 5]);
    }

    proptest::proptest! {
        #[test]
        fn mirror_twice_is_identity(width in 1u32..24, height in 1u32..8) {
            let original = gradient(width, height);
            let mut frame = original.clone();
            frame.mirror().unwrap();
            frame.mirror().unwrap();
            proptest::prop_assert_eq!(frame.data, original.data);
        }
    }
}
