//! Roboflow hosted inference client

use std::time::Duration;

use camera_capture::frame::VideoFrame;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{BoundingBox, DetectedObject, DetectionConfig, DetectionError, ObjectDetector};

/// One prediction as returned by the service (centre-based box)
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    #[serde(rename = "class")]
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub confidence: f32,
}

impl Prediction {
    /// Convert the centre/size box to truncated integer corners
    pub fn to_object(&self) -> DetectedObject {
        let (half_w, half_h) = (self.width / 2.0, self.height / 2.0);
        DetectedObject {
            label: self.label.clone(),
            bbox: BoundingBox {
                x1: (self.x - half_w) as i32,
                y1: (self.y - half_h) as i32,
                x2: (self.x + half_w) as i32,
                y2: (self.y + half_h) as i32,
            },
            confidence: self.confidence,
        }
    }
}

/// Detection response body
#[derive(Debug, Clone, Deserialize)]
pub struct RoboflowResponse {
    pub predictions: Vec<Prediction>,
}

impl RoboflowResponse {
    pub fn parse(body: &str) -> Result<Self, DetectionError> {
        serde_json::from_str(body).map_err(|e| DetectionError::Decode(e.to_string()))
    }

    pub fn into_objects(self) -> Vec<DetectedObject> {
        self.predictions.iter().map(Prediction::to_object).collect()
    }
}

/// Client for `POST {api_url}/{model_id}`
pub struct RoboflowClient {
    http: reqwest::Client,
    config: DetectionConfig,
    api_key: String,
}

impl RoboflowClient {
    pub fn new(config: DetectionConfig) -> Result<Self, DetectionError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(DetectionError::MissingApiKey)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        info!("Object detection via {} model {}", config.api_url, config.model_id);
        Ok(Self { http, config, api_key })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.model_id.trim_start_matches('/')
        )
    }

    /// Upload an encoded JPEG and return the detected objects
    pub async fn infer_jpeg(&self, jpeg: Vec<u8>) -> Result<Vec<DetectedObject>, DetectionError> {
        let part = Part::bytes(jpeg).file_name("frame.jpg").mime_str("image/jpeg")?;
        let form = Form::new().part("file", part);

        let mut query = vec![("api_key", self.api_key.clone())];
        if let Some(confidence) = self.config.confidence {
            // service expects a percentage
            query.push(("confidence", format!("{}", (confidence * 100.0).round() as u32)));
        }

        let response = self
            .http
            .post(self.endpoint())
            .query(&query)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DetectionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let objects = RoboflowResponse::parse(&body)?.into_objects();
        debug!("Detected {} objects", objects.len());
        Ok(objects)
    }
}

impl ObjectDetector for RoboflowClient {
    async fn detect(&self, frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectionError> {
        let jpeg = frame
            .to_jpeg(self.config.jpeg_quality)
            .map_err(|e| DetectionError::Encode(e.to_string()))?;
        self.infer_jpeg(jpeg).await
    }
}
