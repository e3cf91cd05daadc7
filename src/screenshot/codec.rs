use std::fs;
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProbeFlowError, Result};

/// base64 编码后不超过 5 MiB 时，原始图片允许的字节数
pub const DEFAULT_BYTE_BUDGET: usize = 5 * 1024 * 1024 * 3 / 4;

/// 压缩参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// 初始分辨率的最大宽度（保持宽高比）
    pub max_width: u32,
    pub initial_quality: u8,
    pub quality_step: u8,
    pub quality_floor: u8,
    /// 缩小尺寸后重新使用的质量
    pub reset_quality: u8,
    /// 每次缩小时宽高乘以的系数
    pub shrink_factor: f32,
    pub max_attempts: u32,
    /// 编码后（base64 之前）允许的最大字节数
    pub byte_budget: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_width: 1920,
            initial_quality: 95,
            quality_step: 10,
            quality_floor: 60,
            reset_quality: 85,
            shrink_factor: 0.8,
            max_attempts: 10,
            byte_budget: DEFAULT_BYTE_BUDGET,
        }
    }
}

/// 单帧编码器
///
/// 抽象出来以便统计编码次数
pub trait FrameEncoder: Send + Sync {
    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>>;
}

/// 默认的 JPEG 编码器
#[derive(Clone, Copy, Debug, Default)]
pub struct JpegFrameEncoder;

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let rgb = image.to_rgb8();
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality).encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )?;
        Ok(buffer)
    }
}

/// 压缩结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedScreenshot {
    pub base64: String,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub attempts: u32,
    /// 编码后（base64 之前）的字节数
    pub bytes: usize,
}

/// 截图压缩服务
///
/// 质量按步长递减到下限后，改为缩小尺寸并重置质量，直到满足体积预算或用尽尝试次数
pub struct ScreenshotCodec {
    config: CodecConfig,
    encoder: Box<dyn FrameEncoder>,
}

impl Default for ScreenshotCodec {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}

impl ScreenshotCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self::with_encoder(config, JpegFrameEncoder)
    }

    pub fn with_encoder(config: CodecConfig, encoder: impl FrameEncoder + 'static) -> Self {
        Self {
            config,
            encoder: Box::new(encoder),
        }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// 从内存中的图片数据（PNG 等）解码后压缩
    pub fn encode_bytes(&self, raw: &[u8]) -> Result<EncodedScreenshot> {
        let image = image::load_from_memory(raw)?;
        self.encode(&image)
    }

    /// 从文件读取图片后压缩
    pub fn encode_file(&self, path: impl AsRef<Path>) -> Result<EncodedScreenshot> {
        let raw = fs::read(path)?;
        self.encode_bytes(&raw)
    }

    pub fn encode(&self, capture: &DynamicImage) -> Result<EncodedScreenshot> {
        let cfg = &self.config;
        let (mut width, mut height) = self.initial_size(capture.dimensions());
        let mut quality = cfg.initial_quality;
        let mut frame = resized(capture, width, height);
        let mut last_size = 0;

        for attempt in 1..=cfg.max_attempts {
            let encoded = self.encoder.encode(&frame, quality)?;
            last_size = encoded.len();
            debug!(attempt, width, height, quality, bytes = last_size, "screenshot encode attempt");

            if last_size <= cfg.byte_budget {
                return Ok(EncodedScreenshot {
                    base64: general_purpose::STANDARD.encode(&encoded),
                    width,
                    height,
                    quality,
                    attempts: attempt,
                    bytes: last_size,
                });
            }

            if quality <= cfg.quality_floor {
                width = scale(width, cfg.shrink_factor);
                height = scale(height, cfg.shrink_factor);
                quality = cfg.reset_quality;
                frame = resized(capture, width, height);
            } else {
                quality = quality.saturating_sub(cfg.quality_step).max(cfg.quality_floor);
            }
        }

        warn!(attempts = cfg.max_attempts, bytes = last_size, budget = cfg.byte_budget, "screenshot exceeds budget");
        Err(ProbeFlowError::ScreenshotTooLarge {
            attempts: cfg.max_attempts,
            bytes: last_size,
        })
    }

    fn initial_size(&self, (width, height): (u32, u32)) -> (u32, u32) {
        if width <= self.config.max_width || width == 0 {
            return (width, height);
        }
        let ratio = self.config.max_width as f64 / width as f64;
        let scaled = ((height as f64 * ratio).round() as u32).max(1);
        (self.config.max_width, scaled)
    }
}

fn scale(dimension: u32, factor: f32) -> u32 {
    ((dimension as f32 * factor).round() as u32).max(1)
}

fn resized(capture: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    if capture.dimensions() == (width, height) {
        capture.clone()
    } else {
        capture.resize_exact(width, height, FilterType::Triangle)
    }
}
