pub mod codec;

pub use codec::{
    CodecConfig, EncodedScreenshot, FrameEncoder, JpegFrameEncoder, ScreenshotCodec,
    DEFAULT_BYTE_BUDGET,
};
