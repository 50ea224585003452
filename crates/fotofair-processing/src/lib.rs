//! Media processing for fotofair: watermarked preview generation and the
//! dual-upload pipeline that turns raw photo bytes into stored preview/full
//! variants.

pub mod image;
pub mod pipeline;

pub use image::watermark::{Watermark, WatermarkAsset, WatermarkError};
pub use pipeline::{MediaPipeline, PipelineError, PreviewPipeline, RawUpload, UploadedMedia};
