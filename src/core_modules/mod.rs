pub mod annotation;
pub mod circularity;
pub mod color_extractor;
pub mod labels;
pub mod pixel;
pub mod pixel_buffer;
pub mod region;
pub mod shape_classifier;
pub mod utils;
