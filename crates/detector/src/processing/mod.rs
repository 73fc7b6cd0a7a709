pub mod post;
pub mod pre;

pub use post::{DetectionResult, PostProcessor};
pub use pre::{PreProcessor, decode_jpeg, to_input_tensor};
