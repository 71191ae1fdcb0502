//! Caption tag processing: cleaning, category labelling and run-wide
//! frequency counting.

mod classify;
mod frequency;
mod normalize;

pub use classify::{CategoryClassifier, NO_CATEGORY};
pub use frequency::TagFrequency;
pub use normalize::{CaptionNormalizer, NormalizedCaption};
