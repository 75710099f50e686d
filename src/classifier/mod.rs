//! Adapters for the LLM classification service.
//!
//! Two endpoints share one [`ChatModel`]: the noise classifier, which scores
//! batches of links, and the menu classifier, which turns a page's text into
//! at most one [`MenuItem`](crate::results::MenuItem).

pub mod llm;
pub mod menu;
pub mod noise;

pub use llm::{ChatModel, OpenAiChat};
pub use menu::{MenuClassifier, MenuTypes, PageContext};
pub use noise::NoiseClassifier;

pub const DEFAULT_NOISE_PROMPT: &str = include_str!("../../prompts/noise_classifier.txt");
pub const DEFAULT_MENU_PROMPT: &str = include_str!("../../prompts/menu_classifier.txt");
