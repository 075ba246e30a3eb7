//! Prompts sent with every page image.
//!
//! The system message fixes the model's persona; the user message carries the
//! extraction instruction and the image. Both can be replaced through
//! [`crate::config::ConversionConfig::system_prompt`] and
//! [`crate::config::ConversionConfig::user_prompt`]; the constants here are
//! used only when no override is provided.

/// Default system message: an accurate, non-fabricating reader.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are responsible for reading through books, essays, and articles \
and extracting necessary information from their images. \
You are accurate in your extraction, you **FOLLOW** instructions and you **DO NOT** hallucinate.";

/// Default user message attached to each page image.
pub const DEFAULT_USER_PROMPT: &str = "You will read the images and extract the text from them. \
You will have to structure it using markdown. \
Feel free to create tables whenever necessary. \
The output must be ONLY the extracted text in a markdown format. NOTHING ELSE, \
only the text from the images in a structured format.";
