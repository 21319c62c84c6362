pub mod gemini;
pub mod prompt;

pub use gemini::{parse_response, response_schema, GeminiAdvisor};
pub use prompt::build_prompt;
