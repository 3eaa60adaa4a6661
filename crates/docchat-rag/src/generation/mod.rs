//! Answer generation: grounded prompts and source excerpts

pub mod excerpt;
pub mod prompt;
pub mod synthesizer;

pub use excerpt::ExcerptSelector;
pub use prompt::PromptBuilder;
pub use synthesizer::AnswerSynthesizer;
