//! Terminal interaction: prompts, colors and progress bars

pub mod operator;
pub mod progress;
pub mod style;
