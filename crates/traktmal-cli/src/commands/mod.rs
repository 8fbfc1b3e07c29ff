pub mod progress;
pub mod prompts;
pub mod run;
