/// Built-in speech backends.
pub mod whisper;
