pub mod settings;

pub use settings::{Settings, DEFAULT_DIFFICULTY, DEFAULT_FEE_RATE, DEFAULT_PORT};
