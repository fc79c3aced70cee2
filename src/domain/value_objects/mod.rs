mod code;

pub use code::{Code, MAX_CODE_LENGTH};
