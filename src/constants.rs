pub const TICK_RATE_MS: u64 = 1000;
pub const MAX_SAMPLES: usize = 20; // sliding window per series

pub const REQUEST_RATE_MIN: u32 = 1;
pub const REQUEST_RATE_MAX: u32 = 50;
pub const BATCH_SIZE_MIN: u32 = 1;
pub const BATCH_SIZE_MAX: u32 = 32;
pub const MAX_TOKENS_MIN: u32 = 10;
pub const MAX_TOKENS_MAX: u32 = 500;
pub const MAX_TOKENS_STEP: u32 = 10;

pub const DEFAULT_REQUEST_RATE: u32 = 10;
pub const DEFAULT_BATCH_SIZE: u32 = 4;
pub const DEFAULT_MAX_TOKENS: u32 = 100;

pub const TIME_LABEL_FORMAT: &str = "%H:%M:%S";
