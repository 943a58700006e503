use std::ops::RangeInclusive;

use tracing::info;

use crate::constants::{
    BATCH_SIZE_MAX, BATCH_SIZE_MIN, DEFAULT_BATCH_SIZE, DEFAULT_MAX_TOKENS, DEFAULT_REQUEST_RATE,
    MAX_TOKENS_MAX, MAX_TOKENS_MIN, MAX_TOKENS_STEP, REQUEST_RATE_MAX, REQUEST_RATE_MIN,
};

/// The three slider-backed load parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Param {
    #[default]
    RequestRate,
    BatchSize,
    MaxTokens,
}

impl Param {
    pub const ALL: [Param; 3] = [Param::RequestRate, Param::BatchSize, Param::MaxTokens];

    pub fn label(self) -> &'static str {
        match self {
            Param::RequestRate => "Request Rate",
            Param::BatchSize => "Batch Size",
            Param::MaxTokens => "Max Tokens",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Param::RequestRate => " req/sec",
            Param::BatchSize | Param::MaxTokens => "",
        }
    }

    pub fn range(self) -> RangeInclusive<u32> {
        match self {
            Param::RequestRate => REQUEST_RATE_MIN..=REQUEST_RATE_MAX,
            Param::BatchSize => BATCH_SIZE_MIN..=BATCH_SIZE_MAX,
            Param::MaxTokens => MAX_TOKENS_MIN..=MAX_TOKENS_MAX,
        }
    }

    pub fn step(self) -> u32 {
        match self {
            Param::MaxTokens => MAX_TOKENS_STEP,
            Param::RequestRate | Param::BatchSize => 1,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Param::RequestRate => Param::BatchSize,
            Param::BatchSize => Param::MaxTokens,
            Param::MaxTokens => Param::RequestRate,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Param::RequestRate => Param::MaxTokens,
            Param::BatchSize => Param::RequestRate,
            Param::MaxTokens => Param::BatchSize,
        }
    }

    /// Clamps into range, snapping to the step grid counted from the minimum.
    pub fn clamp(self, value: i64) -> u32 {
        let range = self.range();
        let (min, max) = (i64::from(*range.start()), i64::from(*range.end()));
        let step = i64::from(self.step());
        let clamped = value.clamp(min, max);
        let snapped = min + ((clamped - min + step / 2) / step) * step;
        snapped.min(max) as u32
    }
}

/// Operator-controlled load parameters. Every write goes through a setter
/// that clamps to the documented range; setters report whether the stored
/// value changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    request_rate: u32,
    batch_size: u32,
    max_tokens: u32,
    generating: bool,
}

impl ControlState {
    pub fn new(request_rate: i64, batch_size: i64, max_tokens: i64, generating: bool) -> Self {
        Self {
            request_rate: Param::RequestRate.clamp(request_rate),
            batch_size: Param::BatchSize.clamp(batch_size),
            max_tokens: Param::MaxTokens.clamp(max_tokens),
            generating,
        }
    }

    pub fn request_rate(&self) -> u32 {
        self.request_rate
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn get(&self, param: Param) -> u32 {
        match param {
            Param::RequestRate => self.request_rate,
            Param::BatchSize => self.batch_size,
            Param::MaxTokens => self.max_tokens,
        }
    }

    pub fn set(&mut self, param: Param, value: i64) -> bool {
        let value = param.clamp(value);
        let slot = match param {
            Param::RequestRate => &mut self.request_rate,
            Param::BatchSize => &mut self.batch_size,
            Param::MaxTokens => &mut self.max_tokens,
        };
        if *slot == value {
            return false;
        }
        *slot = value;
        info!(param = param.label(), value, "control changed");
        true
    }

    /// Moves `param` by `steps` increments of its step size.
    pub fn adjust(&mut self, param: Param, steps: i64) -> bool {
        let target = i64::from(self.get(param)) + steps * i64::from(param.step());
        self.set(param, target)
    }

    pub fn set_request_rate(&mut self, value: i64) -> bool {
        self.set(Param::RequestRate, value)
    }

    pub fn set_batch_size(&mut self, value: i64) -> bool {
        self.set(Param::BatchSize, value)
    }

    pub fn set_max_tokens(&mut self, value: i64) -> bool {
        self.set(Param::MaxTokens, value)
    }

    pub fn set_generating(&mut self, generating: bool) -> bool {
        if self.generating == generating {
            return false;
        }
        self.generating = generating;
        info!(generating, "traffic generator toggled");
        true
    }

    pub fn toggle_generating(&mut self) -> bool {
        self.set_generating(!self.generating)
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            request_rate: DEFAULT_REQUEST_RATE,
            batch_size: DEFAULT_BATCH_SIZE,
            max_tokens: DEFAULT_MAX_TOKENS,
            generating: false,
        }
    }
}
