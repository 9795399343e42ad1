//! Centralized constants for the front desk
//!
//! Default values and validation bounds shared by settings and the
//! controller. Settings override the defaults; the bounds are fixed.

/// Call timing
pub mod timing {
    /// Pause between a call starting and the opening greeting
    pub const GREETING_DELAY_MS: u64 = 500;

    /// Pause between the end of the farewell line and hang-up
    pub const HANGUP_GRACE_MS: u64 = 2_000;

    /// Upper bound accepted for the greeting delay
    pub const MAX_GREETING_DELAY_MS: u64 = 10_000;

    /// Upper bound accepted for the hang-up grace delay
    pub const MAX_HANGUP_GRACE_MS: u64 = 30_000;

    /// How long agent speech may run without a speech-ended report
    pub const SPEECH_TIMEOUT_MS: u64 = 15_000;

    /// Upper bound accepted for the speech timeout
    pub const MAX_SPEECH_TIMEOUT_MS: u64 = 120_000;
}

/// Speech parameters
pub mod speech {
    pub const LOCALE: &str = "en-IN";
    pub const RATE: f32 = 0.9;
    pub const PITCH: f32 = 1.0;

    /// Exclusive lower bound of the speaking rate
    pub const MIN_RATE: f32 = 0.1;
    pub const MAX_RATE: f32 = 10.0;

    pub const MIN_PITCH: f32 = 0.0;
    pub const MAX_PITCH: f32 = 2.0;
}

/// Session channels
pub mod channels {
    /// Capacity of the session command and event channels
    pub const EVENT_BUFFER: usize = 64;
}

/// Server defaults
pub mod server {
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 8080;
}
