use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("sample size must be > 0")]
    InvalidSampleSize,

    #[error("pass threshold must be between 0 and 100, got {0}")]
    InvalidPassThreshold(u32),
}

/// Per-deployment quiz configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    sample_size: u32,
    pass_threshold_percent: u32,
}

impl QuizSettings {
    pub const DEFAULT_SAMPLE_SIZE: u32 = 15;
    pub const DEFAULT_PASS_THRESHOLD: u32 = 60;

    /// # Errors
    ///
    /// Returns `SettingsError` for a zero sample size or a threshold above 100.
    pub fn new(sample_size: u32, pass_threshold_percent: u32) -> Result<Self, SettingsError> {
        if sample_size == 0 {
            return Err(SettingsError::InvalidSampleSize);
        }
        if pass_threshold_percent > 100 {
            return Err(SettingsError::InvalidPassThreshold(pass_threshold_percent));
        }
        Ok(Self {
            sample_size,
            pass_threshold_percent,
        })
    }

    #[must_use]
    pub fn sample_size(&self) -> u32 {
        self.sample_size
    }

    #[must_use]
    pub fn pass_threshold_percent(&self) -> u32 {
        self.pass_threshold_percent
    }

    #[must_use]
    pub fn passes(&self, percentage: u32) -> bool {
        percentage >= self.pass_threshold_percent
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            sample_size: Self::DEFAULT_SAMPLE_SIZE,
            pass_threshold_percent: Self::DEFAULT_PASS_THRESHOLD,
        }
    }
}
