//! Boot animation script
//!
//! A fixed list of lines shown one at a time, each followed by its own
//! pause before the next one appears.

use std::time::Duration;

/// One line of the boot animation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootLine {
    pub text: String,
    /// Pause after this line is shown
    pub delay: Duration,
}

impl BootLine {
    pub fn new(text: impl Into<String>, delay_ms: u64) -> Self {
        Self {
            text: text.into(),
            delay: Duration::from_millis(delay_ms),
        }
    }
}

const BIOS_SEQUENCE: &[(&str, u64)] = &[
    ("SpySpeakBIOS 4.0 Release 6.0", 450),
    ("Copyright 2005-2018 SpySpeak Technologies Ltd.", 100),
    ("", 450),
    ("BIOS version 29.02", 100),
    ("Gateway Solo 9550", 120),
    ("System Id = 513", 110),
    ("Build Time; 09/10/2017", 200),
    ("", 550),
    ("639 KB System RAM Passed", 70),
    ("254 KB Extended RAM Passed", 100),
    ("512 K Cache Passed", 90),
    ("System BIOS Shadowed", 0),
    ("", 50),
    ("Connecting to host...", 850),
    ("Done connecting", 500),
];

/// The standard BIOS-style sequence
pub fn default_script() -> Vec<BootLine> {
    BIOS_SEQUENCE
        .iter()
        .map(|(text, delay_ms)| BootLine::new(*text, *delay_ms))
        .collect()
}
