//! Timed caption generation from free text.
//!
//! Text is split on whitespace and grouped into cues of `words_per_cue`
//! words. Every cue is shown for the same `cue_duration`, back to back, so
//! cue `i` covers `[i * d, (i + 1) * d)`.

use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

fn default_words_per_cue() -> usize {
    5
}

fn default_cue_duration_ms() -> u64 {
    2000
}

/// Caption chunking configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionConfig {
    #[serde(default = "default_words_per_cue")]
    pub words_per_cue: usize,
    #[serde(default = "default_cue_duration_ms")]
    pub cue_duration_ms: u64,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            words_per_cue: default_words_per_cue(),
            cue_duration_ms: default_cue_duration_ms(),
        }
    }
}

impl CaptionConfig {
    pub fn cue_duration(&self) -> Duration {
        Duration::from_millis(self.cue_duration_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.words_per_cue == 0 {
            return Err(Error::validation("words_per_cue must be at least 1"));
        }
        if self.cue_duration_ms == 0 {
            return Err(Error::validation("cue_duration_ms must be positive"));
        }
        Ok(())
    }
}

/// One timed caption line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    /// 1-based sequence number.
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// Split `text` into timed cues. Blank text yields no cues.
pub fn generate(text: &str, config: &CaptionConfig) -> Result<Vec<Cue>> {
    config.validate()?;
    let words: Vec<&str> = text.split_whitespace().collect();
    let step = config.cue_duration();

    Ok(words
        .chunks(config.words_per_cue)
        .enumerate()
        .map(|(i, group)| {
            let start = step.saturating_mul(u32::try_from(i).unwrap_or(u32::MAX));
            Cue {
                index: i + 1,
                start,
                end: start.saturating_add(step),
                text: group.join(" "),
            }
        })
        .collect())
}

/// Total time covered by `cues`.
pub fn total_duration(cues: &[Cue]) -> Duration {
    cues.last().map(|cue| cue.end).unwrap_or_default()
}

/// Serialize cues as a SubRip document.
pub fn to_srt(cues: &[Cue]) -> String {
    let mut output = String::new();
    for cue in cues {
        let _ = writeln!(output, "{}", cue.index);
        let _ = writeln!(
            output,
            "{} --> {}",
            format_srt_timestamp(cue.start),
            format_srt_timestamp(cue.end)
        );
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }
    output
}

/// `HH:MM:SS,mmm`
pub fn format_srt_timestamp(at: Duration) -> String {
    let total_ms = at.as_millis();
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_ten_words_make_two_cues() {
        let text = "one two three four five six seven eight nine ten";
        let cues = generate(text, &CaptionConfig::default()).unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].start, Duration::ZERO);
        assert_eq!(cues[0].end, Duration::from_secs(2));
        assert_eq!(cues[0].text, "one two three four five");
        assert_eq!(cues[1].start, Duration::from_secs(2));
        assert_eq!(cues[1].end, Duration::from_secs(4));
        assert_eq!(cues[1].index, 2);
    }

    #[test]
    fn test_cues_are_monotonic_and_contiguous() {
        let text = "a b c d e f g h i j k l m n o p q r s t u v w";
        let config = CaptionConfig {
            words_per_cue: 3,
            cue_duration_ms: 1250,
        };
        let cues = generate(text, &config).unwrap();

        assert_eq!(cues.len(), 8);
        assert_eq!(cues.last().unwrap().text, "v w");
        for cue in &cues {
            assert!(cue.start < cue.end);
        }
        for pair in cues.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(total_duration(&cues), Duration::from_millis(10_000));
    }

    #[test]
    fn test_blank_text_yields_no_cues() {
        assert!(generate("  \n\t ", &CaptionConfig::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CaptionConfig {
            words_per_cue: 0,
            ..Default::default()
        };
        assert!(generate("hello", &config).is_err());
    }

    #[rstest]
    #[case(Duration::ZERO, "00:00:00,000")]
    #[case(Duration::from_millis(2_500), "00:00:02,500")]
    #[case(Duration::from_millis(61_007), "00:01:01,007")]
    #[case(Duration::from_secs(3_600 + 120 + 3), "01:02:03,000")]
    fn test_format_srt_timestamp(#[case] at: Duration, #[case] expected: &str) {
        assert_eq!(format_srt_timestamp(at), expected);
    }

    #[test]
    fn test_to_srt_document() {
        let cues = generate("hello brave new world again and more", &CaptionConfig::default())
            .unwrap();
        assert_eq!(
            to_srt(&cues),
            "1\n00:00:00,000 --> 00:00:02,000\nhello brave new world again\n\n\
             2\n00:00:02,000 --> 00:00:04,000\nand more\n\n"
        );
    }
}
