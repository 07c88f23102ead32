use super::segment::Segment;
use std::fmt::Write;

/// How segments are rendered into the transcript string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscriptMode {
    /// Segment texts joined as-is, trimmed at both ends
    #[default]
    Plain,
    /// One `[H:MM:SS] text` line per segment
    Timestamped,
}

impl TranscriptMode {
    /// Maps the `timestamps` config flag to a mode
    #[must_use]
    pub const fn from_flag(timestamps: bool) -> Self {
        if timestamps {
            Self::Timestamped
        } else {
            Self::Plain
        }
    }
}

/// Renders segments as a single transcript string
#[must_use]
pub fn format_transcript(segments: &[Segment], mode: TranscriptMode) -> String {
    match mode {
        TranscriptMode::Plain => {
            let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
            joined.trim().to_owned()
        }
        TranscriptMode::Timestamped => {
            let mut out = String::new();
            for segment in segments {
                // Writing to a String cannot fail
                let _ = writeln!(
                    out,
                    "[{}] {}",
                    format_timestamp(segment.start),
                    segment.text.trim()
                );
            }
            out
        }
    }
}

/// Formats seconds as `H:MM:SS`, rounding down; hours are not zero-padded
#[must_use]
pub fn format_timestamp(seconds: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_world() -> Vec<Segment> {
        vec![
            Segment::new("hello", 0.0, Some(2.0)),
            Segment::new("world", 65.0, Some(67.0)),
        ]
    }

    #[test]
    fn test_timestamped_lines() {
        let text = format_transcript(&hello_world(), TranscriptMode::Timestamped);
        assert_eq!(text, "[0:00:00] hello\n[0:01:05] world\n");
    }

    #[test]
    fn test_timestamped_trims_segment_text() {
        let segments = vec![Segment::new("  spaced out \n", 3.9, None)];
        let text = format_transcript(&segments, TranscriptMode::Timestamped);
        assert_eq!(text, "[0:00:03] spaced out\n");
    }

    #[test]
    fn test_plain_keeps_model_spacing() {
        let segments = vec![
            Segment::new(" The quick", 0.0, None),
            Segment::new(" brown fox.", 1.2, None),
        ];
        let text = format_transcript(&segments, TranscriptMode::Plain);
        assert_eq!(text, "The quick brown fox.");
    }

    #[test]
    fn test_plain_no_separator_added() {
        let text = format_transcript(&hello_world(), TranscriptMode::Plain);
        assert_eq!(text, "helloworld");
    }

    #[test]
    fn test_empty_segments() {
        assert_eq!(format_transcript(&[], TranscriptMode::Plain), "");
        assert_eq!(format_transcript(&[], TranscriptMode::Timestamped), "");
    }

    #[test]
    fn test_format_timestamp_rounds_down() {
        assert_eq!(format_timestamp(0.0), "0:00:00");
        assert_eq!(format_timestamp(59.999), "0:00:59");
        assert_eq!(format_timestamp(65.0), "0:01:05");
        assert_eq!(format_timestamp(3600.0), "1:00:00");
        assert_eq!(format_timestamp(3599.5), "0:59:59");
        assert_eq!(format_timestamp(43_261.7), "12:01:01");
    }

    #[test]
    fn test_format_timestamp_invalid_inputs() {
        assert_eq!(format_timestamp(-4.0), "0:00:00");
        assert_eq!(format_timestamp(f64::NAN), "0:00:00");
    }

    #[test]
    fn test_format_is_deterministic() {
        let segments = hello_world();
        let a = format_transcript(&segments, TranscriptMode::Timestamped);
        let b = format_transcript(&segments, TranscriptMode::Timestamped);
        assert_eq!(a, b);
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(TranscriptMode::from_flag(true), TranscriptMode::Timestamped);
        assert_eq!(TranscriptMode::from_flag(false), TranscriptMode::Plain);
    }
}
