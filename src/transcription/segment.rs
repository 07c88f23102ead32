/// One timed span of transcribed text
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Text as produced by the model, including its own spacing
    pub text: String,
    /// Start offset in seconds from the beginning of the audio
    pub start: f64,
    /// End offset in seconds, when the model reports one
    pub end: Option<f64>,
}

impl Segment {
    /// Creates a segment spanning `start..end`
    #[must_use]
    pub fn new(text: impl Into<String>, start: f64, end: Option<f64>) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Same segment moved `offset` seconds later
    #[must_use]
    pub fn shifted(mut self, offset: f64) -> Self {
        self.start += offset;
        self.end = self.end.map(|end| end + offset);
        self
    }
}
