/// Consumer of media leaving a connection towards the application or another
/// connection. Buffers are rewritten in place by whoever forwards them.
/// Implementations return the number of bytes they took.
pub trait MediaSink: Send + Sync {
    fn deliver_audio_data(&self, data: &mut [u8]) -> usize;
    fn deliver_video_data(&self, data: &mut [u8]) -> usize;
}

/// Consumer of RTCP receiver feedback (RR, RTPFB, PSFB).
pub trait FeedbackSink: Send + Sync {
    fn deliver_feedback(&self, data: &mut [u8]) -> usize;
}
