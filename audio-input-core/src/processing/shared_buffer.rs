use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::models::audio_models::{ChannelLayout, ServerInfo};

/// Fixed-capacity rolling sample buffer shared with the visualization consumer.
///
/// Holds the most recent `capacity` frames as two equal-length channel arrays.
/// Every period shifts the existing samples left and appends the new frames at
/// the tail, so index `capacity - 1` is always the newest frame.
///
/// Mono input is duplicated into both channels; the consumer always reads two.
#[derive(Debug)]
pub struct AudioBuffer {
    left: Vec<f32>,
    right: Vec<f32>,
    capacity: usize,
    channels: ChannelLayout,
    modified: bool,
    sample_rate: u32,
    sample_size: usize,
}

impl AudioBuffer {
    pub fn new(capacity: usize, channels: ChannelLayout) -> Self {
        Self {
            left: vec![0.0; capacity],
            right: vec![0.0; capacity],
            capacity,
            channels,
            modified: false,
            sample_rate: 0,
            sample_size: 0,
        }
    }

    /// Append one period of input, discarding the oldest frames.
    ///
    /// `inputs` holds one slice per input port in registration order
    /// (`[mono]` or `[left, right]`), all of the same frame count.
    ///
    /// # Panics
    ///
    /// If the period is longer than the buffer, or the port count or slice
    /// lengths do not match the layout. Capacity is validated when a session
    /// is configured, so none of these can happen for a configured session.
    pub fn push_period(&mut self, inputs: &[&[f32]]) {
        assert_eq!(
            inputs.len(),
            self.channels.channel_count() as usize,
            "port count does not match channel layout"
        );
        let frames = inputs[0].len();
        assert!(
            frames <= self.capacity,
            "period of {} frames exceeds buffer capacity {}",
            frames,
            self.capacity
        );

        let tail = self.capacity - frames;
        self.left.copy_within(frames.., 0);
        self.right.copy_within(frames.., 0);

        self.left[tail..].copy_from_slice(inputs[0]);
        match self.channels {
            ChannelLayout::Mono => self.right[tail..].copy_from_slice(inputs[0]),
            ChannelLayout::Stereo => {
                assert_eq!(inputs[1].len(), frames, "channel lengths differ");
                self.right[tail..].copy_from_slice(inputs[1]);
            }
        }

        self.modified = true;
    }

    /// Whether a period of `frames` fits in the buffer.
    pub fn fits_period(&self, frames: usize) -> bool {
        frames <= self.capacity
    }

    /// Record the negotiated server parameters after a (re)connection.
    pub fn apply_server_info(&mut self, info: &ServerInfo) {
        self.sample_rate = info.sample_rate;
        self.sample_size = info.sample_size();
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    pub fn right(&self) -> &[f32] {
        &self.right
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Flag the buffer so the consumer redraws, e.g. to clear stale output
    /// while the server is away.
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Read and clear the modified flag. Consumers call this once per frame.
    pub fn take_modified(&mut self) -> bool {
        std::mem::replace(&mut self.modified, false)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn channels(&self) -> ChannelLayout {
        self.channels
    }

    /// Sample rate reported by the server, 0 before the first connection.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Period size in bytes reported by the server, 0 before the first connection.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }
}

/// Handle to an [`AudioBuffer`] shared between the capture callback and the
/// consumer. Cloning shares the same buffer.
#[derive(Debug, Clone)]
pub struct SharedAudioBuffer {
    inner: Arc<Mutex<AudioBuffer>>,
}

impl SharedAudioBuffer {
    pub fn new(capacity: usize, channels: ChannelLayout) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AudioBuffer::new(capacity, channels))),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, AudioBuffer> {
        self.inner.lock()
    }

    pub fn mark_modified(&self) {
        self.inner.lock().mark_modified();
    }

    pub fn channels(&self) -> ChannelLayout {
        self.inner.lock().channels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(start: f32, len: usize) -> Vec<f32> {
        (0..len).map(|i| start + i as f32).collect()
    }

    #[test]
    fn new_buffer_is_silent() {
        let buf = AudioBuffer::new(8, ChannelLayout::Stereo);

        assert_eq!(buf.left(), &[0.0; 8]);
        assert_eq!(buf.right(), &[0.0; 8]);
        assert!(!buf.is_modified());
    }

    #[test]
    fn push_appends_at_tail_and_drops_oldest() {
        let mut buf = AudioBuffer::new(6, ChannelLayout::Mono);

        buf.push_period(&[&[1.0, 2.0]]);
        assert_eq!(buf.left(), &[0.0, 0.0, 0.0, 0.0, 1.0, 2.0]);

        buf.push_period(&[&[3.0, 4.0]]);
        buf.push_period(&[&[5.0, 6.0]]);
        buf.push_period(&[&[7.0, 8.0]]);
        assert_eq!(buf.left(), &[3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn length_never_changes() {
        let mut buf = AudioBuffer::new(10, ChannelLayout::Stereo);

        for period in [1usize, 3, 10, 4, 7] {
            let l = ramp(0.0, period);
            let r = ramp(100.0, period);
            buf.push_period(&[&l, &r]);

            assert_eq!(buf.left().len(), 10);
            assert_eq!(buf.right().len(), 10);
            assert_eq!(&buf.left()[10 - period..], l.as_slice());
            assert_eq!(&buf.right()[10 - period..], r.as_slice());
        }
    }

    #[test]
    fn mono_duplicates_into_both_channels() {
        let mut buf = AudioBuffer::new(4, ChannelLayout::Mono);

        buf.push_period(&[&[0.25, -0.5, 0.75]]);

        assert_eq!(buf.left(), buf.right());
        assert_eq!(buf.right(), &[0.0, 0.25, -0.5, 0.75]);
    }

    #[test]
    fn stereo_channels_are_independent() {
        let mut buf = AudioBuffer::new(4, ChannelLayout::Stereo);

        buf.push_period(&[&[1.0, 2.0], &[-1.0, -2.0]]);

        assert_eq!(buf.left(), &[0.0, 0.0, 1.0, 2.0]);
        assert_eq!(buf.right(), &[0.0, 0.0, -1.0, -2.0]);
    }

    #[test]
    fn full_period_replaces_everything() {
        let mut buf = AudioBuffer::new(3, ChannelLayout::Mono);
        buf.push_period(&[&[1.0, 2.0, 3.0]]);
        buf.push_period(&[&[4.0, 5.0, 6.0]]);

        assert_eq!(buf.left(), &[4.0, 5.0, 6.0]);
    }

    #[test]
    #[should_panic(expected = "exceeds buffer capacity")]
    fn oversized_period_panics() {
        let mut buf = AudioBuffer::new(2, ChannelLayout::Mono);
        buf.push_period(&[&[1.0, 2.0, 3.0]]);
    }

    #[test]
    #[should_panic(expected = "port count")]
    fn stereo_without_right_port_panics() {
        let mut buf = AudioBuffer::new(4, ChannelLayout::Stereo);
        buf.push_period(&[&[1.0]]);
    }

    #[test]
    fn modified_flag_is_consumed_once() {
        let mut buf = AudioBuffer::new(4, ChannelLayout::Mono);
        buf.push_period(&[&[1.0]]);

        assert!(buf.take_modified());
        assert!(!buf.take_modified());

        buf.mark_modified();
        assert!(buf.is_modified());
    }

    #[test]
    fn server_info_overwrites_rate_and_size() {
        let mut buf = AudioBuffer::new(1024, ChannelLayout::Stereo);
        buf.apply_server_info(&ServerInfo {
            sample_rate: 44100,
            period_frames: 512,
        });

        assert_eq!(buf.sample_rate(), 44100);
        assert_eq!(buf.sample_size(), 2048);
        assert!(buf.fits_period(512));
        assert!(!buf.fits_period(1025));
    }

    #[test]
    fn shared_handle_clones_share_state() {
        let shared = SharedAudioBuffer::new(4, ChannelLayout::Mono);
        let consumer = shared.clone();

        shared.lock().push_period(&[&[9.0]]);

        let guard = consumer.lock();
        assert_eq!(guard.left()[3], 9.0);
        assert!(guard.is_modified());
    }
}
