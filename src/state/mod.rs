//! Host-side cache of channel values, output frequency, and the arm flag.
//!
//! The attribute surface writes here while the synchronizer reads from a
//! different context, so all fields live behind one mutex. A
//! synchronization pass copies everything it needs under a single lock.

use crate::error::InvalidArgument;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const CHANNEL_COUNT: usize = 8;
pub const MAX_FREQUENCY: i32 = 1000;
pub const DEFAULT_FREQUENCY: u16 = 50;

/// Bounds-checked channel slot index in `0..CHANNEL_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelIndex(u8);

impl ChannelIndex {
    pub const fn new(index: usize) -> Option<Self> {
        if index < CHANNEL_COUNT {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    pub const fn get(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = ChannelIndex> {
        (0..CHANNEL_COUNT as u8).map(ChannelIndex)
    }
}

impl TryFrom<usize> for ChannelIndex {
    type Error = InvalidArgument;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::new(index).ok_or(InvalidArgument::ChannelOutOfRange(index))
    }
}

pub fn validate_frequency(value: i32) -> Result<u16, InvalidArgument> {
    if (0..=MAX_FREQUENCY).contains(&value) {
        Ok(value as u16)
    } else {
        Err(InvalidArgument::FrequencyOutOfRange(value))
    }
}

#[derive(Debug, Clone, Copy)]
struct Cache {
    channels: [u16; CHANNEL_COUNT],
    frequency: u16,
    frequency_pending: bool,
    armed: bool,
}

impl Cache {
    fn with_frequency(frequency: u16) -> Self {
        Self {
            channels: [0; CHANNEL_COUNT],
            frequency,
            frequency_pending: false,
            armed: false,
        }
    }
}

/// What one synchronization pass has to transmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSnapshot {
    /// Frequency to push; taking the snapshot clears the pending flag.
    pub frequency: Option<u16>,
    /// Full output frame, present only while armed.
    pub outputs: Option<[u16; CHANNEL_COUNT]>,
}

pub struct PwmState {
    cache: Mutex<Cache>,
    default_frequency: u16,
}

impl PwmState {
    pub fn new(default_frequency: u16) -> Self {
        Self {
            cache: Mutex::new(Cache::with_frequency(default_frequency)),
            default_frequency,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Back to attach-time defaults: default frequency, disarmed, all channels zero.
    pub fn reset(&self) {
        *self.lock() = Cache::with_frequency(self.default_frequency);
    }

    pub fn set_channel(&self, channel: ChannelIndex, value: u16) {
        self.lock().channels[channel.get()] = value;
    }

    pub fn channel(&self, channel: ChannelIndex) -> u16 {
        self.lock().channels[channel.get()]
    }

    pub fn channels(&self) -> [u16; CHANNEL_COUNT] {
        self.lock().channels
    }

    /// Accept a new output frequency and schedule it for the next pass.
    ///
    /// Out-of-range values are rejected before anything is cached, so the
    /// previous frequency and pending flag survive a rejected write.
    pub fn set_frequency(&self, value: i32) -> Result<(), InvalidArgument> {
        let frequency = validate_frequency(value)?;
        let mut cache = self.lock();
        cache.frequency = frequency;
        cache.frequency_pending = true;
        Ok(())
    }

    pub fn frequency(&self) -> u16 {
        self.lock().frequency
    }

    pub fn frequency_pending(&self) -> bool {
        self.lock().frequency_pending
    }

    pub fn set_armed(&self, value: i32) {
        self.lock().armed = value > 0;
    }

    pub fn armed(&self) -> bool {
        self.lock().armed
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        let mut cache = self.lock();
        let frequency = if cache.frequency_pending {
            cache.frequency_pending = false;
            Some(cache.frequency)
        } else {
            None
        };
        SyncSnapshot {
            frequency,
            outputs: cache.armed.then_some(cache.channels),
        }
    }

    /// Re-schedule a frequency push that failed. A newer pending value wins.
    pub fn requeue_frequency(&self) {
        self.lock().frequency_pending = true;
    }
}

impl Default for PwmState {
    fn default() -> Self {
        Self::new(DEFAULT_FREQUENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(i: usize) -> ChannelIndex {
        ChannelIndex::new(i).unwrap()
    }

    #[test]
    fn defaults_after_construction() {
        let state = PwmState::default();
        assert_eq!(state.frequency(), 50);
        assert!(!state.armed());
        assert!(!state.frequency_pending());
        assert_eq!(state.channels(), [0; CHANNEL_COUNT]);
    }

    #[test]
    fn channel_index_bounds() {
        assert!(ChannelIndex::new(7).is_some());
        assert!(ChannelIndex::new(8).is_none());
        assert_eq!(
            ChannelIndex::try_from(9),
            Err(InvalidArgument::ChannelOutOfRange(9))
        );
        assert_eq!(ChannelIndex::all().count(), CHANNEL_COUNT);
    }

    #[test]
    fn set_channel_stores_unvalidated_value() {
        let state = PwmState::default();
        state.set_channel(ch(3), u16::MAX);
        assert_eq!(state.channel(ch(3)), u16::MAX);
        assert_eq!(state.channel(ch(2)), 0);
    }

    #[test]
    fn frequency_in_range_sets_pending() {
        let state = PwmState::default();
        state.set_frequency(0).unwrap();
        assert_eq!(state.frequency(), 0);
        state.set_frequency(1000).unwrap();
        assert_eq!(state.frequency(), 1000);
        assert!(state.frequency_pending());
    }

    #[test]
    fn rejected_frequency_leaves_cache_untouched() {
        let state = PwmState::default();
        assert_eq!(
            state.set_frequency(1001),
            Err(InvalidArgument::FrequencyOutOfRange(1001))
        );
        assert_eq!(
            state.set_frequency(-1),
            Err(InvalidArgument::FrequencyOutOfRange(-1))
        );
        assert_eq!(state.frequency(), 50);
        assert!(!state.frequency_pending());
    }

    #[test]
    fn armed_is_strictly_positive() {
        let state = PwmState::default();
        state.set_armed(5);
        assert!(state.armed());
        state.set_armed(0);
        assert!(!state.armed());
        state.set_armed(-3);
        assert!(!state.armed());
    }

    #[test]
    fn snapshot_takes_pending_frequency_once() {
        let state = PwmState::default();
        state.set_frequency(400).unwrap();
        assert_eq!(state.snapshot().frequency, Some(400));
        assert_eq!(state.snapshot().frequency, None);
        assert!(!state.frequency_pending());
    }

    #[test]
    fn snapshot_omits_outputs_while_disarmed() {
        let state = PwmState::default();
        state.set_channel(ch(0), 1500);
        assert_eq!(state.snapshot().outputs, None);
        state.set_armed(1);
        let outputs = state.snapshot().outputs.unwrap();
        assert_eq!(outputs[0], 1500);
    }

    #[test]
    fn reset_restores_defaults() {
        let state = PwmState::new(400);
        state.set_frequency(100).unwrap();
        state.set_armed(1);
        state.set_channel(ch(1), 1200);
        state.reset();
        assert_eq!(state.frequency(), 400);
        assert!(!state.armed());
        assert!(!state.frequency_pending());
        assert_eq!(state.channels(), [0; CHANNEL_COUNT]);
    }

    #[test]
    fn snapshot_is_a_single_point_in_time() {
        use std::sync::Arc;
        use std::thread;

        let state = Arc::new(PwmState::default());
        state.set_armed(1);
        let writer = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for v in 1..=500u16 {
                    for i in ChannelIndex::all() {
                        state.set_channel(i, v);
                    }
                }
            })
        };
        for _ in 0..500 {
            let frame = state.snapshot().outputs.unwrap();
            // Channels are written in ascending order, so a later slot may lag but never lead.
            assert!(frame.windows(2).all(|w| w[0] >= w[1]));
        }
        writer.join().unwrap();
    }
}
