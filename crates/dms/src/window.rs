//! Temporal window of normalized feature vectors

use feature_engine::{FeatureVector, FEATURE_DIMENSION};
use ndarray::Array2;
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};

/// Fill state of the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WindowStatus {
    WarmingUp { filled: usize, capacity: usize },
    Ready,
}

/// Fixed-length FIFO of the most recent feature vectors
#[derive(Debug, Clone)]
pub struct TemporalWindow {
    buffer: RingBuffer<FeatureVector>,
}

impl TemporalWindow {
    pub fn new(len: usize) -> Self {
        Self {
            buffer: RingBuffer::new(len),
        }
    }

    /// Append a vector, evicting the oldest when full
    pub fn push(&mut self, features: FeatureVector) -> Option<FeatureVector> {
        self.buffer.push(features)
    }

    pub fn is_ready(&self) -> bool {
        self.buffer.is_full()
    }

    pub fn status(&self) -> WindowStatus {
        if self.is_ready() {
            WindowStatus::Ready
        } else {
            WindowStatus::WarmingUp {
                filled: self.buffer.len(),
                capacity: self.buffer.capacity(),
            }
        }
    }

    /// Window as a `[timesteps, features]` matrix, oldest row first
    pub fn to_array(&self) -> Array2<f32> {
        let mut array = Array2::<f32>::zeros((self.buffer.len(), FEATURE_DIMENSION));
        for (mut row, features) in array.rows_mut().into_iter().zip(self.buffer.iter()) {
            for (cell, value) in row.iter_mut().zip(features.values.iter()) {
                *cell = *value as f32;
            }
        }
        array
    }

    pub fn oldest(&self) -> Option<&FeatureVector> {
        self.buffer.front()
    }

    pub fn latest(&self) -> Option<&FeatureVector> {
        self.buffer.back()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }
}
