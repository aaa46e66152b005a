use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

/// One element of a [`Brigade`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bucket {
    /// A run of bytes.
    Data(Bytes),
    /// End-of-stream marker.
    Eos,
}

/// Ordered output of a read call: data buckets and end-of-stream markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Brigade {
    buckets: VecDeque<Bucket>,
}

impl Brigade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a data bucket. Empty data is dropped.
    pub fn push_data(&mut self, data: impl Into<Bytes>) {
        let data = data.into();
        if !data.is_empty() {
            self.buckets.push_back(Bucket::Data(data));
        }
    }

    /// Append an end-of-stream marker.
    pub fn push_eos(&mut self) {
        self.buckets.push_back(Bucket::Eos);
    }

    /// Move every bucket of `other` to the end of this brigade.
    pub fn append(&mut self, other: &mut Brigade) {
        self.buckets.append(&mut other.buckets);
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of data bytes held.
    pub fn data_len(&self) -> usize {
        self.buckets
            .iter()
            .map(|bucket| match bucket {
                Bucket::Data(data) => data.len(),
                Bucket::Eos => 0,
            })
            .sum()
    }

    /// True when an end-of-stream marker is present.
    pub fn has_eos(&self) -> bool {
        self.buckets.iter().any(|bucket| matches!(bucket, Bucket::Eos))
    }

    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter()
    }

    /// Remove and return the first bucket.
    pub fn pop_front(&mut self) -> Option<Bucket> {
        self.buckets.pop_front()
    }

    /// Concatenated data bytes, markers skipped.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.data_len());
        for bucket in &self.buckets {
            if let Bucket::Data(data) = bucket {
                out.extend_from_slice(data);
            }
        }
        out.freeze()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
