//! Capabilities the controller needs from its host.
//!
//! Each one is a narrow, read-only view into host-side bookkeeping. The
//! controller never subscribes to anything; the host calls in.

use std::{rc::Rc, sync::Arc};

#[cfg(test)]
use mockall::automock;

use crate::{SegmentRequest, StreamKey, VariantSource};

/// Download history of a stream.
#[cfg_attr(test, automock)]
pub trait RequestHistory {
    /// Requests recorded for `stream`, oldest first.
    fn segment_requests(&self, stream: &StreamKey) -> Vec<SegmentRequest>;
}

/// Playback buffer of a stream.
#[cfg_attr(test, automock)]
pub trait BufferLevel {
    /// Seconds of media buffered ahead of the playhead, `None` when unknown.
    fn buffer_level_secs(&self, stream: &StreamKey) -> Option<f64>;
}

macro_rules! forward_host_traits {
    ($($ptr:ty),+) => {$(
        impl<T: RequestHistory + ?Sized> RequestHistory for $ptr {
            fn segment_requests(&self, stream: &StreamKey) -> Vec<SegmentRequest> {
                (**self).segment_requests(stream)
            }
        }

        impl<T: BufferLevel + ?Sized> BufferLevel for $ptr {
            fn buffer_level_secs(&self, stream: &StreamKey) -> Option<f64> {
                (**self).buffer_level_secs(stream)
            }
        }

        impl<T: VariantSource + ?Sized> VariantSource for $ptr {
            fn variant_count(&self, stream: &StreamKey) -> usize {
                (**self).variant_count(stream)
            }

            fn variant_bandwidth(&self, stream: &StreamKey, index: usize) -> Option<u64> {
                (**self).variant_bandwidth(stream, index)
            }
        }
    )+};
}

forward_host_traits!(&T, Rc<T>, Arc<T>);
