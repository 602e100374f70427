//! Buffer supplier contracts between the engines and the application.
//!
//! The transmitter pulls payload from a [`TxSource`]; the receiver pushes
//! reassembled payload into buffers obtained from an [`RxSink`]. Chunk and
//! buffer granularity is entirely the application's choice and never shows
//! on the wire.

/// Supplies the byte stream to transmit.
pub trait TxSource {
    /// Return the next run of payload bytes. `None` or an empty slice means
    /// the stream is finished and starts the EOT handshake. The slice only
    /// needs to stay valid until the next call; the engine stages what it
    /// needs before asking again.
    fn next_chunk(&mut self) -> Option<&[u8]>;
}

/// Accepts the received byte stream.
pub trait RxSink {
    /// Return the next empty destination buffer. Called once at session
    /// start and again each time the previous buffer has been filled and
    /// more payload is waiting. `None` or an empty buffer declines further
    /// capacity and ends the session with [`Error::BufferFull`].
    ///
    /// [`Error::BufferFull`]: crate::Error::BufferFull
    fn next_buffer(&mut self) -> Option<&mut [u8]>;
}

/// A [`TxSource`] over a borrowed slice, either in one piece or in
/// fixed-size chunks.
pub struct SliceSource<'a> {
    data: &'a [u8],
    granule: usize,
    pos: usize,
}

impl<'a> SliceSource<'a> {
    /// Feed the whole slice in a single chunk.
    pub fn new(data: &'a [u8]) -> Self {
        SliceSource {
            data,
            granule: data.len().max(1),
            pos: 0,
        }
    }

    /// Feed the slice `granule` bytes at a time.
    pub fn chunked(data: &'a [u8], granule: usize) -> Self {
        assert!(granule > 0);
        SliceSource { data, granule, pos: 0 }
    }
}

impl TxSource for SliceSource<'_> {
    fn next_chunk(&mut self) -> Option<&[u8]> {
        if self.pos == self.data.len() {
            return None;
        }
        let end = (self.pos + self.granule).min(self.data.len());
        let chunk = &self.data[self.pos..end];
        self.pos = end;
        Some(chunk)
    }
}

/// An [`RxSink`] over a borrowed mutable slice, handed out whole or in
/// fixed-size buffers and declining once the slice is used up. This is the
/// fixed destination-buffer contract of classic implementations expressed
/// through the supplier interface.
pub struct SliceSink<'a> {
    buf: &'a mut [u8],
    granule: usize,
    handed: usize,
}

impl<'a> SliceSink<'a> {
    /// Hand the whole slice out as one buffer.
    pub fn new(buf: &'a mut [u8]) -> Self {
        let granule = buf.len().max(1);
        SliceSink { buf, granule, handed: 0 }
    }

    /// Hand the slice out `granule` bytes at a time.
    pub fn chunked(buf: &'a mut [u8], granule: usize) -> Self {
        assert!(granule > 0);
        SliceSink { buf, granule, handed: 0 }
    }

    /// How much of the slice has been handed to the engine so far.
    pub fn handed(&self) -> usize {
        self.handed
    }
}

impl RxSink for SliceSink<'_> {
    fn next_buffer(&mut self) -> Option<&mut [u8]> {
        if self.handed == self.buf.len() {
            return None;
        }
        let start = self.handed;
        let end = (start + self.granule).min(self.buf.len());
        self.handed = end;
        Some(&mut self.buf[start..end])
    }
}
