//! A sequence codec with per-element alignment padding.

use crate::codec::{Decode, Encode, Size};
use crate::error::Error;
use crate::reader::Reader;
use crate::stream::{Sink, Source};
use crate::util::{discard, round_up};
use crate::writer::Writer;

/// An ordered sequence of codec elements.
///
/// With an alignment `A > 1`, every element except the last is padded
/// with zero bytes to the next multiple of `A` of its own size; nothing
/// follows the last element.
///
/// Decoding has two modes, selected by the capacity the list was
/// constructed with: a fixed expected count reads exactly that many
/// elements (any end of stream is a failure), while a zero capacity
/// reads elements until a clean end of stream at an element boundary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct List<T> {
    items: Vec<T>,
    alignment: usize,
    expected: usize,
}

impl<T> List<T> {
    /// A list of `items` with no inter-element padding.
    pub fn new(items: Vec<T>) -> Self {
        Self::aligned(items, 0)
    }

    /// A list of `items` padded to `alignment` between elements.
    /// `alignment` must be zero, one, or a power of two.
    pub fn aligned(items: Vec<T>, alignment: usize) -> Self {
        Self {
            items,
            alignment,
            expected: 0,
        }
    }

    /// An empty list that decodes exactly `expected` elements.
    pub fn with_expected(expected: usize, alignment: usize) -> Self {
        Self {
            items: Vec::with_capacity(expected),
            alignment,
            expected,
        }
    }

    /// An empty list that decodes until a clean end of stream.
    pub fn until_end(alignment: usize) -> Self {
        Self {
            items: Vec::new(),
            alignment,
            expected: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T: Size> Size for List<T> {
    fn size(&self) -> usize {
        let last = self.items.len().saturating_sub(1);
        let mut total = 0;
        for (i, item) in self.items.iter().enumerate() {
            let item_size = item.size();
            total += item_size;
            if i < last && self.alignment > 1 {
                total += round_up(item_size, self.alignment) - item_size;
            }
        }
        total
    }
}

impl<T: Encode> Encode for List<T> {
    fn write_into<S: Sink>(&self, w: &mut Writer<S>) -> Result<u64, Error> {
        let last = self.items.len().saturating_sub(1);
        let mut written = 0u64;
        for (i, item) in self.items.iter().enumerate() {
            written += item.write_into(w)?;
            if i < last && self.alignment > 1 {
                let item_size = item.size();
                let pad = (round_up(item_size, self.alignment) - item_size) as u64;
                w.write_zeros(pad);
                if let Some(e) = w.err() {
                    return Err(e.clone());
                }
                written += pad;
            }
        }
        Ok(written)
    }
}

impl<T: Decode + Default> Decode for List<T> {
    fn read_from<S: Source>(&mut self, r: &mut Reader<S>) -> Result<u64, Error> {
        let until_end = self.expected == 0;
        let mut n = 0u64;
        let mut i = 0;
        loop {
            if !until_end && i >= self.expected {
                break;
            }

            let mut item = T::default();
            let read = match item.read_from(r) {
                Ok(read) => read,
                // Clean end of stream at an element boundary is the
                // success condition for open-ended decoding.
                Err(Error::EndOfStream) if until_end => break,
                Err(e) => return Err(e),
            };
            n += read;
            self.items.push(item);

            let is_last = !until_end && i + 1 == self.expected;
            if !is_last && self.alignment > 1 {
                let pad = round_up(read, self.alignment as u64) - read;
                if pad > 0 {
                    let moved = discard(r, pad as i64)?;
                    n += moved;
                    if moved < pad {
                        // The stream ended inside the trailing padding.
                        if until_end {
                            break;
                        }
                        return Err(Error::UnexpectedEndOfStream);
                    }
                }
            }
            i += 1;
        }
        Ok(n)
    }
}
