use bytes::{Buf, BufMut};

use crate::encoding::wire_type::WireType;
use crate::encoding::{decode_key, DecodeContext};
use crate::DecodeError;
use crate::EncodeError;

/// A Protocol Buffers message.
///
/// The required methods are implemented by generated code and mirror the
/// internal writer/reader surface of the wire format: [`encode_raw`] writes
/// the message body without any framing, and [`merge_field`] consumes exactly
/// one field (or skips it when the tag is unknown). The provided methods are
/// the public codec surface. Length-delimited framing of nested messages is
/// handled inside [`encoding::message`], not here.
///
/// [`encode_raw`]: Message::encode_raw
/// [`merge_field`]: Message::merge_field
/// [`encoding::message`]: crate::encoding::message
pub trait Message: Send + Sync {
    /// Encodes the message to a buffer.
    ///
    /// This method will panic if the buffer has insufficient capacity.
    ///
    /// Meant to be used only by `Message` implementations.
    #[doc(hidden)]
    fn encode_raw(&self, buf: &mut impl BufMut)
    where
        Self: Sized;

    /// Decodes a field from a buffer, and merges it into `self`.
    ///
    /// Meant to be used only by `Message` implementations.
    #[doc(hidden)]
    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized;

    /// Returns the encoded length of the message without a length delimiter.
    fn encoded_len(&self) -> usize;

    /// Encodes the message into the remaining capacity of a buffer.
    ///
    /// Fails only when the buffer is too small; encoding itself is
    /// infallible, and nothing is written on failure.
    fn encode(&self, buf: &mut impl BufMut) -> Result<(), EncodeError>
    where
        Self: Sized,
    {
        match (self.encoded_len(), buf.remaining_mut()) {
            (required, remaining) if required > remaining => {
                Err(EncodeError::new(required, remaining))
            }
            _ => {
                self.encode_raw(buf);
                Ok(())
            }
        }
    }

    /// Encodes the message to a newly allocated buffer.
    ///
    /// A message with every field at its default encodes to an empty buffer.
    fn encode_to_vec(&self) -> Vec<u8>
    where
        Self: Sized,
    {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_raw(&mut buf);
        buf
    }

    /// Decodes an instance of the message from a buffer.
    ///
    /// The entire buffer is consumed. No partial message is returned on
    /// error.
    fn decode(buf: impl Buf) -> Result<Self, DecodeError>
    where
        Self: Default,
    {
        let mut message = Self::default();
        message.merge(buf)?;
        Ok(message)
    }

    /// Decodes fields from a buffer, merging each into `self`, until the
    /// buffer is exhausted.
    fn merge(&mut self, mut buf: impl Buf) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        let ctx = DecodeContext::default();
        while buf.has_remaining() {
            let (tag, wire_type) = decode_key(&mut buf)?;
            self.merge_field(tag, wire_type, &mut buf, ctx.clone())?;
        }
        Ok(())
    }

    /// Clears the message, resetting all fields to their default.
    fn clear(&mut self);
}

/// Boxed messages codec like their contents; generated code boxes fields
/// that would otherwise make a recursive message infinitely sized.
impl<M> Message for Box<M>
where
    M: Message,
{
    fn encode_raw(&self, buf: &mut impl BufMut) {
        self.as_ref().encode_raw(buf)
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        self.as_mut().merge_field(tag, wire_type, buf, ctx)
    }

    fn encoded_len(&self) -> usize {
        self.as_ref().encoded_len()
    }

    fn clear(&mut self) {
        self.as_mut().clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_object_safe() {
        fn takes_dyn(message: Option<&dyn Message>) -> usize {
            message.map_or(0, Message::encoded_len)
        }

        assert_eq!(takes_dyn(None), 0);
    }
}
