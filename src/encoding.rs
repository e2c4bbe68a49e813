//! Utility functions and types for encoding and decoding Protobuf types.
//!
//! Meant to be used only from generated code. Each submodule named after a
//! proto scalar type (`int32`, `sint64`, `string`, ...) carries the codec
//! functions the generator wires fields to: `encode`/`merge` for singular
//! fields, `encode_repeated`/`merge_repeated` for repeated fields, and for
//! numeric types `encode_packed` alongside a `merge_repeated` that accepts
//! both the packed and the unpacked encoding.

use std::collections::HashMap;
use std::hash::Hash;

use ::bytes::{Buf, BufMut};

use crate::DecodeError;
use crate::Message;
use crate::{Enumeration, OpenEnum};

pub mod varint;
pub use varint::{decode_varint, encode_varint, encoded_len_varint};

pub mod wire_type;
pub use wire_type::{check_wire_type, WireType};

/// Additional information passed to every decode/merge function.
///
/// The context should be passed by value and can be freely cloned. When
/// passing to a function which is decoding a nested object, use
/// `enter_recursion`.
#[derive(Clone, Debug)]
pub struct DecodeContext {
    /// How many times we can recurse in the current decode stack before we
    /// hit the recursion limit.
    recurse_count: u32,
}

impl Default for DecodeContext {
    #[inline]
    fn default() -> DecodeContext {
        DecodeContext {
            recurse_count: crate::RECURSION_LIMIT,
        }
    }
}

impl DecodeContext {
    /// Call this function before recursively decoding.
    ///
    /// There is no `exit` function since this function creates a new
    /// `DecodeContext` to be used at the next level of recursion.
    #[inline]
    pub(crate) fn enter_recursion(&self) -> DecodeContext {
        DecodeContext {
            recurse_count: self.recurse_count - 1,
        }
    }

    /// Checks whether the recursion limit has been reached in the stack of
    /// decodes described by this `DecodeContext`.
    #[inline]
    pub(crate) fn limit_reached(&self) -> Result<(), DecodeError> {
        if self.recurse_count == 0 {
            Err(DecodeError::new("recursion limit reached"))
        } else {
            Ok(())
        }
    }
}

pub const MIN_TAG: u32 = 1;
pub const MAX_TAG: u32 = (1 << 29) - 1;

/// Encodes a Protobuf field key, which consists of a wire type designator and
/// the field tag.
#[inline]
pub fn encode_key(tag: u32, wire_type: WireType, buf: &mut impl BufMut) {
    debug_assert!((MIN_TAG..=MAX_TAG).contains(&tag));
    let key = (tag << 3) | wire_type as u32;
    encode_varint(u64::from(key), buf);
}

/// Decodes a Protobuf field key, which consists of a wire type designator and
/// the field tag.
#[inline]
pub fn decode_key(buf: &mut impl Buf) -> Result<(u32, WireType), DecodeError> {
    let key = decode_varint(buf)?;
    if key > u64::from(u32::MAX) {
        return Err(DecodeError::new(format!("invalid key value: {}", key)));
    }
    let wire_type = WireType::try_from(key & 0x07)?;
    let tag = key as u32 >> 3;

    if tag < MIN_TAG {
        return Err(DecodeError::new("invalid tag value: 0"));
    }

    Ok((tag, wire_type))
}

/// Returns the width of an encoded Protobuf field key with the given tag.
/// The returned width will be between 1 and 5 bytes (inclusive).
#[inline]
pub fn key_len(tag: u32) -> usize {
    encoded_len_varint(u64::from(tag << 3))
}

/// Helper function which abstracts reading a length delimiter prefix followed
/// by decoding values until the length of bytes is exhausted.
pub fn merge_loop<T, M, B>(
    value: &mut T,
    buf: &mut B,
    ctx: DecodeContext,
    mut merge: M,
) -> Result<(), DecodeError>
where
    M: FnMut(&mut T, &mut B, DecodeContext) -> Result<(), DecodeError>,
    B: Buf,
{
    let len = decode_varint(buf)?;
    let remaining = buf.remaining();
    if len > remaining as u64 {
        return Err(DecodeError::new("buffer underflow"));
    }

    let limit = remaining - len as usize;
    while buf.remaining() > limit {
        merge(value, buf, ctx.clone())?;
    }

    if buf.remaining() != limit {
        return Err(DecodeError::new("delimited length exceeded"));
    }
    Ok(())
}

/// Consumes exactly the bytes belonging to a field of the given wire type,
/// preserving framing but not payload.
///
/// Proto2 groups are not supported; a group wire type is a decode error.
pub fn skip_field(
    wire_type: WireType,
    buf: &mut impl Buf,
    ctx: DecodeContext,
) -> Result<(), DecodeError> {
    ctx.limit_reached()?;
    let len = match wire_type {
        WireType::Varint => decode_varint(buf).map(|_| 0)?,
        WireType::ThirtyTwoBit => 4,
        WireType::SixtyFourBit => 8,
        WireType::LengthDelimited => decode_varint(buf)?,
        WireType::StartGroup | WireType::EndGroup => {
            return Err(DecodeError::new("group wire type is not supported"))
        }
    };

    if len > buf.remaining() as u64 {
        return Err(DecodeError::new("buffer underflow"));
    }

    buf.advance(len as usize);
    Ok(())
}

/// Helper macro which emits an `encode_repeated` function for the type.
macro_rules! encode_repeated {
    ($ty:ty) => {
        pub fn encode_repeated(tag: u32, values: &[$ty], buf: &mut impl BufMut) {
            for value in values {
                encode(tag, value, buf);
            }
        }
    };
}

/// Helper macro which emits a `merge_repeated` function for the numeric type.
///
/// The generated function accepts both the packed and the unpacked encoding,
/// as proto3 decoders must.
macro_rules! merge_repeated_numeric {
    ($ty:ty, $wire_type:expr) => {
        pub fn merge_repeated(
            wire_type: WireType,
            values: &mut Vec<$ty>,
            buf: &mut impl Buf,
            ctx: DecodeContext,
        ) -> Result<(), DecodeError> {
            if wire_type == WireType::LengthDelimited {
                // Packed.
                merge_loop(values, buf, ctx, |values, buf, ctx| {
                    let mut value = Default::default();
                    merge($wire_type, &mut value, buf, ctx)?;
                    values.push(value);
                    Ok(())
                })
            } else {
                // Unpacked.
                check_wire_type($wire_type, wire_type)?;
                let mut value = Default::default();
                merge(wire_type, &mut value, buf, ctx)?;
                values.push(value);
                Ok(())
            }
        }
    };
}

/// Macro which emits a module containing a set of encoding functions for a
/// variable width numeric type.
macro_rules! varint {
    ($ty:ty, $proto_ty:ident) => {
        varint!($ty,
                $proto_ty,
                to_uint64(value) { *value as u64 },
                from_uint64(value) { value as $ty });
    };

    ($ty:ty,
     $proto_ty:ident,
     to_uint64($to_uint64_value:ident) $to_uint64:expr,
     from_uint64($from_uint64_value:ident) $from_uint64:expr) => {

        pub mod $proto_ty {
            use super::*;

            pub fn encode(tag: u32, $to_uint64_value: &$ty, buf: &mut impl BufMut) {
                encode_key(tag, WireType::Varint, buf);
                encode_varint($to_uint64, buf);
            }

            pub fn merge(
                wire_type: WireType,
                value: &mut $ty,
                buf: &mut impl Buf,
                _ctx: DecodeContext,
            ) -> Result<(), DecodeError> {
                check_wire_type(WireType::Varint, wire_type)?;
                let $from_uint64_value = decode_varint(buf)?;
                *value = $from_uint64;
                Ok(())
            }

            encode_repeated!($ty);

            pub fn encode_packed(tag: u32, values: &[$ty], buf: &mut impl BufMut) {
                if values.is_empty() {
                    return;
                }

                encode_key(tag, WireType::LengthDelimited, buf);
                let len: usize = values
                    .iter()
                    .map(|$to_uint64_value| encoded_len_varint($to_uint64))
                    .sum();
                encode_varint(len as u64, buf);

                for $to_uint64_value in values {
                    encode_varint($to_uint64, buf);
                }
            }

            merge_repeated_numeric!($ty, WireType::Varint);

            #[inline]
            pub fn encoded_len(tag: u32, $to_uint64_value: &$ty) -> usize {
                key_len(tag) + encoded_len_varint($to_uint64)
            }

            #[inline]
            pub fn encoded_len_repeated(tag: u32, values: &[$ty]) -> usize {
                key_len(tag) * values.len()
                    + values
                        .iter()
                        .map(|$to_uint64_value| encoded_len_varint($to_uint64))
                        .sum::<usize>()
            }

            #[inline]
            pub fn encoded_len_packed(tag: u32, values: &[$ty]) -> usize {
                if values.is_empty() {
                    0
                } else {
                    let len = values
                        .iter()
                        .map(|$to_uint64_value| encoded_len_varint($to_uint64))
                        .sum::<usize>();
                    key_len(tag) + encoded_len_varint(len as u64) + len
                }
            }

        }
    };
}

varint!(bool, bool,
        to_uint64(value) u64::from(*value),
        from_uint64(value) value != 0);
varint!(i32, int32);
varint!(i64, int64);
varint!(u32, uint32);
varint!(u64, uint64);
varint!(i32, sint32,
to_uint64(value) {
    ((value << 1) ^ (value >> 31)) as u32 as u64
},
from_uint64(value) {
    let value = value as u32;
    ((value >> 1) as i32) ^ (-((value & 1) as i32))
});
varint!(i64, sint64,
to_uint64(value) {
    ((value << 1) ^ (value >> 63)) as u64
},
from_uint64(value) {
    ((value >> 1) as i64) ^ (-((value & 1) as i64))
});

/// Macro which emits a module containing a set of encoding functions for a
/// fixed width numeric type.
macro_rules! fixed_width {
    ($ty:ty, $width:expr, $wire_type:expr, $proto_ty:ident, $put:ident, $get:ident) => {
        pub mod $proto_ty {
            use super::*;

            pub fn encode(tag: u32, value: &$ty, buf: &mut impl BufMut) {
                encode_key(tag, $wire_type, buf);
                buf.$put(*value);
            }

            pub fn merge(
                wire_type: WireType,
                value: &mut $ty,
                buf: &mut impl Buf,
                _ctx: DecodeContext,
            ) -> Result<(), DecodeError> {
                check_wire_type($wire_type, wire_type)?;
                if buf.remaining() < $width {
                    return Err(DecodeError::new("buffer underflow"));
                }
                *value = buf.$get();
                Ok(())
            }

            encode_repeated!($ty);

            pub fn encode_packed(tag: u32, values: &[$ty], buf: &mut impl BufMut) {
                if values.is_empty() {
                    return;
                }

                encode_key(tag, WireType::LengthDelimited, buf);
                let len = values.len() as u64 * $width;
                encode_varint(len, buf);

                for value in values {
                    buf.$put(*value);
                }
            }

            merge_repeated_numeric!($ty, $wire_type);

            #[inline]
            pub fn encoded_len(tag: u32, _: &$ty) -> usize {
                key_len(tag) + $width
            }

            #[inline]
            pub fn encoded_len_repeated(tag: u32, values: &[$ty]) -> usize {
                (key_len(tag) + $width) * values.len()
            }

            #[inline]
            pub fn encoded_len_packed(tag: u32, values: &[$ty]) -> usize {
                if values.is_empty() {
                    0
                } else {
                    let len = $width * values.len();
                    key_len(tag) + encoded_len_varint(len as u64) + len
                }
            }

        }
    };
}

fixed_width!(
    f32,
    4,
    WireType::ThirtyTwoBit,
    float,
    put_f32_le,
    get_f32_le
);
fixed_width!(
    f64,
    8,
    WireType::SixtyFourBit,
    double,
    put_f64_le,
    get_f64_le
);
fixed_width!(
    u32,
    4,
    WireType::ThirtyTwoBit,
    fixed32,
    put_u32_le,
    get_u32_le
);
fixed_width!(
    u64,
    8,
    WireType::SixtyFourBit,
    fixed64,
    put_u64_le,
    get_u64_le
);
fixed_width!(
    i32,
    4,
    WireType::ThirtyTwoBit,
    sfixed32,
    put_i32_le,
    get_i32_le
);
fixed_width!(
    i64,
    8,
    WireType::SixtyFourBit,
    sfixed64,
    put_i64_le,
    get_i64_le
);

/// Macro which emits the repeated-field functions for a length-delimited
/// type.
macro_rules! length_delimited {
    ($ty:ty) => {
        encode_repeated!($ty);

        pub fn merge_repeated(
            wire_type: WireType,
            values: &mut Vec<$ty>,
            buf: &mut impl Buf,
            ctx: DecodeContext,
        ) -> Result<(), DecodeError> {
            check_wire_type(WireType::LengthDelimited, wire_type)?;
            let mut value = Default::default();
            merge(wire_type, &mut value, buf, ctx)?;
            values.push(value);
            Ok(())
        }

        #[inline]
        pub fn encoded_len(tag: u32, value: &$ty) -> usize {
            key_len(tag) + encoded_len_varint(value.len() as u64) + value.len()
        }

        #[inline]
        pub fn encoded_len_repeated(tag: u32, values: &[$ty]) -> usize {
            key_len(tag) * values.len()
                + values
                    .iter()
                    .map(|value| encoded_len_varint(value.len() as u64) + value.len())
                    .sum::<usize>()
        }
    };
}

pub mod bytes {
    use super::*;

    pub fn encode(tag: u32, value: &Vec<u8>, buf: &mut impl BufMut) {
        encode_key(tag, WireType::LengthDelimited, buf);
        encode_varint(value.len() as u64, buf);
        buf.put_slice(value);
    }

    pub fn merge(
        wire_type: WireType,
        value: &mut Vec<u8>,
        buf: &mut impl Buf,
        _ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        check_wire_type(WireType::LengthDelimited, wire_type)?;
        let len = decode_varint(buf)?;
        if len > buf.remaining() as u64 {
            return Err(DecodeError::new("buffer underflow"));
        }
        let len = len as usize;

        // When a non-repeated field appears multiple times on the wire,
        // parsers accept the last value they see.
        value.clear();
        value.reserve(len);
        value.put(buf.take(len));
        Ok(())
    }

    length_delimited!(Vec<u8>);
}

pub mod string {
    use super::*;

    pub fn encode(tag: u32, value: &String, buf: &mut impl BufMut) {
        encode_key(tag, WireType::LengthDelimited, buf);
        encode_varint(value.len() as u64, buf);
        buf.put_slice(value.as_bytes());
    }

    pub fn merge(
        wire_type: WireType,
        value: &mut String,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        let mut raw = Vec::new();
        super::bytes::merge(wire_type, &mut raw, buf, ctx)?;
        match String::from_utf8(raw) {
            Ok(decoded) => {
                *value = decoded;
                Ok(())
            }
            Err(_) => Err(DecodeError::new(
                "invalid string value: data is not UTF-8 encoded",
            )),
        }
    }

    length_delimited!(String);
}

pub mod enumeration {
    use super::*;

    pub fn encode<E>(tag: u32, value: &OpenEnum<E>, buf: &mut impl BufMut)
    where
        E: Enumeration,
    {
        encode_key(tag, WireType::Varint, buf);
        encode_varint(value.to_raw() as u64, buf);
    }

    pub fn merge<E>(
        wire_type: WireType,
        value: &mut OpenEnum<E>,
        buf: &mut impl Buf,
        _ctx: DecodeContext,
    ) -> Result<(), DecodeError>
    where
        E: Enumeration,
    {
        check_wire_type(WireType::Varint, wire_type)?;
        *value = OpenEnum::from_raw(decode_varint(buf)? as i32);
        Ok(())
    }

    pub fn encode_repeated<E>(tag: u32, values: &[OpenEnum<E>], buf: &mut impl BufMut)
    where
        E: Enumeration,
    {
        for value in values {
            encode(tag, value, buf);
        }
    }

    pub fn encode_packed<E>(tag: u32, values: &[OpenEnum<E>], buf: &mut impl BufMut)
    where
        E: Enumeration,
    {
        if values.is_empty() {
            return;
        }

        encode_key(tag, WireType::LengthDelimited, buf);
        let len: usize = values
            .iter()
            .map(|value| encoded_len_varint(value.to_raw() as u64))
            .sum();
        encode_varint(len as u64, buf);

        for value in values {
            encode_varint(value.to_raw() as u64, buf);
        }
    }

    pub fn merge_repeated<E>(
        wire_type: WireType,
        values: &mut Vec<OpenEnum<E>>,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError>
    where
        E: Enumeration,
    {
        if wire_type == WireType::LengthDelimited {
            // Packed.
            merge_loop(values, buf, ctx, |values, buf, ctx| {
                let mut value = OpenEnum::default();
                merge(WireType::Varint, &mut value, buf, ctx)?;
                values.push(value);
                Ok(())
            })
        } else {
            // Unpacked.
            check_wire_type(WireType::Varint, wire_type)?;
            let mut value = OpenEnum::default();
            merge(wire_type, &mut value, buf, ctx)?;
            values.push(value);
            Ok(())
        }
    }

    #[inline]
    pub fn encoded_len<E>(tag: u32, value: &OpenEnum<E>) -> usize
    where
        E: Enumeration,
    {
        key_len(tag) + encoded_len_varint(value.to_raw() as u64)
    }

    #[inline]
    pub fn encoded_len_repeated<E>(tag: u32, values: &[OpenEnum<E>]) -> usize
    where
        E: Enumeration,
    {
        key_len(tag) * values.len()
            + values
                .iter()
                .map(|value| encoded_len_varint(value.to_raw() as u64))
                .sum::<usize>()
    }

    #[inline]
    pub fn encoded_len_packed<E>(tag: u32, values: &[OpenEnum<E>]) -> usize
    where
        E: Enumeration,
    {
        if values.is_empty() {
            0
        } else {
            let len = values
                .iter()
                .map(|value| encoded_len_varint(value.to_raw() as u64))
                .sum::<usize>();
            key_len(tag) + encoded_len_varint(len as u64) + len
        }
    }
}

pub mod message {
    use super::*;

    pub fn encode<M>(tag: u32, msg: &M, buf: &mut impl BufMut)
    where
        M: Message,
    {
        encode_key(tag, WireType::LengthDelimited, buf);
        encode_varint(msg.encoded_len() as u64, buf);
        msg.encode_raw(buf);
    }

    pub fn merge<M, B>(
        wire_type: WireType,
        msg: &mut M,
        buf: &mut B,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError>
    where
        M: Message,
        B: Buf,
    {
        check_wire_type(WireType::LengthDelimited, wire_type)?;
        ctx.limit_reached()?;
        merge_loop(
            msg,
            buf,
            ctx.enter_recursion(),
            |msg: &mut M, buf: &mut B, ctx| {
                let (tag, wire_type) = decode_key(buf)?;
                msg.merge_field(tag, wire_type, buf, ctx)
            },
        )
    }

    pub fn encode_repeated<M>(tag: u32, messages: &[M], buf: &mut impl BufMut)
    where
        M: Message,
    {
        for msg in messages {
            encode(tag, msg, buf);
        }
    }

    pub fn merge_repeated<M>(
        wire_type: WireType,
        messages: &mut Vec<M>,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError>
    where
        M: Message + Default,
    {
        check_wire_type(WireType::LengthDelimited, wire_type)?;
        let mut msg = M::default();
        merge(WireType::LengthDelimited, &mut msg, buf, ctx)?;
        messages.push(msg);
        Ok(())
    }

    #[inline]
    pub fn encoded_len<M>(tag: u32, msg: &M) -> usize
    where
        M: Message,
    {
        let len = msg.encoded_len();
        key_len(tag) + encoded_len_varint(len as u64) + len
    }

    #[inline]
    pub fn encoded_len_repeated<M>(tag: u32, messages: &[M]) -> usize
    where
        M: Message,
    {
        key_len(tag) * messages.len()
            + messages
                .iter()
                .map(Message::encoded_len)
                .map(|len| len + encoded_len_varint(len as u64))
                .sum::<usize>()
    }
}

pub mod hash_map {
    use super::*;

    /// Generic protobuf map encode function.
    ///
    /// Each entry is written in the canonical repeated-entry form: a
    /// length-delimited field framing the key (field 1) and the value
    /// (field 2), with default-valued halves omitted.
    pub fn encode<K, V, B, KE, KL, VE, VL>(
        key_encode: KE,
        key_encoded_len: KL,
        val_encode: VE,
        val_encoded_len: VL,
        tag: u32,
        values: &HashMap<K, V>,
        buf: &mut B,
    ) where
        K: Default + Eq + Hash + PartialEq,
        V: Default + PartialEq,
        B: BufMut,
        KE: Fn(u32, &K, &mut B),
        KL: Fn(u32, &K) -> usize,
        VE: Fn(u32, &V, &mut B),
        VL: Fn(u32, &V) -> usize,
    {
        for (key, val) in values.iter() {
            let skip_key = key == &K::default();
            let skip_val = val == &V::default();

            let len = (if skip_key { 0 } else { key_encoded_len(1, key) })
                + (if skip_val { 0 } else { val_encoded_len(2, val) });

            encode_key(tag, WireType::LengthDelimited, buf);
            encode_varint(len as u64, buf);
            if !skip_key {
                key_encode(1, key, buf);
            }
            if !skip_val {
                val_encode(2, val, buf);
            }
        }
    }

    /// Generic protobuf map merge function.
    ///
    /// Reads one entry message and stores it under its key, so repeated
    /// entries with the same key take the last value regardless of wire
    /// order.
    pub fn merge<K, V, B, KM, VM>(
        key_merge: KM,
        val_merge: VM,
        values: &mut HashMap<K, V>,
        buf: &mut B,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError>
    where
        K: Default + Eq + Hash,
        V: Default,
        B: Buf,
        KM: Fn(WireType, &mut K, &mut B, DecodeContext) -> Result<(), DecodeError>,
        VM: Fn(WireType, &mut V, &mut B, DecodeContext) -> Result<(), DecodeError>,
    {
        let mut entry = (K::default(), V::default());
        ctx.limit_reached()?;
        merge_loop(&mut entry, buf, ctx.enter_recursion(), |entry, buf, ctx| {
            let (tag, wire_type) = decode_key(buf)?;
            match tag {
                1 => key_merge(wire_type, &mut entry.0, buf, ctx),
                2 => val_merge(wire_type, &mut entry.1, buf, ctx),
                _ => skip_field(wire_type, buf, ctx),
            }
        })?;
        let (key, val) = entry;
        values.insert(key, val);

        Ok(())
    }

    /// Generic protobuf map encoded-length function.
    pub fn encoded_len<K, V, KL, VL>(
        key_encoded_len: KL,
        val_encoded_len: VL,
        tag: u32,
        values: &HashMap<K, V>,
    ) -> usize
    where
        K: Default + Eq + Hash + PartialEq,
        V: Default + PartialEq,
        KL: Fn(u32, &K) -> usize,
        VL: Fn(u32, &V) -> usize,
    {
        key_len(tag) * values.len()
            + values
                .iter()
                .map(|(key, val)| {
                    let len = (if key == &K::default() {
                        0
                    } else {
                        key_encoded_len(1, key)
                    }) + (if val == &V::default() {
                        0
                    } else {
                        val_encoded_len(2, val)
                    });
                    encoded_len_varint(len as u64) + len
                })
                .sum::<usize>()
    }
}

#[cfg(test)]
mod test {
    use std::fmt::Debug;

    use ::bytes::Bytes;
    use proptest::{prelude::*, test_runner::TestCaseResult};

    use super::*;

    pub fn check_type<T>(
        value: T,
        tag: u32,
        wire_type: WireType,
        encode: impl Fn(u32, &T, &mut Vec<u8>),
        merge: impl Fn(WireType, &mut T, &mut Bytes, DecodeContext) -> Result<(), DecodeError>,
        encoded_len: impl Fn(u32, &T) -> usize,
    ) -> TestCaseResult
    where
        T: Debug + Default + PartialEq,
    {
        prop_assume!((MIN_TAG..=MAX_TAG).contains(&tag));

        let expected_len = encoded_len(tag, &value);

        let mut buf = Vec::with_capacity(expected_len);
        encode(tag, &value, &mut buf);

        prop_assert_eq!(
            buf.len(),
            expected_len,
            "encoded_len wrong; expected: {}, actual: {}",
            expected_len,
            buf.len()
        );

        let mut buf = Bytes::from(buf);
        if !buf.has_remaining() {
            // Short circuit for empty packed values.
            return Ok(());
        }

        let (decoded_tag, decoded_wire_type) =
            decode_key(&mut buf).map_err(|error| TestCaseError::fail(error.to_string()))?;
        prop_assert_eq!(tag, decoded_tag);
        prop_assert_eq!(wire_type, decoded_wire_type);

        let mut roundtrip_value = T::default();
        merge(
            wire_type,
            &mut roundtrip_value,
            &mut buf,
            DecodeContext::default(),
        )
        .map_err(|error| TestCaseError::fail(error.to_string()))?;

        prop_assert!(
            !buf.has_remaining(),
            "expected buffer to be empty, remaining: {}",
            buf.remaining()
        );

        prop_assert_eq!(value, roundtrip_value);

        Ok(())
    }

    pub fn check_collection_type<T>(
        value: T,
        tag: u32,
        wire_type: WireType,
        encode: impl Fn(u32, &T, &mut Vec<u8>),
        merge: impl Fn(WireType, &mut T, &mut Bytes, DecodeContext) -> Result<(), DecodeError>,
        encoded_len: impl Fn(u32, &T) -> usize,
    ) -> TestCaseResult
    where
        T: Debug + Default + PartialEq,
    {
        prop_assume!((MIN_TAG..=MAX_TAG).contains(&tag));

        let expected_len = encoded_len(tag, &value);

        let mut buf = Vec::with_capacity(expected_len);
        encode(tag, &value, &mut buf);

        prop_assert_eq!(
            buf.len(),
            expected_len,
            "encoded_len wrong; expected: {}, actual: {}",
            expected_len,
            buf.len()
        );

        let mut buf = Bytes::from(buf);
        let mut roundtrip_value = T::default();
        while buf.has_remaining() {
            let (decoded_tag, decoded_wire_type) =
                decode_key(&mut buf).map_err(|error| TestCaseError::fail(error.to_string()))?;

            prop_assert_eq!(tag, decoded_tag);
            prop_assert_eq!(wire_type, decoded_wire_type);

            merge(
                wire_type,
                &mut roundtrip_value,
                &mut buf,
                DecodeContext::default(),
            )
            .map_err(|error| TestCaseError::fail(error.to_string()))?;
        }

        prop_assert_eq!(value, roundtrip_value);

        Ok(())
    }

    #[test]
    fn string_merge_invalid_utf8() {
        let mut s = String::new();
        let buf = b"\x02\x80\x80";

        let r = string::merge(
            WireType::LengthDelimited,
            &mut s,
            &mut &buf[..],
            DecodeContext::default(),
        );
        r.expect_err("must be an error");
        assert!(s.is_empty());
    }

    #[test]
    fn string_merge_multibyte() {
        fn roundtrip(text: &str) {
            let mut buf = Vec::new();
            string::encode(1, &text.to_string(), &mut buf);
            let mut slice = buf.as_slice();
            let (tag, wire_type) = decode_key(&mut slice).unwrap();
            assert_eq!(tag, 1);
            let mut decoded = String::new();
            string::merge(wire_type, &mut decoded, &mut slice, DecodeContext::default()).unwrap();
            assert_eq!(decoded, text);
        }

        roundtrip("");
        roundtrip("hi");
        roundtrip("\u{00e9}\u{4e16}\u{754c}");
        // Astral-plane codepoints exercise 4-byte sequences.
        roundtrip("\u{1f600}\u{10348}");
    }

    #[test]
    fn skip_field_consumes_exactly_one_field() {
        let mut buf = Vec::new();
        int32::encode(1, &150, &mut buf);
        string::encode(2, &"hi".to_string(), &mut buf);
        fixed64::encode(3, &1, &mut buf);
        float::encode(4, &1.5, &mut buf);

        let mut slice = buf.as_slice();
        while slice.has_remaining() {
            let (_, wire_type) = decode_key(&mut slice).unwrap();
            skip_field(wire_type, &mut slice, DecodeContext::default()).unwrap();
        }
        assert!(!slice.has_remaining());
    }

    #[test]
    fn skip_field_rejects_groups() {
        let mut buf = Vec::new();
        encode_key(1, WireType::StartGroup, &mut buf);
        let mut slice = buf.as_slice();
        let (_, wire_type) = decode_key(&mut slice).unwrap();
        skip_field(wire_type, &mut slice, DecodeContext::default())
            .expect_err("groups are unsupported");
    }

    #[test]
    fn zero_tag_is_rejected() {
        let mut buf = Vec::new();
        encode_varint(0, &mut buf);
        decode_key(&mut buf.as_slice()).expect_err("tag zero must not decode");
    }

    #[test]
    fn repeated_accepts_packed_and_unpacked() {
        // Packed: a single length-delimited field.
        let packed: &[u8] = &[0x0A, 0x03, 0x01, 0x02, 0x03];
        let mut slice = packed;
        let mut values = Vec::new();
        while slice.has_remaining() {
            let (tag, wire_type) = decode_key(&mut slice).unwrap();
            assert_eq!(tag, 1);
            int32::merge_repeated(wire_type, &mut values, &mut slice, DecodeContext::default())
                .unwrap();
        }
        assert_eq!(values, vec![1, 2, 3]);

        // Unpacked: one varint field per element.
        let unpacked: &[u8] = &[0x08, 0x01, 0x08, 0x02, 0x08, 0x03];
        let mut slice = unpacked;
        let mut values = Vec::new();
        while slice.has_remaining() {
            let (tag, wire_type) = decode_key(&mut slice).unwrap();
            assert_eq!(tag, 1);
            int32::merge_repeated(wire_type, &mut values, &mut slice, DecodeContext::default())
                .unwrap();
        }
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn map_entries_merge_in_any_order() {
        let mut expected = HashMap::new();
        expected.insert("a".to_string(), 1i32);
        expected.insert("b".to_string(), 2i32);

        let mut buf = Vec::new();
        hash_map::encode(
            string::encode,
            string::encoded_len,
            int32::encode,
            int32::encoded_len,
            1,
            &expected,
            &mut buf,
        );
        assert_eq!(
            buf.len(),
            hash_map::encoded_len(string::encoded_len, int32::encoded_len, 1, &expected)
        );

        let mut slice = buf.as_slice();
        let mut decoded = HashMap::new();
        while slice.has_remaining() {
            let (tag, wire_type) = decode_key(&mut slice).unwrap();
            assert_eq!(tag, 1);
            check_wire_type(WireType::LengthDelimited, wire_type).unwrap();
            hash_map::merge(
                string::merge,
                int32::merge,
                &mut decoded,
                &mut slice,
                DecodeContext::default(),
            )
            .unwrap();
        }
        assert_eq!(decoded, expected);
    }

    #[test]
    fn map_entry_with_default_halves() {
        // An empty entry decodes to (default key, default value).
        let wire: &[u8] = &[0x0A, 0x00];
        let mut slice = wire;
        let mut decoded: HashMap<String, i32> = HashMap::new();
        let (tag, wire_type) = decode_key(&mut slice).unwrap();
        assert_eq!(tag, 1);
        check_wire_type(WireType::LengthDelimited, wire_type).unwrap();
        hash_map::merge(
            string::merge,
            int32::merge,
            &mut decoded,
            &mut slice,
            DecodeContext::default(),
        )
        .unwrap();
        assert_eq!(decoded.get(""), Some(&0));
    }
}
