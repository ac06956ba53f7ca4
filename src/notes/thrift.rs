//! Minimal Thrift binary protocol (strict, version 1) codec for note-store calls.

// self
use crate::{_prelude::*, notes::NoteStoreError};

const VERSION_1: u32 = 0x8001_0000;
const VERSION_MASK: u32 = 0xffff_0000;
const MAX_DEPTH: usize = 64;

/// Thrift wire types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TType {
	/// End of a struct's field list.
	Stop = 0,
	/// `bool`.
	Bool = 2,
	/// `byte`.
	Byte = 3,
	/// `double`.
	Double = 4,
	/// `i16`.
	I16 = 6,
	/// `i32`.
	I32 = 8,
	/// `i64`.
	I64 = 10,
	/// `string` / `binary`.
	String = 11,
	/// `struct`.
	Struct = 12,
	/// `map`.
	Map = 13,
	/// `set`.
	Set = 14,
	/// `list`.
	List = 15,
}
impl TryFrom<u8> for TType {
	type Error = NoteStoreError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		Ok(match value {
			0 => TType::Stop,
			2 => TType::Bool,
			3 => TType::Byte,
			4 => TType::Double,
			6 => TType::I16,
			8 => TType::I32,
			10 => TType::I64,
			11 => TType::String,
			12 => TType::Struct,
			13 => TType::Map,
			14 => TType::Set,
			15 => TType::List,
			other => return Err(NoteStoreError::protocol(format!("unknown field type {other}"))),
		})
	}
}

/// Thrift message kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
	/// Request.
	Call = 1,
	/// Normal reply.
	Reply = 2,
	/// `TApplicationException` reply.
	Exception = 3,
	/// One-way request.
	Oneway = 4,
}
impl TryFrom<u8> for MessageType {
	type Error = NoteStoreError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		Ok(match value {
			1 => MessageType::Call,
			2 => MessageType::Reply,
			3 => MessageType::Exception,
			4 => MessageType::Oneway,
			other => return Err(NoteStoreError::protocol(format!("unknown message type {other}"))),
		})
	}
}

/// Decoded message envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageHeader {
	/// Method name.
	pub name: String,
	/// Message kind.
	pub kind: MessageType,
	/// Sequence id echoed from the call.
	pub seq_id: i32,
}

/// Append-only encoder.
#[derive(Clone, Debug, Default)]
pub struct ThriftWriter {
	buf: Vec<u8>,
}
impl ThriftWriter {
	/// Creates an empty writer.
	pub fn new() -> Self {
		Self::default()
	}

	/// Strict message envelope.
	pub fn message_begin(&mut self, name: &str, kind: MessageType, seq_id: i32) -> &mut Self {
		self.write_u32(VERSION_1 | kind as u32);
		self.string(name);
		self.i32(seq_id)
	}

	/// Field header.
	pub fn field_begin(&mut self, ttype: TType, id: i16) -> &mut Self {
		self.buf.push(ttype as u8);
		self.buf.extend_from_slice(&id.to_be_bytes());

		self
	}

	/// Terminates the current struct.
	pub fn field_stop(&mut self) -> &mut Self {
		self.buf.push(TType::Stop as u8);

		self
	}

	/// List (or set) header.
	pub fn list_begin(&mut self, elem: TType, size: i32) -> &mut Self {
		self.buf.push(elem as u8);
		self.i32(size)
	}

	/// `bool`.
	pub fn bool(&mut self, value: bool) -> &mut Self {
		self.buf.push(u8::from(value));

		self
	}

	/// `i32`.
	pub fn i32(&mut self, value: i32) -> &mut Self {
		self.buf.extend_from_slice(&value.to_be_bytes());

		self
	}

	/// `i64`.
	pub fn i64(&mut self, value: i64) -> &mut Self {
		self.buf.extend_from_slice(&value.to_be_bytes());

		self
	}

	/// Length-prefixed UTF-8 string.
	pub fn string(&mut self, value: &str) -> &mut Self {
		self.i32(value.len() as i32);
		self.buf.extend_from_slice(value.as_bytes());

		self
	}

	/// String field shorthand.
	pub fn string_field(&mut self, id: i16, value: &str) -> &mut Self {
		self.field_begin(TType::String, id).string(value)
	}

	/// `i32` field shorthand.
	pub fn i32_field(&mut self, id: i16, value: i32) -> &mut Self {
		self.field_begin(TType::I32, id).i32(value)
	}

	/// `bool` field shorthand.
	pub fn bool_field(&mut self, id: i16, value: bool) -> &mut Self {
		self.field_begin(TType::Bool, id).bool(value)
	}

	/// Finished buffer.
	pub fn into_bytes(self) -> Vec<u8> {
		self.buf
	}

	fn write_u32(&mut self, value: u32) {
		self.buf.extend_from_slice(&value.to_be_bytes());
	}
}

/// Cursor-based decoder over a complete response body.
#[derive(Debug)]
pub struct ThriftReader<'a> {
	buf: &'a [u8],
	pos: usize,
}
impl<'a> ThriftReader<'a> {
	/// Starts reading at the beginning of `buf`.
	pub fn new(buf: &'a [u8]) -> Self {
		Self { buf, pos: 0 }
	}

	/// Reads a strict or legacy (unversioned) message envelope.
	pub fn message_begin(&mut self) -> Result<MessageHeader, NoteStoreError> {
		let first = self.i32()?;

		if first < 0 {
			let raw = first as u32;

			if raw & VERSION_MASK != VERSION_1 {
				return Err(NoteStoreError::protocol(format!("bad protocol version {raw:#x}")));
			}

			let kind = MessageType::try_from((raw & 0xff) as u8)?;
			let name = self.string()?;
			let seq_id = self.i32()?;

			Ok(MessageHeader { name, kind, seq_id })
		} else {
			let name = self.utf8(first)?;
			let kind = MessageType::try_from(self.byte()?)?;
			let seq_id = self.i32()?;

			Ok(MessageHeader { name, kind, seq_id })
		}
	}

	/// Next field header, or `None` at the struct's stop marker.
	pub fn field_begin(&mut self) -> Result<Option<(TType, i16)>, NoteStoreError> {
		let ttype = TType::try_from(self.byte()?)?;

		if ttype == TType::Stop {
			return Ok(None);
		}

		let id = i16::from_be_bytes(self.array()?);

		Ok(Some((ttype, id)))
	}

	/// List (or set) header: element type and size.
	pub fn list_begin(&mut self) -> Result<(TType, usize), NoteStoreError> {
		let elem = TType::try_from(self.byte()?)?;
		let size = self.i32()?;
		let size = usize::try_from(size)
			.map_err(|_| NoteStoreError::protocol(format!("negative collection size {size}")))?;

		Ok((elem, size))
	}

	/// `bool`.
	pub fn bool(&mut self) -> Result<bool, NoteStoreError> {
		Ok(self.byte()? != 0)
	}

	/// `byte`.
	pub fn byte(&mut self) -> Result<u8, NoteStoreError> {
		let [b] = self.array::<1>()?;

		Ok(b)
	}

	/// `i32`.
	pub fn i32(&mut self) -> Result<i32, NoteStoreError> {
		Ok(i32::from_be_bytes(self.array()?))
	}

	/// `i64`.
	pub fn i64(&mut self) -> Result<i64, NoteStoreError> {
		Ok(i64::from_be_bytes(self.array()?))
	}

	/// Length-prefixed UTF-8 string.
	pub fn string(&mut self) -> Result<String, NoteStoreError> {
		let len = self.i32()?;

		self.utf8(len)
	}

	/// Reads a value of type `ttype` and discards it.
	pub fn skip(&mut self, ttype: TType) -> Result<(), NoteStoreError> {
		self.skip_depth(ttype, 0)
	}

	/// Returns `false`, after skipping the value, when a field has an unexpected wire type.
	pub fn expect_type(&mut self, actual: TType, expected: TType) -> Result<bool, NoteStoreError> {
		if actual == expected {
			return Ok(true);
		}

		self.skip(actual)?;

		Ok(false)
	}

	fn skip_depth(&mut self, ttype: TType, depth: usize) -> Result<(), NoteStoreError> {
		if depth > MAX_DEPTH {
			return Err(NoteStoreError::protocol("nesting too deep"));
		}

		match ttype {
			TType::Stop => {},
			TType::Bool | TType::Byte => self.advance(1)?,
			TType::I16 => self.advance(2)?,
			TType::I32 => self.advance(4)?,
			TType::Double | TType::I64 => self.advance(8)?,
			TType::String => {
				let len = self.i32()?;

				self.advance(self.length(len)?)?;
			},
			TType::Struct =>
				while let Some((field, _)) = self.field_begin()? {
					self.skip_depth(field, depth + 1)?;
				},
			TType::Map => {
				let key = TType::try_from(self.byte()?)?;
				let value = TType::try_from(self.byte()?)?;
				let size = self.i32()?;

				for _ in 0..self.length(size)? {
					self.skip_depth(key, depth + 1)?;
					self.skip_depth(value, depth + 1)?;
				}
			},
			TType::Set | TType::List => {
				let (elem, size) = self.list_begin()?;

				for _ in 0..size {
					self.skip_depth(elem, depth + 1)?;
				}
			},
		}

		Ok(())
	}

	fn utf8(&mut self, len: i32) -> Result<String, NoteStoreError> {
		let len = self.length(len)?;
		let bytes = self.take(len)?;

		String::from_utf8(bytes.to_vec())
			.map_err(|_| NoteStoreError::protocol("string is not valid UTF-8"))
	}

	fn length(&self, len: i32) -> Result<usize, NoteStoreError> {
		usize::try_from(len).map_err(|_| NoteStoreError::protocol(format!("negative length {len}")))
	}

	fn array<const N: usize>(&mut self) -> Result<[u8; N], NoteStoreError> {
		let mut out = [0_u8; N];

		out.copy_from_slice(self.take(N)?);

		Ok(out)
	}

	fn advance(&mut self, len: usize) -> Result<(), NoteStoreError> {
		self.take(len).map(|_| ())
	}

	fn take(&mut self, len: usize) -> Result<&'a [u8], NoteStoreError> {
		let end = self
			.pos
			.checked_add(len)
			.filter(|end| *end <= self.buf.len())
			.ok_or_else(|| NoteStoreError::protocol("unexpected end of response"))?;
		let buf = self.buf;
		let slice = &buf[self.pos..end];

		self.pos = end;

		Ok(slice)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn strict_envelope_decodes() {
		let mut writer = ThriftWriter::new();

		writer.message_begin("listNotebooks", MessageType::Reply, 7);

		let bytes = writer.into_bytes();

		assert_eq!(&bytes[..4], &[0x80, 0x01, 0x00, 0x02]);

		let header = ThriftReader::new(&bytes).message_begin().expect("Envelope should decode.");

		assert_eq!(
			header,
			MessageHeader { name: "listNotebooks".into(), kind: MessageType::Reply, seq_id: 7 }
		);
	}

	#[test]
	fn unknown_nested_fields_are_skipped() {
		let mut writer = ThriftWriter::new();

		writer
			.field_begin(TType::Map, 9)
			.buf
			.extend_from_slice(&[TType::String as u8, TType::List as u8, 0, 0, 0, 1]);
		writer.string("key").list_begin(TType::I64, 2).i64(1).i64(2);
		writer.field_begin(TType::Struct, 10).string_field(1, "inner").field_stop();
		writer.string_field(1, "guid-1").field_stop();

		let bytes = writer.into_bytes();
		let mut reader = ThriftReader::new(&bytes);
		let mut guid = None;

		while let Some((ttype, id)) = reader.field_begin().expect("Field header should decode.") {
			match (id, ttype) {
				(1, TType::String) => guid = Some(reader.string().expect("String should decode.")),
				(_, other) => reader.skip(other).expect("Unknown field should skip."),
			}
		}

		assert_eq!(guid.as_deref(), Some("guid-1"));
	}

	#[test]
	fn truncated_input_is_a_protocol_error() {
		let err = ThriftReader::new(&[0, 0, 0, 10, b'a']).string().expect_err("Truncated string.");

		assert!(matches!(err, NoteStoreError::Protocol { .. }));
	}
}
