use std::borrow::Cow;

/// The largest field number a tag may carry.
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// The low three bits of every tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Varint     = 0,
    Fixed64    = 1,
    Bytes      = 2,
    StartGroup = 3,
    EndGroup   = 4,
    Fixed32    = 5,
}

impl WireType {
    /// Maps the low bits of a tag to a wire type. Returns `None` for the
    /// unassigned values 6 and 7.
    pub fn from_u64(value: u64) -> Option<WireType> {
        match value {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::Bytes),
            3 => Some(WireType::StartGroup),
            4 => Some(WireType::EndGroup),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }
}

/// Decodes a varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed. A consumed count of
/// zero means the input was truncated, longer than ten bytes, or overflowed
/// 64 bits.
pub fn consume_varint(buf: &[u8]) -> (u64, usize) {
    let mut result: u64 = 0;

    for (i, &byte) in buf.iter().take(10).enumerate() {
        // The tenth byte may only contribute the top bit.
        if i == 9 && byte > 1 {
            return (0, 0);
        }
        result |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return (result, i + 1);
        }
    }

    (0, 0)
}

/// Decodes a field tag from the front of `buf`.
///
/// A consumed count of zero means the tag was truncated, carried field
/// number zero (or one above [`MAX_FIELD_NUMBER`]), or used wire type 6/7.
pub fn consume_tag(buf: &[u8]) -> (u32, WireType, usize) {
    let (tag, n) = consume_varint(buf);
    if n == 0 {
        return (0, WireType::Varint, 0);
    }

    let number = tag >> 3;
    if number == 0 || number > u64::from(MAX_FIELD_NUMBER) {
        return (0, WireType::Varint, 0);
    }

    match WireType::from_u64(tag & 7) {
        Some(wire_type) => (number as u32, wire_type, n),
        None => (0, WireType::Varint, 0),
    }
}

/// Decodes a little-endian 32-bit value from the front of `buf`.
pub fn consume_fixed32(buf: &[u8]) -> (u32, usize) {
    if buf.len() < 4 {
        return (0, 0);
    }
    (u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]), 4)
}

/// Decodes a little-endian 64-bit value from the front of `buf`.
pub fn consume_fixed64(buf: &[u8]) -> (u64, usize) {
    if buf.len() < 8 {
        return (0, 0);
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[..8]);
    (u64::from_le_bytes(bytes), 8)
}

/// Decodes a length-delimited run from the front of `buf`. The returned
/// slice aliases `buf`.
pub fn consume_bytes(buf: &[u8]) -> (&[u8], usize) {
    let (len, n) = consume_varint(buf);
    if n == 0 {
        return (&[], 0);
    }

    let rest = &buf[n..];
    if len > rest.len() as u64 {
        return (&[], 0);
    }

    let len = len as usize;
    (&rest[..len], n + len)
}

/// Decodes the body of a group whose start tag (for field `number`) has
/// already been consumed. The returned slice excludes the end tag but the
/// consumed count includes it.
pub fn consume_group(number: u32, buf: &[u8]) -> (&[u8], usize) {
    let mut offset = 0;

    loop {
        let (field_number, wire_type, n) = consume_tag(&buf[offset..]);
        if n == 0 {
            return (&[], 0);
        }

        if wire_type == WireType::EndGroup {
            if field_number != number {
                return (&[], 0);
            }
            return (&buf[..offset], offset + n);
        }

        let m = consume_field_value(field_number, wire_type, &buf[offset + n..]);
        if m == 0 {
            return (&[], 0);
        }
        offset += n + m;
    }
}

/// Returns the length of the value that follows a tag, or zero if the
/// value is malformed. This is how unknown fields are skipped.
pub fn consume_field_value(number: u32, wire_type: WireType, buf: &[u8]) -> usize {
    match wire_type {
        WireType::Varint => consume_varint(buf).1,
        WireType::Fixed32 => consume_fixed32(buf).1,
        WireType::Fixed64 => consume_fixed64(buf).1,
        WireType::Bytes => consume_bytes(buf).1,
        WireType::StartGroup => consume_group(number, buf).1,
        WireType::EndGroup => 0,
    }
}

/// One field value, shaped by its wire type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Varint(u64),
    Fixed32(u32),
    Fixed64(u64),
    Bytes(&'a [u8]),
    Group(&'a [u8]),
}

impl FieldValue<'_> {
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldValue::Varint(_) => WireType::Varint,
            FieldValue::Fixed32(_) => WireType::Fixed32,
            FieldValue::Fixed64(_) => WireType::Fixed64,
            FieldValue::Bytes(_) => WireType::Bytes,
            FieldValue::Group(_) => WireType::StartGroup,
        }
    }
}

/// A protobuf byte buffer meant for reading.
///
/// Example usage:
///
/// ```
/// use std::borrow::Cow;
/// use protodesc_wire::WireType;
///
/// let mut bb = protodesc_wire::ByteBuffer::new(&[10, 3, 102, 111, 111, 24, 150, 1]);
/// assert_eq!(bb.read_tag(), Ok((1, WireType::Bytes)));
/// assert_eq!(bb.read_string(), Ok(Cow::Borrowed("foo")));
/// assert_eq!(bb.read_tag(), Ok((3, WireType::Varint)));
/// assert_eq!(bb.read_varint(), Ok(150));
/// ```
///
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Reads `data` from the start. Strings and bytes are borrowed from it.
    pub fn new(data: &'a [u8]) -> ByteBuffer<'a> {
        ByteBuffer { data, index: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Read position; `data().len()` once the buffer is exhausted.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns true once every byte has been read.
    pub fn is_empty(&self) -> bool {
        self.index >= self.data.len()
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.index..]
    }

    fn advance(&mut self, n: usize) -> Result<(), ()> {
        if n == 0 {
            Err(())
        } else {
            self.index += n;
            Ok(())
        }
    }

    /// Try to read a varint starting at the current index.
    pub fn read_varint(&mut self) -> Result<u64, ()> {
        let (value, n) = consume_varint(self.rest());
        self.advance(n)?;
        Ok(value)
    }

    /// Try to read a field tag starting at the current index.
    pub fn read_tag(&mut self) -> Result<(u32, WireType), ()> {
        let (number, wire_type, n) = consume_tag(self.rest());
        self.advance(n)?;
        Ok((number, wire_type))
    }

    /// Try to read a varint-encoded bool. Any non-zero value is true.
    pub fn read_bool(&mut self) -> Result<bool, ()> {
        Ok(self.read_varint()? != 0)
    }

    /// Try to read a varint-encoded `int32`. Negative values are
    /// sign-extended to ten bytes on the wire and truncated back here.
    pub fn read_int32(&mut self) -> Result<i32, ()> {
        Ok(self.read_varint()? as i32)
    }

    /// Try to read a little-endian 32-bit value.
    pub fn read_fixed32(&mut self) -> Result<u32, ()> {
        let (value, n) = consume_fixed32(self.rest());
        self.advance(n)?;
        Ok(value)
    }

    /// Try to read a little-endian 64-bit value.
    pub fn read_fixed64(&mut self) -> Result<u64, ()> {
        let (value, n) = consume_fixed64(self.rest());
        self.advance(n)?;
        Ok(value)
    }

    /// Try to read a length-delimited byte run. The slice aliases the
    /// underlying memory.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], ()> {
        let (value, n) = consume_bytes(self.rest());
        self.advance(n)?;
        Ok(value)
    }

    /// Try to read a length-delimited UTF-8 string. Valid strings are
    /// returned as a slice so they just alias the underlying memory.
    pub fn read_string(&mut self) -> Result<Cow<'a, str>, ()> {
        Ok(String::from_utf8_lossy(self.read_bytes()?))
    }

    /// Skips the value belonging to a tag that was just read.
    pub fn skip(&mut self, number: u32, wire_type: WireType) -> Result<(), ()> {
        let n = consume_field_value(number, wire_type, self.rest());
        self.advance(n)
    }

    /// Try to read one whole field: its tag and the value that follows.
    pub fn read_field(&mut self) -> Result<(u32, FieldValue<'a>), ()> {
        let (number, wire_type) = self.read_tag()?;
        let value = match wire_type {
            WireType::Varint => FieldValue::Varint(self.read_varint()?),
            WireType::Fixed32 => FieldValue::Fixed32(self.read_fixed32()?),
            WireType::Fixed64 => FieldValue::Fixed64(self.read_fixed64()?),
            WireType::Bytes => FieldValue::Bytes(self.read_bytes()?),
            WireType::StartGroup => {
                let (body, n) = consume_group(number, self.rest());
                self.advance(n)?;
                FieldValue::Group(body)
            }
            WireType::EndGroup => return Err(()),
        };
        Ok((number, value))
    }

    /// Iterates the remaining fields. Each item carries the byte offset of
    /// the field's tag, its number and its value.
    pub fn fields(self) -> FieldIter<'a> {
        FieldIter { bb: self, failed: false }
    }
}

/// Iterator over the fields of an encoded message body.
///
/// After the first malformed field it yields one `Err(())` and stops.
pub struct FieldIter<'a> {
    bb: ByteBuffer<'a>,
    failed: bool,
}

impl<'a> FieldIter<'a> {
    pub fn new(data: &'a [u8]) -> FieldIter<'a> {
        ByteBuffer::new(data).fields()
    }
}

impl<'a> Iterator for FieldIter<'a> {
    type Item = Result<(usize, u32, FieldValue<'a>), ()>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.bb.is_empty() {
            return None;
        }

        let offset = self.bb.index();
        let item = self.bb.read_field().map(|(number, value)| (offset, number, value));
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

#[test]
fn read_varint() {
    let read = |bytes| ByteBuffer::new(bytes).read_varint();
    assert_eq!(read(&[]), Err(()));
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[1]), Ok(1));
    assert_eq!(read(&[127]), Ok(127));
    assert_eq!(read(&[128]), Err(()));
    assert_eq!(read(&[128, 1]), Ok(128));
    assert_eq!(read(&[150, 1]), Ok(150));
    assert_eq!(read(&[255, 255, 3]), Ok(65535));
    assert_eq!(read(&[255, 255, 255, 255, 15]), Ok(4294967295));
    assert_eq!(
        read(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]),
        Ok(u64::MAX)
    );
    assert_eq!(
        read(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x02]),
        Err(())
    );
    assert_eq!(
        read(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x00]),
        Err(())
    );
}

#[test]
fn consume_varint_reports_length() {
    assert_eq!(consume_varint(&[0]), (0, 1));
    assert_eq!(consume_varint(&[150, 1, 7]), (150, 2));
    assert_eq!(consume_varint(&[150]), (0, 0));
}

#[test]
fn read_tag() {
    let read = |bytes| ByteBuffer::new(bytes).read_tag();
    assert_eq!(read(&[]), Err(()));
    assert_eq!(read(&[8]), Ok((1, WireType::Varint)));
    assert_eq!(read(&[10]), Ok((1, WireType::Bytes)));
    assert_eq!(read(&[13]), Ok((1, WireType::Fixed32)));
    assert_eq!(read(&[17]), Ok((2, WireType::Fixed64)));
    assert_eq!(read(&[0x98, 0x01]), Ok((19, WireType::Varint)));
    // field number zero
    assert_eq!(read(&[2]), Err(()));
    // wire types 6 and 7
    assert_eq!(read(&[14]), Err(()));
    assert_eq!(read(&[15]), Err(()));
    assert_eq!(read(&[0xF8, 0xFF, 0xFF, 0xFF, 0x0F]), Ok((MAX_FIELD_NUMBER, WireType::Varint)));
    assert_eq!(read(&[0x80, 0x80, 0x80, 0x80, 0x10]), Err(()));
}

#[test]
fn read_fixed() {
    assert_eq!(ByteBuffer::new(&[1, 0, 0]).read_fixed32(), Err(()));
    assert_eq!(ByteBuffer::new(&[1, 2, 0, 0]).read_fixed32(), Ok(0x0201));
    assert_eq!(ByteBuffer::new(&[1, 0, 0, 0, 0, 0, 0]).read_fixed64(), Err(()));
    assert_eq!(
        ByteBuffer::new(&[0, 0, 0, 0, 0, 0, 0, 0x80]).read_fixed64(),
        Ok(0x8000_0000_0000_0000)
    );
}

#[test]
fn read_bytes() {
    let read = |bytes| ByteBuffer::new(bytes).read_bytes();
    assert_eq!(read(&[]), Err(()));
    assert_eq!(read(&[0]), Ok(vec![].as_slice()));
    assert_eq!(read(&[1]), Err(()));
    assert_eq!(read(&[1, 7]), Ok(vec![7].as_slice()));
    assert_eq!(read(&[3, 7, 8]), Err(()));

    let mut bb = ByteBuffer::new(&[2, 1, 2, 1, 3]);
    assert_eq!(bb.read_bytes(), Ok(vec![1, 2].as_slice()));
    assert_eq!(bb.read_bytes(), Ok(vec![3].as_slice()));
    assert_eq!(bb.read_bytes(), Err(()));
    assert!(bb.is_empty());
}

#[test]
fn read_string() {
    let read = |bytes| ByteBuffer::new(bytes).read_string();
    assert_eq!(read(&[]), Err(()));
    assert_eq!(read(&[0]), Ok(Cow::Borrowed("")));
    assert_eq!(read(&[1, 97]), Ok(Cow::Borrowed("a")));
    assert_eq!(read(&[4, 240, 159, 141, 149]), Ok(Cow::Borrowed("🍕")));
    assert_eq!(
        read(&[3, 97, 237, 99]),
        Ok(Cow::Owned("a\u{FFFD}c".to_owned()))
    );
}

#[test]
fn read_int32() {
    let read = |bytes| ByteBuffer::new(bytes).read_int32();
    assert_eq!(read(&[1]), Ok(1));
    assert_eq!(
        read(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]),
        Ok(-1)
    );
}

#[test]
fn skip_values() {
    // varint, fixed32, bytes and a group holding one varint
    let data = [
        8, 150, 1, //
        21, 1, 2, 3, 4, //
        26, 2, 9, 9, //
        35, 8, 1, 36, //
        40, 5,
    ];
    let mut bb = ByteBuffer::new(&data);
    let mut seen = vec![];
    while !bb.is_empty() {
        let (number, wire_type) = bb.read_tag().unwrap();
        seen.push(number);
        bb.skip(number, wire_type).unwrap();
    }
    assert_eq!(seen, [1, 2, 3, 4, 5]);
}

#[test]
fn skip_rejects_mismatched_group() {
    // group 4 closed by an end tag for field 5
    let mut bb = ByteBuffer::new(&[35, 8, 1, 44]);
    let (number, wire_type) = bb.read_tag().unwrap();
    assert_eq!(bb.skip(number, wire_type), Err(()));
}

#[test]
fn field_iter() {
    let data = [10, 1, 120, 16, 7, 35, 8, 1, 36];
    let fields: Vec<_> = FieldIter::new(&data).collect();
    assert_eq!(
        fields,
        vec![
            Ok((0, 1, FieldValue::Bytes(b"x"))),
            Ok((3, 2, FieldValue::Varint(7))),
            Ok((5, 4, FieldValue::Group(&[8, 1]))),
        ]
    );

    let fields: Vec<_> = FieldIter::new(&[10, 5, 1]).collect();
    assert_eq!(fields, vec![Err(())]);
}

/// A protobuf byte buffer meant for writing.
///
/// Example usage:
///
/// ```
/// use protodesc_wire::WireType;
///
/// let mut bb = protodesc_wire::ByteBufferMut::new();
/// bb.write_tag(1, WireType::Bytes);
/// bb.write_string("foo");
/// bb.write_tag(3, WireType::Varint);
/// bb.write_varint(150);
/// assert_eq!(bb.data(), [10, 3, 102, 111, 111, 24, 150, 1]);
/// ```
///
#[derive(Debug, Default, Clone)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// The encoded bytes.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a varint to the end of the buffer.
    pub fn write_varint(&mut self, mut value: u64) {
        loop {
            let byte = value as u8 & 127;
            value >>= 7;

            if value == 0 {
                self.data.push(byte);
                return;
            }

            self.data.push(byte | 128);
        }
    }

    /// Write a field tag to the end of the buffer.
    pub fn write_tag(&mut self, number: u32, wire_type: WireType) {
        self.write_varint((u64::from(number) << 3) | wire_type as u64);
    }

    /// Write a bool as a single-byte varint.
    pub fn write_bool(&mut self, value: bool) {
        self.data.push(if value { 1 } else { 0 });
    }

    /// Write an `int32`. Negative values take ten bytes.
    pub fn write_int32(&mut self, value: i32) {
        self.write_varint(i64::from(value) as u64);
    }

    pub fn write_fixed32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a length-delimited byte run.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.write_varint(value.len() as u64);
        self.data.extend_from_slice(value);
    }

    /// Write a length-delimited UTF-8 string.
    pub fn write_string(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    /// Append bytes verbatim, without a length prefix.
    pub fn write_raw(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    pub fn write_varint_field(&mut self, number: u32, value: u64) {
        self.write_tag(number, WireType::Varint);
        self.write_varint(value);
    }

    pub fn write_int32_field(&mut self, number: u32, value: i32) {
        self.write_tag(number, WireType::Varint);
        self.write_int32(value);
    }

    pub fn write_bool_field(&mut self, number: u32, value: bool) {
        self.write_tag(number, WireType::Varint);
        self.write_bool(value);
    }

    pub fn write_bytes_field(&mut self, number: u32, value: &[u8]) {
        self.write_tag(number, WireType::Bytes);
        self.write_bytes(value);
    }

    pub fn write_string_field(&mut self, number: u32, value: &str) {
        self.write_bytes_field(number, value.as_bytes());
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut)) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb);
    bb.data()
}

#[test]
fn write_varint() {
    assert_eq!(write_once(|bb| bb.write_varint(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_varint(1)), [1]);
    assert_eq!(write_once(|bb| bb.write_varint(127)), [127]);
    assert_eq!(write_once(|bb| bb.write_varint(128)), [128, 1]);
    assert_eq!(write_once(|bb| bb.write_varint(150)), [150, 1]);
    assert_eq!(
        write_once(|bb| bb.write_varint(u64::MAX)),
        [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
    );
}

#[test]
fn write_int32() {
    assert_eq!(write_once(|bb| bb.write_int32(3)), [3]);
    assert_eq!(
        write_once(|bb| bb.write_int32(-1)),
        [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
    );
}

#[test]
fn write_fields() {
    assert_eq!(write_once(|bb| bb.write_string_field(1, "foo")), [10, 3, 102, 111, 111]);
    assert_eq!(write_once(|bb| bb.write_bool_field(7, true)), [56, 1]);
    assert_eq!(write_once(|bb| bb.write_int32_field(3, 150)), [24, 150, 1]);
    assert_eq!(write_once(|bb| bb.write_bytes_field(2, &[])), [18, 0]);
    assert_eq!(write_once(|bb| bb.write_fixed32(1)), [1, 0, 0, 0]);
}

#[test]
fn write_then_read_sequence() {
    let mut bb = ByteBufferMut::new();
    bb.write_string_field(1, "🍕");
    bb.write_int32_field(3, -2);
    bb.write_tag(4, WireType::Fixed64);
    bb.write_fixed64(9);
    let data = bb.data();

    let mut bb = ByteBuffer::new(&data);
    assert_eq!(bb.read_tag(), Ok((1, WireType::Bytes)));
    assert_eq!(bb.read_string(), Ok(Cow::Borrowed("🍕")));
    assert_eq!(bb.read_tag(), Ok((3, WireType::Varint)));
    assert_eq!(bb.read_int32(), Ok(-2));
    assert_eq!(bb.read_tag(), Ok((4, WireType::Fixed64)));
    assert_eq!(bb.read_fixed64(), Ok(9));
    assert!(bb.is_empty());
}
