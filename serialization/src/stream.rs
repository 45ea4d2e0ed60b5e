use byteorder::{LittleEndian, WriteBytesExt};

/// Accumulates the binary encoding of a value, following the teacher's
/// `Stream`/`Serializable` split: each type knows how to append itself,
/// the stream just owns the growing buffer.
#[derive(Default)]
pub struct Stream {
    buffer: Vec<u8>,
}

impl Stream {
    pub fn new() -> Self {
        Stream { buffer: Vec::new() }
    }

    pub fn out(self) -> Vec<u8> {
        self.buffer
    }

    pub fn append<T: Serializable>(&mut self, t: &T) -> &mut Self {
        t.serialize(self);
        self
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    pub fn append_compact_size(&mut self, value: u64) -> &mut Self {
        match value {
            0..=0xfc => {
                self.buffer.push(value as u8);
            }
            0xfd..=0xffff => {
                self.buffer.push(0xfd);
                self.buffer.write_u16::<LittleEndian>(value as u16).unwrap();
            }
            0x1_0000..=0xffff_ffff => {
                self.buffer.push(0xfe);
                self.buffer.write_u32::<LittleEndian>(value as u32).unwrap();
            }
            _ => {
                self.buffer.push(0xff);
                self.buffer.write_u64::<LittleEndian>(value).unwrap();
            }
        }
        self
    }
}

/// A type that can append its canonical binary encoding to a `Stream`.
///
/// This is the encoding hashed to produce transaction ids and block hashes,
/// and the encoding used for the (out of scope) wire format — the two share
/// a representation by design, as in the teacher codebase.
pub trait Serializable {
    fn serialize(&self, stream: &mut Stream);

    fn serialized_size(&self) -> usize {
        let mut stream = Stream::new();
        self.serialize(&mut stream);
        stream.out().len()
    }
}

macro_rules! impl_serializable_for_int {
    ($ty:ty, $write:ident) => {
        impl Serializable for $ty {
            fn serialize(&self, stream: &mut Stream) {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                byteorder::LittleEndian::$write(&mut buf, *self);
                stream.append_bytes(&buf);
            }
        }
    };
}

impl Serializable for u8 {
    fn serialize(&self, stream: &mut Stream) {
        stream.append_bytes(&[*self]);
    }
}

impl_serializable_for_int!(u16, write_u16);
impl_serializable_for_int!(u32, write_u32);
impl_serializable_for_int!(u64, write_u64);
impl_serializable_for_int!(i64, write_i64);

impl<const N: usize> Serializable for [u8; N] {
    fn serialize(&self, stream: &mut Stream) {
        stream.append_bytes(self);
    }
}

impl Serializable for Vec<u8> {
    fn serialize(&self, stream: &mut Stream) {
        stream.append_compact_size(self.len() as u64);
        stream.append_bytes(self);
    }
}

impl<T: Serializable> Serializable for Vec<T> {
    fn serialize(&self, stream: &mut Stream) {
        stream.append_compact_size(self.len() as u64);
        for item in self {
            stream.append(item);
        }
    }
}

impl<T: Serializable> Serializable for Option<T> {
    fn serialize(&self, stream: &mut Stream) {
        match self {
            Some(value) => {
                stream.append_bytes(&[1]);
                stream.append(value);
            }
            None => {
                stream.append_bytes(&[0]);
            }
        }
    }
}
