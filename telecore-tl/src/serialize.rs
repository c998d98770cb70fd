//! The [`Serializable`] trait and its implementations for primitive wire types.
//!
//! Little-endian, 4-byte aligned, the same binary layout the TL family of
//! schemas uses everywhere.

/// Serialize `self` into binary wire format.
pub trait Serializable {
    /// Appends the serialized form of `self` to `buf`.
    fn serialize(&self, buf: &mut impl Extend<u8>);

    /// Convenience: allocate a fresh `Vec<u8>` and serialize into it.
    fn to_bytes(&self) -> Vec<u8> {
        let mut v = Vec::new();
        self.serialize(&mut v);
        v
    }
}

// ─── bool ────────────────────────────────────────────────────────────────────

/// `true`  → `boolTrue#997275b5`
/// `false` → `boolFalse#bc799737`
impl Serializable for bool {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        let id: u32 = if *self { 0x997275b5 } else { 0xbc799737 };
        id.serialize(buf);
    }
}

// ─── integers ────────────────────────────────────────────────────────────────

macro_rules! le_int {
    ($($t:ty),+) => {$(
        impl Serializable for $t {
            fn serialize(&self, buf: &mut impl Extend<u8>) {
                buf.extend(self.to_le_bytes());
            }
        }
    )+};
}

le_int!(i32, u32, i64);

// ─── strings / bytes ─────────────────────────────────────────────────────────

/// Length-prefixed, 4-byte aligned byte string.
///
/// * `len ≤ 253`: `[len as u8][data][0-padding]`
/// * `len ≥ 254`: `[0xfe][len as 3 LE bytes][data][0-padding]`
impl Serializable for &[u8] {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        let len = self.len();
        let header_len = if len <= 253 {
            buf.extend([len as u8]);
            1
        } else {
            buf.extend([
                0xfe,
                (len & 0xff) as u8,
                ((len >> 8) & 0xff) as u8,
                ((len >> 16) & 0xff) as u8,
            ]);
            4
        };

        buf.extend(self.iter().copied());
        let padding = (4 - ((header_len + len) % 4)) % 4;
        buf.extend(std::iter::repeat_n(0u8, padding));
    }
}

impl Serializable for Vec<u8> {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.as_slice().serialize(buf);
    }
}

impl Serializable for String {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.as_bytes().serialize(buf);
    }
}

// ─── vectors ─────────────────────────────────────────────────────────────────

/// Boxed `Vector<T>`, prefixed with constructor ID `0x1cb5c415`.
impl<T: Serializable> Serializable for Vec<T> {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        0x1cb5c415u32.serialize(buf);
        (self.len() as i32).serialize(buf);
        for item in self { item.serialize(buf); }
    }
}

// ─── Option ──────────────────────────────────────────────────────────────────

/// Optional parameters live behind a flags word; `None` writes nothing.
impl<T: Serializable> Serializable for Option<T> {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        if let Some(v) = self { v.serialize(buf); }
    }
}
