use crate::{
    objects::{read_framed, write_framed, ObjectHeader, RootObject},
    ReadBuffer, Result, WriteBuffer,
};

const OBJSTRING_VERSION: i16 = 1;

/// A storable object wrapping a single string payload.
///
/// Legacy containers use these as keys and values of associative containers, which is
/// why the plain string gets the full object capability.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjString {
    /// The universal base header
    pub obj: ObjectHeader,
    /// The wrapped string
    pub value: String,
}

impl ObjString {
    /// Wrap a string into a storable object.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        ObjString {
            obj: ObjectHeader::new(),
            value: value.into(),
        }
    }
}

impl RootObject for ObjString {
    fn class(&self) -> &'static str {
        "TObjString"
    }

    fn rversion(&self) -> i16 {
        OBJSTRING_VERSION
    }

    fn marshal(&self, w: &mut WriteBuffer) -> Result<u32> {
        write_framed(w, self.class(), self.rversion(), |w| {
            self.obj.marshal(w)?;
            w.write_string(&self.value);
            Ok(())
        })
    }

    fn unmarshal(&mut self, r: &mut ReadBuffer) -> Result<()> {
        read_framed(r, "TObjString", |r, _vers| {
            self.obj.unmarshal(r)?;
            self.value = r.read_string();
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objstring_round_trip() {
        for value in ["", "x", "a longer string with spaces"] {
            let s = ObjString::new(value);
            let mut w = WriteBuffer::new();
            s.marshal(&mut w).unwrap();
            let bytes = w.into_bytes().unwrap();

            let mut out = ObjString::default();
            out.unmarshal(&mut ReadBuffer::new(&bytes)).unwrap();
            assert_eq!(out, s);
        }
    }
}
