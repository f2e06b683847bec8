use crate::{
    objects::{read_framed, write_framed, ObjectHeader, RootObject},
    ReadBuffer, Result, WriteBuffer,
};

const NAMED_VERSION: i16 = 1;

/// A base object extended with a name and a title.
///
/// Most addressable objects in legacy containers derive from this shape; composites
/// embed it as their second header, gated on their own streamer version.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Named {
    /// The universal base header
    pub obj: ObjectHeader,
    /// Object name, used for lookups
    pub name: String,
    /// Free-form title carried alongside the name
    pub title: String,
}

impl Named {
    /// Create a named object with default header bits.
    #[must_use]
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Named {
            obj: ObjectHeader::new(),
            name: name.into(),
            title: title.into(),
        }
    }
}

impl RootObject for Named {
    fn class(&self) -> &'static str {
        "TNamed"
    }

    fn rversion(&self) -> i16 {
        NAMED_VERSION
    }

    fn marshal(&self, w: &mut WriteBuffer) -> Result<u32> {
        write_framed(w, self.class(), self.rversion(), |w| {
            self.obj.marshal(w)?;
            w.write_string(&self.name);
            w.write_string(&self.title);
            Ok(())
        })
    }

    fn unmarshal(&mut self, r: &mut ReadBuffer) -> Result<()> {
        read_framed(r, "TNamed", |r, _vers| {
            self.obj.unmarshal(r)?;
            self.name = r.read_string();
            self.title = r.read_string();
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
    fn named_round_trip() {
        let named = Named::new("hits", "calorimeter hit count");

        let mut w = WriteBuffer::new();
        named.marshal(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();

        let mut out = Named::default();
        out.unmarshal(&mut ReadBuffer::new(&bytes)).unwrap();
        assert_eq!(out, named);
    }

    #[test]
    fn tampered_byte_count_is_a_framing_error() {
        let named = Named::new("n", "");
        let mut w = WriteBuffer::new();
        named.marshal(&mut w).unwrap();
        let mut bytes = w.into_bytes().unwrap();

        // inflate the declared count by one; the payload no longer matches
        bytes[3] += 1;

        let mut out = Named::default();
        let err = out.unmarshal(&mut ReadBuffer::new(&bytes)).unwrap_err();
        assert!(matches!(err, crate::Error::ByteCount { .. }));
    }
}
