#![no_main]

use libfuzzer_sys::fuzz_target;
use rootscope::prelude::*;

fuzz_target!(|data: &[u8]| {
    let mut r = ReadBuffer::new(data);
    let _ = r.read_object_any();

    let mut map = Map::new();
    let _ = map.unmarshal(&mut ReadBuffer::new(data));
});
