// Shared helpers for integration tests: an in-memory sink plus a session
// wired to a synthetic event source.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use mirador::{Session, SyntheticSource};

/// Cloneable in-memory sink; every clone shares the same buffer.
#[derive(Clone, Default)]
pub struct SharedBuf {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).to_string()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Session + attached synthetic source + capture buffer.
pub fn rig() -> (Session, Arc<SyntheticSource>, SharedBuf) {
    let session = Session::new();
    let buf = SharedBuf::new();
    session
        .set_output(buf.clone())
        .expect("in-memory sink accepts text");
    let source = SyntheticSource::new();
    session.attach_source(source.clone());
    (session, source, buf)
}
