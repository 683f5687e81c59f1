//! Output sink: the injectable write target for all trace text
//!
//! Every logical event is rendered to one string and written under a
//! single lock acquisition, so blocks emitted from concurrent threads
//! never interleave. The sink is replaceable at any time; the previous
//! sink is simply released, never cleaned up.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::entity::{Entity, EntityId, ProxyEntity};
use crate::error::{Result, TraceError};
use crate::format::LineBlock;

/// Cloneable handle to a write target. Identity is the handle's shared
/// allocation, so clones compare identical and a freshly installed sink
/// gets a fresh identity.
#[derive(Clone)]
pub struct OutputSink {
    slot: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl OutputSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Default sink: the process standard-error stream.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    pub fn identity(&self) -> EntityId {
        EntityId(Arc::as_ptr(&self.slot) as usize)
    }

    /// Entity wrapper sharing this sink's identity, so the sink itself can
    /// be offered for registration and caught by the self-exclusion check.
    pub fn entity(&self) -> Entity {
        ProxyEntity::new(
            self.identity(),
            "OutputSink",
            format!("#<mirador sink {:#x}>", self.identity().as_usize()),
        )
    }

    /// Write one message block as a single atomic unit.
    pub fn write_block(&self, block: &LineBlock) -> io::Result<()> {
        if block.is_empty() {
            return Ok(());
        }
        let text = block.render();
        let mut writer = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(text.as_bytes())?;
        writer.flush()
    }

    /// Probe the underlying writer. Used when a sink is installed to
    /// reject targets that cannot accept text at all.
    pub(crate) fn probe(&self) -> io::Result<()> {
        let mut writer = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        writer.flush()
    }
}

/// Replaceable slot holding the current sink, shared by the dispatcher
/// and the timer store.
#[derive(Clone)]
pub(crate) struct SinkCell {
    current: Arc<RwLock<OutputSink>>,
}

impl SinkCell {
    pub(crate) fn new(sink: OutputSink) -> Self {
        Self {
            current: Arc::new(RwLock::new(sink)),
        }
    }

    pub(crate) fn current(&self) -> OutputSink {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn replace(&self, sink: OutputSink) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = sink;
    }

    pub(crate) fn identity(&self) -> EntityId {
        self.current().identity()
    }

    pub(crate) fn write_block(&self, block: &LineBlock) -> Result<()> {
        self.current().write_block(block).map_err(TraceError::Sink)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::CaptureSink;
    use super::*;

    #[test]
    fn test_write_block_is_one_unit() {
        let capture = CaptureSink::new();
        let sink = OutputSink::new(capture.clone());
        let mut block = LineBlock::new();
        block.push("> Sample#add(21, 21)");
        block.push("  app.rb:3");
        sink.write_block(&block).unwrap();
        assert_eq!(capture.contents(), "> Sample#add(21, 21)\n  app.rb:3\n");
    }

    #[test]
    fn test_empty_block_writes_nothing() {
        let capture = CaptureSink::new();
        let sink = OutputSink::new(capture.clone());
        sink.write_block(&LineBlock::new()).unwrap();
        assert_eq!(capture.contents(), "");
    }

    #[test]
    fn test_identity_stable_across_handle_clones() {
        let sink = OutputSink::new(Vec::new());
        let clone = sink.clone();
        assert_eq!(sink.identity(), clone.identity());
    }

    #[test]
    fn test_sink_entity_shares_identity() {
        let sink = OutputSink::new(Vec::new());
        assert_eq!(sink.entity().identity(), sink.identity());
    }

    #[test]
    fn test_replacing_sink_changes_cell_identity() {
        let cell = SinkCell::new(OutputSink::new(Vec::new()));
        let before = cell.identity();
        cell.replace(OutputSink::new(Vec::new()));
        assert_ne!(before, cell.identity());
    }

    #[test]
    fn test_concurrent_blocks_never_interleave() {
        use std::thread;

        let capture = CaptureSink::new();
        let sink = OutputSink::new(capture.clone());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let mut block = LineBlock::new();
                        block.push(format!("> T{i}#first()"));
                        block.push(format!("  t{i}.rb:1"));
                        sink.write_block(&block).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // Every block must appear whole: a signature line is always
        // followed by its own location line.
        let text = capture.contents();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8 * 50 * 2);
        for pair in lines.chunks(2) {
            let id = pair[0].trim_start_matches("> T").chars().next().unwrap();
            assert_eq!(pair[1], format!("  t{id}.rb:1"));
        }
    }
}
