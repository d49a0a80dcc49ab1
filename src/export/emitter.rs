//! Result emission: sinks and the dedicated writer thread
//!
//! The scheduler hands completed records to a bounded channel with a
//! non-blocking send; this thread drains the channel into a [`ResultSink`].
//! I/O failure is logged and the engine keeps running — losing a record is
//! acceptable, emitting a corrupt or partial one is not. All records handed
//! off before shutdown are flushed before [`ResultEmitter::shutdown`]
//! returns.

use std::io::Write;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use log::{debug, error};

use crate::domain::EmitError;
use crate::experiment::ExperimentResult;

/// Destination for completed experiment records.
pub trait ResultSink {
    /// Append one record. Must write the record completely or not at all.
    fn emit(&mut self, result: &ExperimentResult) -> Result<(), EmitError>;

    /// Persist everything emitted so far.
    fn flush(&mut self) -> Result<(), EmitError>;
}

/// Comma-separated records, one row per experiment, header first.
pub struct CsvSink<W: Write> {
    writer: W,
    wrote_header: bool,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, wrote_header: false }
    }
}

impl<W: Write> ResultSink for CsvSink<W> {
    fn emit(&mut self, result: &ExperimentResult) -> Result<(), EmitError> {
        // Build the full line first so a failed write never leaves a
        // partial row behind a buffered writer boundary.
        let mut line = String::new();
        if !self.wrote_header {
            line.push_str("container,line,speedup_pct,duration_ms,progress_delta,candidate_samples\n");
        }
        line.push_str(&format!(
            "{},{},{},{},{},{}\n",
            result.candidate.container,
            result.candidate.line,
            result.speedup_pct.get(),
            result.duration_ms,
            result.progress_delta,
            result.candidate_samples,
        ));
        self.writer.write_all(line.as_bytes())?;
        self.wrote_header = true;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), EmitError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Buffers records and writes one JSON array on flush.
pub struct JsonSink<W: Write> {
    writer: W,
    records: Vec<ExperimentResult>,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, records: Vec::new() }
    }
}

impl<W: Write> ResultSink for JsonSink<W> {
    fn emit(&mut self, result: &ExperimentResult) -> Result<(), EmitError> {
        self.records.push(result.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), EmitError> {
        serde_json::to_writer_pretty(&mut self.writer, &self.records)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// The writer thread. Lives from attach until shutdown; exits when every
/// result sender is gone and the channel drains.
pub struct ResultEmitter {
    handle: JoinHandle<()>,
}

impl ResultEmitter {
    /// Spawn the writer thread over `receiver`.
    pub fn spawn(
        mut sink: Box<dyn ResultSink + Send>,
        receiver: Receiver<ExperimentResult>,
    ) -> std::io::Result<Self> {
        let handle = std::thread::Builder::new().name("quicken-emitter".into()).spawn(
            move || {
                let mut emitted: u64 = 0;
                for result in receiver {
                    match sink.emit(&result) {
                        Ok(()) => emitted += 1,
                        // Record dropped, engine unaffected
                        Err(e) => error!("failed to emit experiment record: {e}"),
                    }
                }
                if let Err(e) = sink.flush() {
                    error!("failed to flush result sink: {e}");
                }
                debug!("emitter: {emitted} record(s) written");
            },
        )?;
        Ok(Self { handle })
    }

    /// Wait for the channel to drain and the sink to flush. Callers must
    /// drop every result sender first or this blocks forever.
    pub fn shutdown(self) {
        if self.handle.join().is_err() {
            error!("emitter thread panicked during shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Location, SpeedupPct};

    fn record(pct: u8, delta: u64) -> ExperimentResult {
        ExperimentResult {
            candidate: Location::new("com.example.Hot", 7),
            speedup_pct: SpeedupPct::new(pct),
            duration_ms: 5_000,
            progress_delta: delta,
            candidate_samples: 23,
        }
    }

    #[test]
    fn test_csv_sink_writes_header_once() {
        let mut buf = Vec::new();
        {
            let mut sink = CsvSink::new(&mut buf);
            sink.emit(&record(15, 4)).unwrap();
            sink.emit(&record(30, 9)).unwrap();
            sink.flush().unwrap();
        }
        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "container,line,speedup_pct,duration_ms,progress_delta,candidate_samples"
        );
        assert_eq!(lines[1], "com.example.Hot,7,15,5000,4,23");
        assert_eq!(lines[2], "com.example.Hot,7,30,5000,9,23");
    }

    #[test]
    fn test_json_sink_round_trips() {
        let mut buf = Vec::new();
        {
            let mut sink = JsonSink::new(&mut buf);
            sink.emit(&record(15, 4)).unwrap();
            sink.flush().unwrap();
        }
        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let records = parsed.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["candidate"]["container"], "com.example.Hot");
        assert_eq!(records[0]["candidate"]["line"], 7);
        assert_eq!(records[0]["speedup_pct"], 15);
        assert_eq!(records[0]["progress_delta"], 4);
    }

    #[test]
    fn test_emitter_thread_flushes_on_channel_close() {
        use crossbeam_channel::bounded;
        use std::sync::{Arc, Mutex};

        struct SharedSink(Arc<Mutex<(Vec<ExperimentResult>, bool)>>);

        impl ResultSink for SharedSink {
            fn emit(&mut self, result: &ExperimentResult) -> Result<(), EmitError> {
                self.0.lock().unwrap().0.push(result.clone());
                Ok(())
            }
            fn flush(&mut self) -> Result<(), EmitError> {
                self.0.lock().unwrap().1 = true;
                Ok(())
            }
        }

        let state = Arc::new(Mutex::new((Vec::new(), false)));
        let (tx, rx) = bounded(8);
        let emitter = ResultEmitter::spawn(Box::new(SharedSink(Arc::clone(&state))), rx).unwrap();

        tx.send(record(5, 1)).unwrap();
        tx.send(record(10, 2)).unwrap();
        drop(tx);
        emitter.shutdown();

        let state = state.lock().unwrap();
        assert_eq!(state.0.len(), 2);
        assert!(state.1, "sink must be flushed before shutdown returns");
        // Completion order preserved
        assert_eq!(state.0[0].speedup_pct, SpeedupPct::new(5));
        assert_eq!(state.0[1].speedup_pct, SpeedupPct::new(10));
    }
}
