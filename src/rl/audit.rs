use std::fs::File;
use std::io;
use std::sync::mpsc;
use std::thread;

use crate::domain::ids::{CourseId, JobId};

/// One refinement decision, written to the audit trail regardless of
/// whether the candidate swap was accepted (spec §4.6: "An audit log
/// records every decision").
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub job_id: JobId,
    pub course_id: CourseId,
    pub session_index: u32,
    pub candidate_count: usize,
    pub chosen_index: usize,
    pub chosen_q_value: f64,
    pub exploratory: bool,
}

enum AuditMessage {
    Record(AuditRecord),
    Shutdown,
}

/// Background-thread CSV writer for the refiner's audit trail, modeled on
/// the mpsc-plus-worker-thread shape the teacher uses for its statistics
/// collector: callers never block on file I/O.
pub struct AuditLog {
    sender: mpsc::Sender<AuditMessage>,
    handle: Option<thread::JoinHandle<()>>,
}

impl AuditLog {
    pub fn init(path: std::path::PathBuf) -> io::Result<Self> {
        let file = File::create(&path)?;
        let (tx, rx) = mpsc::channel::<AuditMessage>();

        let handle = thread::spawn(move || {
            let mut writer = csv::Writer::from_writer(file);
            let _ = writer.write_record([
                "job_id",
                "course_id",
                "session_index",
                "candidate_count",
                "chosen_index",
                "chosen_q_value",
                "exploratory",
            ]);
            for msg in rx {
                match msg {
                    AuditMessage::Record(r) => {
                        let _ = writer.write_record([
                            r.job_id.as_str().to_string(),
                            r.course_id.as_str().to_string(),
                            r.session_index.to_string(),
                            r.candidate_count.to_string(),
                            r.chosen_index.to_string(),
                            r.chosen_q_value.to_string(),
                            r.exploratory.to_string(),
                        ]);
                    }
                    AuditMessage::Shutdown => break,
                }
            }
            let _ = writer.flush();
        });

        Ok(AuditLog {
            sender: tx,
            handle: Some(handle),
        })
    }

    pub fn record(&self, record: AuditRecord) {
        let _ = self.sender.send(AuditMessage::Record(record));
    }
}

impl Drop for AuditLog {
    fn drop(&mut self) {
        let _ = self.sender.send(AuditMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
