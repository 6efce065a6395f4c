//! Delimited file output, one file per edge kind.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

use crate::constants::FILE_FLUSH_INTERVAL;
use crate::models::{EdgeKind, OutputEdge};

use super::OutputSink;

struct OpenFile {
    writer: BufWriter<File>,
    pending: usize,
}

/// Appends edges to per-kind files under one output directory. Files open
/// lazily on the first edge of their kind; a header is written only when
/// the file is created, so repeated runs into the same directory append.
pub struct FileSink {
    directory: PathBuf,
    files: HashMap<EdgeKind, OpenFile>,
}

impl FileSink {
    pub fn new(directory: &Path) -> Result<Self> {
        fs::create_dir_all(directory).with_context(|| {
            format!("Failed to create output directory: {}", directory.display())
        })?;
        Ok(FileSink {
            directory: directory.to_path_buf(),
            files: HashMap::new(),
        })
    }

    fn open_for(&mut self, kind: EdgeKind) -> Result<&mut OpenFile> {
        match self.files.entry(kind) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = self.directory.join(kind.file_name());
                let existed = path.exists();
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .with_context(|| {
                        format!("Failed to open output file: {}", path.display())
                    })?;
                debug!(
                    "Opened {} ({})",
                    path.display(),
                    if existed { "appending" } else { "new" }
                );

                let mut writer = BufWriter::new(file);
                if !existed {
                    writeln!(writer, "{}", kind.csv_header()).with_context(|| {
                        format!("Failed to write header to {}", path.display())
                    })?;
                }
                Ok(entry.insert(OpenFile { writer, pending: 0 }))
            }
        }
    }
}

impl OutputSink for FileSink {
    fn receive(&mut self, edge: OutputEdge) -> Result<()> {
        let kind = edge.kind();
        let row = edge.csv_row();
        let file = self.open_for(kind)?;

        writeln!(file.writer, "{}", row)
            .with_context(|| format!("Failed to write line to {}", kind.file_name()))?;
        file.pending += 1;

        // Trust edges are few and must survive an interrupted run.
        if kind == EdgeKind::DomainTrust || file.pending >= FILE_FLUSH_INTERVAL {
            file.writer
                .flush()
                .with_context(|| format!("Failed to flush {}", kind.file_name()))?;
            file.pending = 0;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        for (kind, file) in self.files.iter_mut() {
            file.writer
                .flush()
                .with_context(|| format!("Failed to flush {}", kind.file_name()))?;
        }
        self.files.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GroupMembershipEdge, ObjectKind, SessionEdge};
    use tempfile::TempDir;

    fn session_edge(n: usize) -> OutputEdge {
        OutputEdge::Session(SessionEdge {
            user_name: format!("USER{}@TESTLAB.LOCAL", n),
            computer_name: "ws01.testlab.local".to_string(),
            weight: 2,
        })
    }

    fn membership_edge() -> OutputEdge {
        OutputEdge::GroupMembership(GroupMembershipEdge {
            group_name: "DOMAIN USERS@TESTLAB.LOCAL".to_string(),
            account_name: "JDOE@TESTLAB.LOCAL".to_string(),
            account_kind: ObjectKind::User,
        })
    }

    fn trust_edge() -> OutputEdge {
        OutputEdge::DomainTrust(crate::models::DomainTrustEdge {
            source_domain: "TESTLAB.LOCAL".to_string(),
            target_domain: "EXTERNAL.LOCAL".to_string(),
            direction: crate::models::TrustDirection::Outbound,
            kind: crate::models::TrustKind::External,
            transitive: true,
        })
    }

    fn read_lines(dir: &TempDir, kind: EdgeKind) -> Vec<String> {
        let content = fs::read_to_string(dir.path().join(kind.file_name()))
            .expect("output file should exist");
        content.lines().map(String::from).collect()
    }

    #[test]
    fn test_header_written_once_then_k_lines() {
        let dir = TempDir::new().expect("tempdir");
        let mut sink = FileSink::new(dir.path()).expect("sink should open");
        for n in 0..5 {
            sink.receive(session_edge(n)).expect("receive");
        }
        sink.finish().expect("finish");

        let lines = read_lines(&dir, EdgeKind::Session);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], EdgeKind::Session.csv_header());
        assert!(lines[1].starts_with("USER0@TESTLAB.LOCAL,"));
    }

    #[test]
    fn test_reopening_appends_without_header_rewrite() {
        let dir = TempDir::new().expect("tempdir");

        let mut first = FileSink::new(dir.path()).expect("sink should open");
        first.receive(session_edge(0)).expect("receive");
        first.finish().expect("finish");

        let mut second = FileSink::new(dir.path()).expect("sink should reopen");
        second.receive(session_edge(1)).expect("receive");
        second.finish().expect("finish");

        let lines = read_lines(&dir, EdgeKind::Session);
        assert_eq!(lines.len(), 3);
        let headers = lines
            .iter()
            .filter(|l| *l == EdgeKind::Session.csv_header())
            .count();
        assert_eq!(headers, 1);
    }

    #[test]
    fn test_each_kind_gets_its_own_file() {
        let dir = TempDir::new().expect("tempdir");
        let mut sink = FileSink::new(dir.path()).expect("sink should open");
        sink.receive(session_edge(0)).expect("receive");
        sink.receive(membership_edge()).expect("receive");
        sink.finish().expect("finish");

        assert!(dir.path().join(EdgeKind::Session.file_name()).exists());
        assert!(dir
            .path()
            .join(EdgeKind::GroupMembership.file_name())
            .exists());
        assert!(!dir.path().join(EdgeKind::LocalAdmin.file_name()).exists());
    }

    #[test]
    fn test_trust_lines_hit_disk_before_finish() {
        let dir = TempDir::new().expect("tempdir");
        let mut sink = FileSink::new(dir.path()).expect("sink should open");

        sink.receive(trust_edge()).expect("receive");
        sink.receive(session_edge(0)).expect("receive");

        // Trust flushes immediately; the session line is still buffered.
        let trust_lines = read_lines(&dir, EdgeKind::DomainTrust);
        assert_eq!(trust_lines.len(), 2);
        let session_content =
            fs::read_to_string(dir.path().join(EdgeKind::Session.file_name()))
                .expect("session file exists");
        assert!(session_content.is_empty());

        sink.finish().expect("finish");
        assert_eq!(read_lines(&dir, EdgeKind::Session).len(), 2);
    }

    #[test]
    fn test_flush_interval_reached_mid_run() {
        let dir = TempDir::new().expect("tempdir");
        let mut sink = FileSink::new(dir.path()).expect("sink should open");
        for n in 0..FILE_FLUSH_INTERVAL {
            sink.receive(session_edge(n)).expect("receive");
        }

        // Interval reached, so the lines are on disk without a finish.
        let lines = read_lines(&dir, EdgeKind::Session);
        assert_eq!(lines.len(), FILE_FLUSH_INTERVAL + 1);
        sink.finish().expect("finish");
    }
}
