//! Fire-and-forget persistence of backing files.
//!
//! Every save hands the fully rendered file to a background thread. Jobs queued
//! for the same path are coalesced so that only the last rendered state is
//! written. Failures are logged and never reach the mutator.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    thread,
};

use log::{debug, error};
use tokio::sync::{mpsc, oneshot};

use crate::error::Error;

enum Job {
    Write { path: PathBuf, contents: String },
    Flush(oneshot::Sender<()>),
}

/// Handle to the background writer. Cloning shares the same writer thread, which
/// exits once every handle is dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct Saver {
    sender: mpsc::UnboundedSender<Job>,
}

impl Saver {
    pub fn spawn() -> Result<Self, Error> {
        let (sender, receiver) = mpsc::unbounded_channel();
        thread::Builder::new()
            .name("locforge-saver".to_string())
            .spawn(move || run(receiver))?;
        Ok(Self { sender })
    }

    /// Queues `contents` to be written to `path`. Never blocks.
    pub fn save(&self, path: &Path, contents: String) {
        let job = Job::Write {
            path: path.to_path_buf(),
            contents,
        };
        if self.sender.send(job).is_err() {
            error!("saver stopped, dropping write to {}", path.display());
        }
    }

    /// Blocks until every save queued before this call has been attempted.
    ///
    /// Must not be called from inside an async runtime.
    pub fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(Job::Flush(done)).is_err() {
            return;
        }
        let _ = wait.blocking_recv();
    }
}

fn run(mut receiver: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = receiver.blocking_recv() {
        let mut pending = BTreeMap::new();
        let mut barriers = Vec::new();

        let mut next = Some(job);
        while let Some(job) = next {
            match job {
                Job::Write { path, contents } => {
                    if pending.insert(path.clone(), contents).is_some() {
                        debug!("coalesced pending write to {}", path.display());
                    }
                }
                Job::Flush(done) => barriers.push(done),
            }
            next = receiver.try_recv().ok();
        }

        for (path, contents) in pending {
            if let Err(e) = write_file(&path, &contents) {
                error!("failed to save {}: {}", path.display(), e);
            }
        }
        for done in barriers {
            let _ = done.send(());
        }
    }
}

fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}
