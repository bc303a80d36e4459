//! Flat-file JSON store.
//!
//! The document lives in memory and is owned by a single task. Reads and
//! writes are closures shipped to that task, so two requests can never
//! interleave a read-modify-write. A write runs against a draft copy; the
//! draft replaces the document only after it has been persisted, which keeps
//! memory and disk in step when a write fails halfway.

mod model;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument};

pub use model::*;

use crate::{AppError, AppResult};

type ReadOp = Box<dyn FnOnce(&Data) + Send>;
type WriteOp = Box<dyn FnOnce(&mut Data) -> Pending + Send>;
type Reply = Box<dyn FnOnce(AppResult<()>) + Send>;

enum Pending {
    Commit(Reply),
    Discard,
}

enum StoreRequest {
    Read(ReadOp),
    Write(WriteOp),
}

struct StoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    path: PathBuf,
    data: Data,
}

impl StoreActor {
    #[instrument(name = "store", skip(self))]
    async fn run(mut self) {
        info!(path = %self.path.display(), "store starting");
        while let Some(request) = self.receiver.recv().await {
            match request {
                StoreRequest::Read(op) => op(&self.data),
                StoreRequest::Write(op) => {
                    let mut draft = self.data.clone();
                    match op(&mut draft) {
                        Pending::Discard => debug!("write rejected, draft discarded"),
                        Pending::Commit(reply) => match persist(&self.path, &draft).await {
                            Ok(()) => {
                                self.data = draft;
                                reply(Ok(()));
                            }
                            Err(err) => {
                                error!("failed to persist store: {err:#}");
                                reply(Err(AppError::Internal(err)));
                            }
                        },
                    }
                }
            }
        }
        info!("store stopped");
    }
}

async fn persist(path: &Path, data: &Data) -> anyhow::Result<()> {
    let bytes = serde_json::to_vec_pretty(data)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("replacing {}", path.display()))?;
    debug!("store persisted");
    Ok(())
}

/// Handle to the store task. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    sender: mpsc::Sender<StoreRequest>,
}

impl Store {
    /// Loads `path` (a missing file is an empty document) and spawns the owner task.
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Store> {
        let path = path.into();
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("{} does not exist yet, starting empty", path.display());
                Data::default()
            }
            Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
        };

        Ok(Self::spawn(path, data))
    }

    fn spawn(path: PathBuf, data: Data) -> Store {
        let (sender, receiver) = mpsc::channel(64);
        tokio::spawn(StoreActor { receiver, path, data }.run());
        Store { sender }
    }

    pub async fn read<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Data) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (respond_to, response) = oneshot::channel();
        let op: ReadOp = Box::new(move |data: &Data| {
            let _ = respond_to.send(f(data));
        });

        self.sender
            .send(StoreRequest::Read(op))
            .await
            .map_err(|_| anyhow!("store closed"))?;
        Ok(response.await.map_err(|_| anyhow!("store dropped the request"))?)
    }

    /// Runs `f` against a draft. `Ok` commits and persists the draft, `Err`
    /// leaves the document untouched.
    pub async fn write<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut Data) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let (respond_to, response) = oneshot::channel::<AppResult<T>>();
        let op: WriteOp = Box::new(move |draft: &mut Data| match f(draft) {
            Ok(value) => Pending::Commit(Box::new(move |persisted: AppResult<()>| {
                let _ = respond_to.send(persisted.map(|()| value));
            })),
            Err(err) => {
                let _ = respond_to.send(Err(err));
                Pending::Discard
            }
        });

        self.sender
            .send(StoreRequest::Write(op))
            .await
            .map_err(|_| anyhow!("store closed"))?;
        response.await.map_err(|_| anyhow!("store dropped the request"))?
    }

    pub async fn snapshot(&self) -> AppResult<Data> {
        self.read(Data::clone).await
    }
}
