//! Single writer: every mutation runs on one connection, one transaction per
//! job, in submission order.

use std::thread;

use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use log::{debug, error};
use tokio::sync::{mpsc, oneshot};

use kickfeed_core::{Error, Result};

use super::DbPool;
use crate::errors::StorageError;

type Job = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

enum Message {
    Run(Job),
    Shutdown,
}

#[derive(Clone)]
pub struct WriteHandle {
    jobs: mpsc::UnboundedSender<Message>,
}

/// Owns the writer thread. Dropping it finishes the queued jobs, stops the
/// thread and waits for its connection to be released.
pub struct WriterThread {
    jobs: mpsc::UnboundedSender<Message>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for WriterThread {
    fn drop(&mut self) {
        let _ = self.jobs.send(Message::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("[Storage] Writer thread panicked");
            }
        }
    }
}

/// Rolls back on either a database or a domain error.
enum TxError {
    Domain(Error),
    Database(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(err: diesel::result::Error) -> Self {
        TxError::Database(err)
    }
}

impl WriteHandle {
    /// Runs `job` inside a transaction on the writer connection.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let wrapped: Job = Box::new(move |conn: &mut SqliteConnection| {
            let outcome = conn
                .transaction::<T, TxError, _>(|tx| job(tx).map_err(TxError::Domain))
                .map_err(|err| match err {
                    TxError::Domain(err) => err,
                    TxError::Database(err) => StorageError::from(err).into(),
                });
            let _ = reply.send(outcome);
        });
        self.jobs
            .send(Message::Run(wrapped))
            .map_err(|_| StorageError::WriterClosed)?;
        response.await.map_err(|_| StorageError::WriterClosed)?
    }
}

/// Starts the writer thread. It exits when the returned [`WriterThread`] is
/// dropped or once every [`WriteHandle`] is gone.
pub fn spawn_writer(pool: DbPool) -> (WriteHandle, WriterThread) {
    let (jobs, mut queue) = mpsc::unbounded_channel::<Message>();
    let thread = thread::spawn(move || {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(err) => {
                error!("[Storage] Writer could not get a connection: {}", err);
                return;
            }
        };
        while let Some(Message::Run(job)) = queue.blocking_recv() {
            job(&mut *conn);
        }
        debug!("[Storage] Writer stopped");
    });
    (
        WriteHandle { jobs: jobs.clone() },
        WriterThread {
            jobs,
            thread: Some(thread),
        },
    )
}
