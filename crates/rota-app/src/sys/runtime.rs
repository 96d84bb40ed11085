use crate::events::AppEvent;
use crate::slices;
use crate::sys::server;
use async_channel::Sender;
use std::io;
use std::thread::{self, JoinHandle};
use tokio::runtime::{Builder, Runtime};

const THREAD_NAME: &str = "rota-services";

fn build_runtime() -> io::Result<Runtime> {
    Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("rota-io")
        .enable_all()
        .build()
}

/// Serves the control socket and watches the slices file until both stop.
/// Each service logs its own failures.
async fn run_services(tx: Sender<AppEvent>) {
    tokio::join!(
        server::run_server(tx.clone()),
        slices::run_async_watcher(tx),
    );
    log::debug!("Background services stopped");
}

fn spawn_on_runtime<F>(task: F) -> io::Result<JoinHandle<()>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let rt = build_runtime()?;
    thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || rt.block_on(task))
}

pub fn start_background_services(tx: Sender<AppEvent>) -> io::Result<JoinHandle<()>> {
    spawn_on_runtime(run_services(tx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_run_on_named_thread() {
        let (tx, rx) = async_channel::unbounded();
        let handle = spawn_on_runtime(async move {
            let name = thread::current().name().map(str::to_string);
            tx.send(name).await.unwrap();
        })
        .unwrap();

        handle.join().unwrap();
        assert_eq!(rx.recv_blocking().unwrap().as_deref(), Some(THREAD_NAME));
    }
}
