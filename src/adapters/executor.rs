//! Task spawner adapter over `edge-executor`.
//!
//! The locker core spawns its actuator and monitor tasks through the
//! [`TaskSpawner`] port; this hands them to the single-threaded executor
//! that `main` drives with `futures_lite::future::block_on`.

use edge_executor::LocalExecutor;

use crate::app::ports::{LocalTask, TaskSpawner};

impl<const C: usize> TaskSpawner for LocalExecutor<'static, C> {
    fn spawn_local(&self, task: LocalTask) {
        self.spawn(task).detach();
    }
}
