//! App - ports を組み合わせた worker 本体
//!
//! # 主要コンポーネント
//! - **ConcurrencyGate**: 同時実行数の上限
//! - **TaskExecutor**: 1 task の validate → execute → complete
//! - **DispatchLoop**: slot 待ち → claim → spawn
//! - **RecoveryLoop**: 孤児 task の定期回収
//! - **ShutdownController**: 停止シグナルと graceful drain
//! - **TaskWorker / TaskWorkerBuilder**: 公開 API

pub mod builder;
pub mod dispatch_loop;
pub mod executor;
pub mod gate;
pub mod recovery_loop;
pub mod shutdown;
pub mod status;
pub mod worker;

pub use self::builder::{BuildError, TaskWorkerBuilder};
pub use self::dispatch_loop::DispatchLoop;
pub use self::executor::TaskExecutor;
pub use self::gate::{ConcurrencyGate, GatePermit};
pub use self::recovery_loop::RecoveryLoop;
pub use self::shutdown::{ShutdownController, StopSignal};
pub use self::status::{WorkerState, WorkerStatus};
pub use self::worker::TaskWorker;
