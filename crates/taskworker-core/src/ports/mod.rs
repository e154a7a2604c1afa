//! Ports - 外部コラボレータへのインターフェース
//!
//! Worker は broker / runner / auditor をこの trait 越しにしか触らない。
//! 実装はアプリ側が用意する（開発用の in-memory broker は `crate::queue`、auditor は `crate::audit`）。

pub mod auditor;
pub mod broker;
pub mod clock;
pub mod id_generator;
pub mod runner;

pub use self::auditor::{AuditError, AuditEvent, AuditEventDescriptor, AuditMeta, Auditor, Severity};
pub use self::broker::{BrokerError, TaskBroker, TaskContext};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::runner::WorkflowRunner;
