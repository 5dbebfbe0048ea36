// ==========================================
// 搅拌站配料控制系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 在文档存储端口之上提供类型化的读写
// 约束: 所有存储访问都经过注入的 DocumentStore
// ==========================================

pub mod document_store;
pub mod error;
pub mod formula_repo;
pub mod print_queue_repo;
pub mod production_history_repo;
pub mod schedule_repo;
pub mod sensor_repo;

// 重导出核心仓储
pub use document_store::{
    DocumentChange, DocumentStore, InMemoryDocumentStore, SqliteDocumentStore, Subscription,
};
pub use error::{RepositoryError, RepositoryResult};
pub use formula_repo::FormulaRepository;
pub use print_queue_repo::PrintQueueRepository;
pub use production_history_repo::ProductionHistoryRepository;
pub use schedule_repo::ScheduleRepository;
pub use sensor_repo::{SensorSubscription, WeightSensorRepository};
