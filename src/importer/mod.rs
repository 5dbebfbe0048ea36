// ==========================================
// 搅拌站配料控制系统 - 导入层
// ==========================================
// 职责: 外部表格导入配合比与生产计划
// 支持: Excel, CSV
// ==========================================

pub mod error;
pub mod file_parser;
pub mod formula_importer;
pub mod schedule_importer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRecord, UniversalFileParser};
pub use formula_importer::{FormulaImporter, ImportIssue, ImportReport};
pub use schedule_importer::ScheduleImporter;
