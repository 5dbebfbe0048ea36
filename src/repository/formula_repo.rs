// ==========================================
// 搅拌站配料控制系统 - 配合比仓储
// ==========================================
// 文档: job_mix_formulas (Formula 数组)
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::formula::Formula;
use crate::repository::document_store::DocumentStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use std::sync::Arc;

pub const FORMULAS_KEY: &str = "job_mix_formulas";

pub struct FormulaRepository {
    store: Arc<dyn DocumentStore>,
}

impl FormulaRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 读取全部配合比（文档不存在时为空）
    pub fn list(&self) -> RepositoryResult<Vec<Formula>> {
        match self.store.get(FORMULAS_KEY)? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                RepositoryError::SerializationError {
                    key: FORMULAS_KEY.to_string(),
                    message: e.to_string(),
                }
            }),
            None => Ok(Vec::new()),
        }
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Formula>> {
        Ok(self.list()?.into_iter().find(|f| f.id == id))
    }

    /// 按等级查找第一条匹配的配合比
    pub fn find_by_grade(&self, grade: &str) -> RepositoryResult<Option<Formula>> {
        Ok(self.list()?.into_iter().find(|f| f.matches_grade(grade)))
    }

    /// 整体覆盖写入
    pub fn save_all(&self, formulas: &[Formula]) -> RepositoryResult<()> {
        let value = serde_json::to_value(formulas)?;
        self.store.set(FORMULAS_KEY, value)
    }

    /// 新增或替换（按 id）
    pub fn upsert(&self, formula: Formula) -> RepositoryResult<()> {
        if formula.id.trim().is_empty() {
            return Err(RepositoryError::ValidationError("配合比 id 不能为空".to_string()));
        }
        let mut formulas = self.list()?;
        match formulas.iter_mut().find(|f| f.id == formula.id) {
            Some(existing) => *existing = formula,
            None => formulas.push(formula),
        }
        self.save_all(&formulas)
    }
}
