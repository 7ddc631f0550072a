//! 面向展示层的错误分类
//!
//! 各层保留自己的 `thiserror` 错误类型；展示层只需根据 [`ErrorKind`] 做出具体反应
//! （例如抽词集合为空时提示用户调整筛选条件）。

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 存储操作无法完成；会话状态保持不变
    StoreUnavailable,
    /// 当前筛选条件下没有可抽取的词汇
    SelectionExhausted,
    /// 批量导入中的单行校验失败；计数并跳过
    ImportRowInvalid,
    /// 断点数据无法解析；视为不存在
    ResumeDataCorrupt,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::SelectionExhausted => "selection_exhausted",
            ErrorKind::ImportRowInvalid => "import_row_invalid",
            ErrorKind::ResumeDataCorrupt => "resume_data_corrupt",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
