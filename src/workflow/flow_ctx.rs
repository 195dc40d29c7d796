//! 流程上下文
//!
//! 封装"我正在为谁执行哪个动作"这一信息，只用于日志

use std::fmt::Display;

use crate::models::attendance::AttendanceAction;

#[derive(Debug, Clone)]
pub struct FlowCtx {
    /// 用户标识（存储中的 key）
    pub user_id: String,

    pub action: AttendanceAction,

    /// 批量任务中的序号（从1开始，单次调用为 0）
    pub job_index: usize,
}

impl FlowCtx {
    pub fn new(user_id: impl Into<String>, action: AttendanceAction) -> Self {
        Self {
            user_id: user_id.into(),
            action,
            job_index: 0,
        }
    }

    pub fn with_job_index(mut self, job_index: usize) -> Self {
        self.job_index = job_index;
        self
    }
}

impl Display for FlowCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.job_index > 0 {
            write!(
                f,
                "[任务 #{} 用户 #{} 动作 #{}]",
                self.job_index, self.user_id, self.action
            )
        } else {
            write!(f, "[用户 #{} 动作 #{}]", self.user_id, self.action)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ctx = FlowCtx::new("u-1", AttendanceAction::Entry);
        assert_eq!(ctx.to_string(), "[用户 #u-1 动作 #entry]");
        assert_eq!(
            ctx.with_job_index(3).to_string(),
            "[任务 #3 用户 #u-1 动作 #entry]"
        );
    }
}
