use bon::Builder;
use serde::{Deserialize, Serialize};

/// 遍历中某个实体失败后的处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalPolicy {
    /// 第一个失败即停止遍历并原样返回该错误
    #[default]
    AbortOnError,
    /// 访问全部实体，最后汇总所有失败
    ContinueOnError,
}

/// 分发器配置
#[derive(Builder, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    #[builder(default)]
    pub policy: TraversalPolicy,
}
