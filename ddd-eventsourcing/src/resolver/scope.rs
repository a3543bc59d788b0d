use super::ResolverChain;
use std::sync::{Arc, OnceLock};

/// 宿主环境提供解析链的接口
///
/// 同一作用域内应始终返回同一条链（同一个 `Arc`），实体上缓存的调用器据此判断能否复用。
pub trait ResolverScope {
    fn resolver_chain(&self) -> Arc<ResolverChain>;
}

impl ResolverScope for Arc<ResolverChain> {
    fn resolver_chain(&self) -> Arc<ResolverChain> {
        Arc::clone(self)
    }
}

/// 按作用域"构建一次、向下传递"的解析链持有者
#[derive(Debug, Default)]
pub struct ChainScope {
    chain: OnceLock<Arc<ResolverChain>>,
}

impl ChainScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接以现成的链创建
    pub fn with_chain(chain: ResolverChain) -> Self {
        let scope = Self::default();
        let _ = scope.chain.set(Arc::new(chain));
        scope
    }

    /// 首次调用时构建链，之后返回同一个实例
    pub fn get_or_build<F>(&self, build: F) -> Arc<ResolverChain>
    where
        F: FnOnce() -> ResolverChain,
    {
        Arc::clone(self.chain.get_or_init(|| Arc::new(build())))
    }

    pub fn get(&self) -> Option<&Arc<ResolverChain>> {
        self.chain.get()
    }
}

impl ResolverScope for ChainScope {
    /// 尚未构建时使用内置的标准链
    fn resolver_chain(&self) -> Arc<ResolverChain> {
        self.get_or_build(ResolverChain::standard)
    }
}
