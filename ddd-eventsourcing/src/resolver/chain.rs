use super::ParameterResolver;
use super::builtin::{MessagePropertyResolver, MetadataResolver, PayloadResolver};
use crate::error::{HandlerError, HandlerResult};
use crate::handler::{ParameterSlot, ResolvedValue};
use crate::message::EventMessage;
use std::fmt;
use std::sync::Arc;

/// 解析链：按顺序组合多个解析器
///
/// 构建后不再修改，可在多线程间无锁共享（通常包在 `Arc` 中下发给所有调用器）。
#[derive(Clone)]
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn ParameterResolver>>,
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self::from_iter(vec![])
    }
}

impl ResolverChain {
    /// 内置的专用解析器：载荷、元数据、消息属性
    pub fn standard() -> Self {
        Self::builder().standard().build()
    }

    pub fn builder() -> ResolverChainBuilder {
        ResolverChainBuilder::default()
    }

    pub fn resolvers(&self) -> &[Arc<dyn ParameterResolver>] {
        &self.resolvers
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// 按链顺序找到第一个接受该槽的解析器
    pub fn resolver_for(&self, slot: &ParameterSlot) -> Option<&Arc<dyn ParameterResolver>> {
        self.resolvers.iter().find(|r| r.accepts(slot))
    }

    fn push_flattened(&mut self, resolver: Arc<dyn ParameterResolver>) {
        match resolver.as_chain() {
            Some(nested) => self.resolvers.extend(nested.resolvers.iter().cloned()),
            None => self.resolvers.push(resolver),
        }
    }
}

impl ParameterResolver for ResolverChain {
    fn name(&self) -> &str {
        "resolver-chain"
    }

    fn accepts(&self, slot: &ParameterSlot) -> bool {
        self.resolver_for(slot).is_some()
    }

    fn resolve(&self, slot: &ParameterSlot, event: &EventMessage) -> HandlerResult<ResolvedValue> {
        match self.resolver_for(slot) {
            Some(resolver) => resolver.resolve(slot, event),
            None => Err(HandlerError::resolution(
                self.name(),
                format!("no resolver accepts slot {slot}"),
            )),
        }
    }

    fn as_chain(&self) -> Option<&ResolverChain> {
        Some(self)
    }
}

impl fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.resolvers.iter().map(|r| r.name()))
            .finish()
    }
}

impl FromIterator<Arc<dyn ParameterResolver>> for ResolverChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn ParameterResolver>>>(iter: I) -> Self {
        let mut chain = Self {
            resolvers: Vec::new(),
        };
        chain.extend(iter);
        chain
    }
}

impl Extend<Arc<dyn ParameterResolver>> for ResolverChain {
    fn extend<I: IntoIterator<Item = Arc<dyn ParameterResolver>>>(&mut self, iter: I) {
        for resolver in iter {
            self.push_flattened(resolver);
        }
    }
}

/// 按给定顺序构建解析链（嵌套链被展开）
pub fn build_resolver_chain<I>(resolvers: I) -> ResolverChain
where
    I: IntoIterator<Item = Arc<dyn ParameterResolver>>,
{
    resolvers.into_iter().collect()
}

/// 解析链构建器
///
/// 最终顺序：显式添加的解析器（按添加顺序）→ 发现的解析器（按优先级降序，
/// 同优先级保持发现顺序）→ 兜底解析器（按添加顺序）。
#[derive(Default)]
pub struct ResolverChainBuilder {
    leading: Vec<Arc<dyn ParameterResolver>>,
    discovered: Vec<Arc<dyn ParameterResolver>>,
    fallback: Vec<Arc<dyn ParameterResolver>>,
}

impl ResolverChainBuilder {
    /// 追加内置的专用解析器
    pub fn standard(self) -> Self {
        self.resolver(PayloadResolver)
            .resolver(MetadataResolver)
            .resolver(MessagePropertyResolver)
    }

    pub fn resolver<R: ParameterResolver + 'static>(mut self, resolver: R) -> Self {
        self.leading.push(Arc::new(resolver));
        self
    }

    pub fn shared(mut self, resolver: Arc<dyn ParameterResolver>) -> Self {
        self.leading.push(resolver);
        self
    }

    /// 部署环境中发现的解析器
    pub fn discovered<I>(mut self, resolvers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ParameterResolver>>,
    {
        self.discovered.extend(resolvers);
        self
    }

    /// 放在链尾的宽泛解析器（如依赖查找）
    pub fn fallback<R: ParameterResolver + 'static>(mut self, resolver: R) -> Self {
        self.fallback.push(Arc::new(resolver));
        self
    }

    pub fn build(self) -> ResolverChain {
        let Self {
            leading,
            mut discovered,
            fallback,
        } = self;
        // sort_by_key 是稳定排序
        discovered.sort_by_key(|r| std::cmp::Reverse(r.priority()));

        leading
            .into_iter()
            .chain(discovered)
            .chain(fallback)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::SlotKind;

    struct Tagged {
        tag: &'static str,
        priority: i32,
        answer: &'static str,
    }

    impl ParameterResolver for Tagged {
        fn name(&self) -> &str {
            self.answer
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn accepts(&self, slot: &ParameterSlot) -> bool {
            slot.kind() == SlotKind::Custom(self.tag)
        }

        fn resolve(&self, _slot: &ParameterSlot, _event: &EventMessage) -> HandlerResult<ResolvedValue> {
            Ok(Box::new(self.answer))
        }
    }

    fn tagged(tag: &'static str, priority: i32, answer: &'static str) -> Arc<dyn ParameterResolver> {
        Arc::new(Tagged {
            tag,
            priority,
            answer,
        })
    }

    fn names(chain: &ResolverChain) -> Vec<&str> {
        chain.resolvers().iter().map(|r| r.name()).collect()
    }

    #[test]
    fn first_accepting_member_wins() {
        let chain = build_resolver_chain(vec![
            tagged("a", 0, "first"),
            tagged("a", 0, "second"),
            tagged("b", 0, "third"),
        ]);
        let slot = ParameterSlot::of::<&str>(SlotKind::Custom("a"));
        assert!(chain.accepts(&slot));
        assert_eq!(chain.resolver_for(&slot).map(|r| r.name()), Some("first"));

        let other = ParameterSlot::of::<&str>(SlotKind::Custom("zzz"));
        assert!(!chain.accepts(&other));
        let message = EventMessage::new(crate::test_support::Noop);
        assert!(matches!(
            chain.resolve(&other, &message),
            Err(HandlerError::Resolution { .. })
        ));
    }

    #[test]
    fn nested_chains_are_flattened() {
        let inner: Arc<dyn ParameterResolver> =
            Arc::new(build_resolver_chain(vec![tagged("a", 0, "x"), tagged("b", 0, "y")]));
        let chain = build_resolver_chain(vec![tagged("c", 0, "w"), inner, tagged("d", 0, "z")]);
        assert_eq!(names(&chain), vec!["w", "x", "y", "z"]);
    }

    #[test]
    fn builder_orders_leading_discovered_by_priority_then_fallback() {
        let chain = ResolverChain::builder()
            .shared(tagged("a", -5, "lead"))
            .discovered(vec![
                tagged("a", 0, "d0"),
                tagged("a", 10, "d10"),
                tagged("a", 0, "d0-late"),
            ])
            .fallback(Tagged {
                tag: "a",
                priority: 100,
                answer: "tail",
            })
            .build();
        assert_eq!(names(&chain), vec!["lead", "d10", "d0", "d0-late", "tail"]);
    }

    #[test]
    fn standard_chain_has_builtin_resolvers() {
        assert_eq!(ResolverChain::standard().len(), 3);
        assert!(ResolverChain::default().is_empty());
    }
}
