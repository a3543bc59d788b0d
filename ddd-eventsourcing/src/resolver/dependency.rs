use super::ParameterResolver;
use crate::error::{HandlerError, HandlerResult};
use crate::handler::{ParameterSlot, ResolvedValue, SlotKind};
use crate::message::EventMessage;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type DependencyKey = (TypeId, Option<&'static str>);

/// 外部依赖解析器：按类型（可附带限定名）从只读注册表中查找共享实例
///
/// 注册表在构建后不可修改。由于它只看参数槽的声明类型，接受面很宽，
/// 应作为兜底解析器放在链尾。
#[derive(Clone, Default)]
pub struct DependencyResolver {
    registry: HashMap<DependencyKey, Arc<dyn Any + Send + Sync>>,
    names: HashMap<DependencyKey, &'static str>,
}

impl DependencyResolver {
    pub fn builder() -> DependencyResolverBuilder {
        DependencyResolverBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    fn key_of(slot: &ParameterSlot) -> Option<DependencyKey> {
        match slot.kind() {
            SlotKind::Dependency { name } => Some((slot.declared().id(), name)),
            _ => None,
        }
    }
}

impl ParameterResolver for DependencyResolver {
    fn name(&self) -> &str {
        "dependency"
    }

    fn accepts(&self, slot: &ParameterSlot) -> bool {
        Self::key_of(slot).is_some_and(|key| self.registry.contains_key(&key))
    }

    fn resolve(&self, slot: &ParameterSlot, _event: &EventMessage) -> HandlerResult<ResolvedValue> {
        Self::key_of(slot)
            .and_then(|key| self.registry.get(&key))
            .map(|shared| Box::new(Arc::clone(shared)) as ResolvedValue)
            .ok_or_else(|| HandlerError::resolution(self.name(), format!("not registered: {slot}")))
    }
}

impl fmt::Debug for DependencyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.names.values().copied().collect();
        entries.sort_unstable();
        f.debug_struct("DependencyResolver")
            .field("registered", &entries)
            .finish()
    }
}

/// 依赖注册表构建器
#[derive(Default)]
pub struct DependencyResolverBuilder {
    inner: DependencyResolver,
}

impl DependencyResolverBuilder {
    /// 按类型注册；同类型重复注册时后者覆盖前者
    pub fn register<T: Any + Send + Sync>(self, value: Arc<T>) -> Self {
        self.insert((TypeId::of::<T>(), None), std::any::type_name::<T>(), value)
    }

    /// 按类型与限定名注册
    pub fn register_named<T: Any + Send + Sync>(self, name: &'static str, value: Arc<T>) -> Self {
        self.insert((TypeId::of::<T>(), Some(name)), name, value)
    }

    fn insert(
        mut self,
        key: DependencyKey,
        label: &'static str,
        value: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        self.inner.registry.insert(key, value);
        self.inner.names.insert(key, label);
        self
    }

    pub fn build(self) -> DependencyResolver {
        self.inner
    }
}
