use crate::entity::ChildAccessor;
use crate::error::{ConfigurationError, HandlerResult};
use crate::handler::{ParameterSlot, ResolvedValue};
use crate::payload::PayloadType;
use dashmap::DashMap;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// 类型擦除后的处理器调用：参数已全部解析
pub type HandlerCall<E> =
    Arc<dyn Fn(&mut E, Vec<ResolvedValue>) -> HandlerResult<()> + Send + Sync>;

pub(crate) fn erase_call<E, F>(call: F) -> HandlerCall<E>
where
    F: Fn(&mut E, Vec<ResolvedValue>) -> HandlerResult<()> + Send + Sync + 'static,
{
    Arc::new(call)
}

/// 处理器签名
pub struct HandlerSignature<E> {
    accepts: PayloadType,
    declared_by: &'static str,
    depth: usize,
    method: &'static str,
    slots: Vec<ParameterSlot>,
    call: HandlerCall<E>,
}

impl<E: 'static> HandlerSignature<E> {
    pub(crate) fn new(
        accepts: PayloadType,
        declared_by: &'static str,
        depth: usize,
        method: &'static str,
        slots: Vec<ParameterSlot>,
        call: HandlerCall<E>,
    ) -> Self {
        Self {
            accepts,
            declared_by,
            depth,
            method,
            slots,
            call,
        }
    }

    /// 经由祖先投影提升到派生实体上，层级深度加一
    pub(crate) fn lift<D: 'static>(self, project: fn(&mut D) -> &mut E) -> HandlerSignature<D> {
        let call = self.call;
        HandlerSignature {
            accepts: self.accepts,
            declared_by: self.declared_by,
            depth: self.depth + 1,
            method: self.method,
            slots: self.slots,
            call: erase_call(move |entity: &mut D, args| call(project(entity), args)),
        }
    }
}

impl<E> HandlerSignature<E> {
    /// 接收的载荷类型
    pub fn accepts(&self) -> PayloadType {
        self.accepts
    }

    /// 声明该处理器的实体类
    pub fn declared_by(&self) -> &'static str {
        self.declared_by
    }

    /// 层级深度，0 表示最派生的类型
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn slots(&self) -> &[ParameterSlot] {
        &self.slots
    }

    pub fn call(&self, entity: &mut E, args: Vec<ResolvedValue>) -> HandlerResult<()> {
        (self.call)(entity, args)
    }
}

impl<E> fmt::Debug for HandlerSignature<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSignature")
            .field("accepts", &self.accepts)
            .field("declared_by", &self.declared_by)
            .field("depth", &self.depth)
            .field("method", &self.method)
            .field("slots", &self.slots)
            .finish()
    }
}

type Selection = Result<Option<usize>, ConfigurationError>;

/// 实体类分析结果
///
/// 除选择备忘录外不可变；备忘录只是同一张表的纯函数结果，并发写入相同的值。
pub struct EntityClassAnalysis<E> {
    entity: &'static str,
    handlers: Vec<HandlerSignature<E>>,
    children: Vec<ChildAccessor<E>>,
    // narrower[i]：接收类型是 handlers[i] 的严格子类型的处理器下标
    narrower: Vec<Vec<usize>>,
    selections: DashMap<TypeId, Selection>,
}

impl<E> EntityClassAnalysis<E> {
    pub(crate) fn new(
        entity: &'static str,
        handlers: Vec<HandlerSignature<E>>,
        children: Vec<ChildAccessor<E>>,
    ) -> Self {
        let narrower = handlers
            .iter()
            .map(|wide| {
                handlers
                    .iter()
                    .enumerate()
                    .filter(|(_, narrow)| wide.accepts.is_strict_supertype_of(&narrow.accepts))
                    .map(|(index, _)| index)
                    .collect()
            })
            .collect();
        Self {
            entity,
            handlers,
            children,
            narrower,
            selections: DashMap::new(),
        }
    }

    pub fn entity_name(&self) -> &'static str {
        self.entity
    }

    /// 全部处理器：本类声明顺序在前，祖先在后
    pub fn handlers(&self) -> &[HandlerSignature<E>] {
        &self.handlers
    }

    /// 子实体访问器：本类声明顺序在前，祖先在后
    pub fn children(&self) -> &[ChildAccessor<E>] {
        &self.children
    }

    pub fn handler(&self, method: &str) -> Option<&HandlerSignature<E>> {
        self.handlers.iter().find(|h| h.method == method)
    }

    /// 为运行时载荷类型选择最具体的处理器
    ///
    /// 1. 接收类型可赋值自运行时类型的处理器入选；
    /// 2. 去掉存在更窄入选者的处理器；
    /// 3. 仍有多个时保留层级深度最小者；
    /// 4. 还有多个则为歧义配置。
    pub fn select(
        &self,
        runtime: &PayloadType,
    ) -> Result<Option<&HandlerSignature<E>>, ConfigurationError> {
        let key = runtime.type_id();
        let cached = self.selections.get(&key).map(|entry| entry.value().clone());
        let selection = match cached {
            Some(selection) => selection,
            None => {
                let selection = self.compute_selection(runtime);
                self.selections.insert(key, selection.clone());
                selection
            }
        };
        selection.map(|index| index.map(|index| &self.handlers[index]))
    }

    fn compute_selection(&self, runtime: &PayloadType) -> Selection {
        let qualifying: Vec<usize> = self
            .handlers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.accepts.is_assignable_from(runtime))
            .map(|(index, _)| index)
            .collect();
        if qualifying.is_empty() {
            return Ok(None);
        }

        let minimal: Vec<usize> = qualifying
            .iter()
            .copied()
            .filter(|&i| !self.narrower[i].iter().any(|j| qualifying.contains(j)))
            .collect();
        if let [only] = minimal.as_slice() {
            return Ok(Some(*only));
        }

        let closest = minimal
            .iter()
            .map(|&i| self.handlers[i].depth)
            .min()
            .unwrap_or_default();
        let nearest: Vec<usize> = minimal
            .into_iter()
            .filter(|&i| self.handlers[i].depth == closest)
            .collect();
        match nearest.as_slice() {
            [only] => Ok(Some(*only)),
            _ => Err(ConfigurationError::AmbiguousHandler {
                entity: self.entity,
                payload: runtime.name(),
                candidates: nearest.iter().map(|&i| self.handlers[i].method).collect(),
            }),
        }
    }
}

impl<E> fmt::Debug for EntityClassAnalysis<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityClassAnalysis")
            .field("entity", &self.entity)
            .field("handlers", &self.handlers)
            .field("children", &self.children)
            .finish()
    }
}
