use super::EventSourcedEntity;
use crate::dispatcher::DispatchTarget;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::hash::BuildHasher;
use std::ops::ControlFlow;
use std::sync::Arc;

/// 接收子实体的回调：`(在访问器中的位置, 子实体)`
pub type ChildSink<'a> = dyn FnMut(usize, &mut dyn DispatchTarget) -> ControlFlow<()> + 'a;

pub(crate) type ChildVisit<E> =
    Arc<dyn Fn(&mut E, &mut ChildSink<'_>) -> ControlFlow<()> + Send + Sync>;

fn visitor<E, F>(visit: F) -> ChildVisit<E>
where
    F: Fn(&mut E, &mut ChildSink<'_>) -> ControlFlow<()> + Send + Sync + 'static,
{
    Arc::new(visit)
}

/// 子实体访问器的形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    /// 单个字段，始终存在
    Single,
    /// `Option<T>`，为空时不产出
    Optional,
    /// 集合，按集合自身的迭代顺序产出
    Collection,
}

/// 可作为子实体容器的字段类型
///
/// `HashMap` 的迭代顺序未指定，需要确定顺序时使用 `BTreeMap`。
pub trait ChildEntities: 'static {
    const KIND: AccessorKind;

    fn for_each_child(&mut self, sink: &mut ChildSink<'_>) -> ControlFlow<()>;
}

fn feed<'a, T, I>(children: I, sink: &mut ChildSink<'_>) -> ControlFlow<()>
where
    T: EventSourcedEntity,
    I: IntoIterator<Item = &'a mut T>,
{
    for (position, child) in children.into_iter().enumerate() {
        sink(position, child)?;
    }
    ControlFlow::Continue(())
}

impl<T: EventSourcedEntity> ChildEntities for Option<T> {
    const KIND: AccessorKind = AccessorKind::Optional;

    fn for_each_child(&mut self, sink: &mut ChildSink<'_>) -> ControlFlow<()> {
        feed(self.iter_mut(), sink)
    }
}

impl<T: EventSourcedEntity> ChildEntities for Vec<T> {
    const KIND: AccessorKind = AccessorKind::Collection;

    fn for_each_child(&mut self, sink: &mut ChildSink<'_>) -> ControlFlow<()> {
        feed(self.iter_mut(), sink)
    }
}

impl<T: EventSourcedEntity> ChildEntities for VecDeque<T> {
    const KIND: AccessorKind = AccessorKind::Collection;

    fn for_each_child(&mut self, sink: &mut ChildSink<'_>) -> ControlFlow<()> {
        feed(self.iter_mut(), sink)
    }
}

impl<K: 'static, T: EventSourcedEntity> ChildEntities for BTreeMap<K, T> {
    const KIND: AccessorKind = AccessorKind::Collection;

    fn for_each_child(&mut self, sink: &mut ChildSink<'_>) -> ControlFlow<()> {
        feed(self.values_mut(), sink)
    }
}

impl<K, T, S> ChildEntities for HashMap<K, T, S>
where
    K: 'static,
    T: EventSourcedEntity,
    S: BuildHasher + 'static,
{
    const KIND: AccessorKind = AccessorKind::Collection;

    fn for_each_child(&mut self, sink: &mut ChildSink<'_>) -> ControlFlow<()> {
        feed(self.values_mut(), sink)
    }
}

/// 子实体访问器描述
pub struct ChildAccessor<E> {
    name: &'static str,
    kind: AccessorKind,
    declared_by: &'static str,
    visit: ChildVisit<E>,
}

impl<E: 'static> ChildAccessor<E> {
    pub(crate) fn single<T: EventSourcedEntity>(
        name: &'static str,
        declared_by: &'static str,
        project: fn(&mut E) -> &mut T,
    ) -> Self {
        Self {
            name,
            kind: AccessorKind::Single,
            declared_by,
            visit: visitor(move |entity, sink| sink(0, project(entity))),
        }
    }

    pub(crate) fn collection<C: ChildEntities>(
        name: &'static str,
        declared_by: &'static str,
        project: fn(&mut E) -> &mut C,
    ) -> Self {
        Self {
            name,
            kind: C::KIND,
            declared_by,
            visit: visitor(move |entity, sink| project(entity).for_each_child(sink)),
        }
    }

    /// 经由祖先投影，把祖先声明的访问器提升到派生实体上
    pub(crate) fn lift<D: 'static>(self, project: fn(&mut D) -> &mut E) -> ChildAccessor<D> {
        let visit = self.visit;
        ChildAccessor {
            name: self.name,
            kind: self.kind,
            declared_by: self.declared_by,
            visit: visitor(move |entity, sink| visit(project(entity), sink)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> AccessorKind {
        self.kind
    }

    pub fn declared_by(&self) -> &'static str {
        self.declared_by
    }

    /// 依次把该访问器下的子实体交给 `sink`
    pub fn visit(&self, entity: &mut E, sink: &mut ChildSink<'_>) -> ControlFlow<()> {
        (self.visit)(entity, sink)
    }
}

impl<E> fmt::Debug for ChildAccessor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildAccessor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("declared_by", &self.declared_by)
            .finish()
    }
}

/// 子实体在父实体中的位置，用于拼接遍历路径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildPosition {
    pub accessor: &'static str,
    pub kind: AccessorKind,
    pub index: usize,
}

impl fmt::Display for ChildPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AccessorKind::Collection => write!(f, "{}[{}]", self.accessor, self.index),
            AccessorKind::Single | AccessorKind::Optional => f.write_str(self.accessor),
        }
    }
}
