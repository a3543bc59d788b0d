//! 实体树分发器（Dispatcher）
//!
//! 把一条事件交给聚合树中的每个实体：
//! - 先序深度优先，父实体先于子实体；
//! - 兄弟实体按访问器声明顺序，再按集合自身顺序；
//! - 每个实体都会收到每条事件，由各自的处理器表决定是否处理；
//! - 失败时按 `TraversalPolicy` 中止或继续。
//!
//! 子实体通过拥有的字段组织，不可能成环，因此不做环检测。
//!
use crate::config::{DispatcherConfig, TraversalPolicy};
use crate::entity::{ChildPosition, EventSourcedEntity};
use crate::error::{ConfigurationError, EntityFailure, HandlerError, HandlerResult};
use crate::inspector::HandlerInspector;
use crate::invoker::{HandleOutcome, HandlerInvoker};
use crate::message::EventMessage;
use crate::resolver::{ResolverChain, ResolverScope};
use bon::Builder;
use std::ops::ControlFlow;
use std::sync::Arc;

// 导入由 bon::Builder 生成的 typestate 模块与状态转换别名
use self::dispatcher_builder::{IsUnset, SetChain, State as BuilderState};

/// 接收子实体的回调：`(子实体位置, 子实体)`
pub type ChildVisitor<'a> =
    dyn FnMut(ChildPosition, &mut dyn DispatchTarget) -> ControlFlow<()> + 'a;

/// 分发过程中的共享上下文
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext<'a> {
    inspector: &'a HandlerInspector,
    chain: &'a Arc<ResolverChain>,
}

impl<'a> DispatchContext<'a> {
    pub fn new(inspector: &'a HandlerInspector, chain: &'a Arc<ResolverChain>) -> Self {
        Self { inspector, chain }
    }

    pub fn inspector(&self) -> &'a HandlerInspector {
        self.inspector
    }

    pub fn chain(&self) -> &'a Arc<ResolverChain> {
        self.chain
    }

    /// 取得实体的调用器：优先复用实例上缓存的（且绑定在同一条链上的）调用器
    pub fn invoker_for<E: EventSourcedEntity>(
        &self,
        entity: &E,
    ) -> Result<Arc<HandlerInvoker<E>>, ConfigurationError> {
        let slot = entity.invoker_slot();
        if let Some(cached) = slot.and_then(|slot| slot.get()) {
            if cached.is_bound_to(self.chain) {
                return Ok(Arc::clone(cached));
            }
        }

        let analysis = self.inspector.analyze::<E>()?;
        let invoker = Arc::new(HandlerInvoker::new(analysis, Arc::clone(self.chain)));
        if let Some(slot) = slot {
            // 已绑定到其他链的缓存保持不变，本次使用临时调用器
            slot.store(Arc::clone(&invoker));
        }
        Ok(invoker)
    }
}

/// 分发目标：实体树中的一个节点（对象安全）
///
/// 所有 `EventSourcedEntity` 自动实现。
pub trait DispatchTarget {
    fn target_name(&self) -> &'static str;

    /// 让本实体（不含子实体）处理事件
    fn handle_event(
        &mut self,
        ctx: &DispatchContext<'_>,
        event: &EventMessage,
    ) -> HandlerResult<HandleOutcome>;

    /// 按声明顺序访问直接子实体
    fn visit_children(
        &mut self,
        ctx: &DispatchContext<'_>,
        visitor: &mut ChildVisitor<'_>,
    ) -> HandlerResult<ControlFlow<()>>;
}

impl<E: EventSourcedEntity> DispatchTarget for E {
    fn target_name(&self) -> &'static str {
        E::entity_name()
    }

    fn handle_event(
        &mut self,
        ctx: &DispatchContext<'_>,
        event: &EventMessage,
    ) -> HandlerResult<HandleOutcome> {
        let invoker = ctx.invoker_for(self)?;
        invoker.invoke(self, event)
    }

    fn visit_children(
        &mut self,
        ctx: &DispatchContext<'_>,
        visitor: &mut ChildVisitor<'_>,
    ) -> HandlerResult<ControlFlow<()>> {
        let analysis = ctx.inspector().analyze::<E>()?;
        for accessor in analysis.children() {
            let (accessor_name, kind) = (accessor.name(), accessor.kind());
            let flow = accessor.visit(self, &mut |index, child: &mut dyn DispatchTarget| {
                let position = ChildPosition {
                    accessor: accessor_name,
                    kind,
                    index,
                };
                visitor(position, child)
            });
            if flow.is_break() {
                return Ok(flow);
            }
        }
        Ok(ControlFlow::Continue(()))
    }
}

/// 单个实体的处理结果
#[derive(Debug)]
pub struct EntityOutcome {
    /// 从根出发的路径，如 `Order.lines[1]`
    pub path: String,
    pub entity: &'static str,
    pub result: HandlerResult<HandleOutcome>,
}

/// 由某个实体处理的记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledBy {
    pub path: String,
    pub entity: &'static str,
    pub method: &'static str,
}

/// 一次分发的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    visited: usize,
    handled: Vec<HandledBy>,
}

impl DispatchReport {
    /// 收到事件的实体数量
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// 实际处理了事件的实体，按遍历顺序
    pub fn handled(&self) -> &[HandledBy] {
        &self.handled
    }

    pub fn handled_paths(&self) -> impl Iterator<Item = &str> {
        self.handled.iter().map(|h| h.path.as_str())
    }
}

/// 实体树分发器
#[derive(Builder, Debug, Clone)]
pub struct Dispatcher {
    #[builder(default = HandlerInspector::global())]
    inspector: Arc<HandlerInspector>,
    chain: Arc<ResolverChain>,
    #[builder(default)]
    config: DispatcherConfig,
}

impl<S: BuilderState> DispatcherBuilder<S> {
    /// 从宿主作用域取得解析链
    pub fn scope(self, scope: &impl ResolverScope) -> DispatcherBuilder<SetChain<S>>
    where
        <S as BuilderState>::Chain: IsUnset,
    {
        self.chain(scope.resolver_chain())
    }
}

impl Dispatcher {
    /// 使用全局检查器与默认配置
    pub fn new(chain: Arc<ResolverChain>) -> Self {
        Self::builder().chain(chain).build()
    }

    pub fn for_scope(scope: &impl ResolverScope) -> Self {
        Self::builder().scope(scope).build()
    }

    pub fn inspector(&self) -> &Arc<HandlerInspector> {
        &self.inspector
    }

    pub fn chain(&self) -> &Arc<ResolverChain> {
        &self.chain
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// 按配置的策略把事件分发给整棵树
    pub fn apply(
        &self,
        root: &mut dyn DispatchTarget,
        event: &EventMessage,
    ) -> HandlerResult<DispatchReport> {
        let policy = self.config.policy;
        let mut report = DispatchReport::default();
        let mut failures = Vec::new();
        let mut aborted = None;

        let _ = self.apply_with(root, event, |outcome| {
            report.visited += 1;
            match outcome.result {
                Ok(HandleOutcome::Handled { method }) => report.handled.push(HandledBy {
                    path: outcome.path,
                    entity: outcome.entity,
                    method,
                }),
                Ok(HandleOutcome::Unhandled) => {}
                Err(error) => match policy {
                    TraversalPolicy::AbortOnError => {
                        aborted = Some(error);
                        return ControlFlow::Break(());
                    }
                    TraversalPolicy::ContinueOnError => {
                        tracing::warn!(
                            path = %outcome.path,
                            entity = outcome.entity,
                            %error,
                            "entity failed, continuing"
                        );
                        failures.push(EntityFailure {
                            path: outcome.path,
                            entity: outcome.entity,
                            error,
                        });
                    }
                },
            }
            ControlFlow::Continue(())
        });

        if let Some(error) = aborted {
            return Err(error);
        }
        if !failures.is_empty() {
            return Err(HandlerError::EntityFailures(failures));
        }
        Ok(report)
    }

    /// 把每个实体的结果交给调用方，由其决定继续还是中止
    ///
    /// 某实体的类配置无效时不再访问其子实体。
    pub fn apply_with<F>(
        &self,
        root: &mut dyn DispatchTarget,
        event: &EventMessage,
        mut on_outcome: F,
    ) -> ControlFlow<()>
    where
        F: FnMut(EntityOutcome) -> ControlFlow<()>,
    {
        let ctx = DispatchContext::new(&self.inspector, &self.chain);
        let path = root.target_name().to_string();
        walk(&ctx, root, path, event, &mut on_outcome)
    }

    /// 依次应用一组事件；某条事件失败时停止并返回该错误
    pub fn apply_all<'e, I>(
        &self,
        root: &mut dyn DispatchTarget,
        events: I,
    ) -> HandlerResult<Vec<DispatchReport>>
    where
        I: IntoIterator<Item = &'e EventMessage>,
    {
        let mut reports = Vec::new();
        for event in events {
            reports.push(self.apply(&mut *root, event)?);
        }
        Ok(reports)
    }
}

fn walk(
    ctx: &DispatchContext<'_>,
    target: &mut dyn DispatchTarget,
    path: String,
    event: &EventMessage,
    on_outcome: &mut dyn FnMut(EntityOutcome) -> ControlFlow<()>,
) -> ControlFlow<()> {
    let entity = target.target_name();
    tracing::trace!(path = %path, entity, "offering event");

    let result = target.handle_event(ctx, event);
    let misconfigured = matches!(result, Err(HandlerError::Configuration(_)));
    on_outcome(EntityOutcome {
        path: path.clone(),
        entity,
        result,
    })?;

    // 只有类分析失败时才跳过子树；选择歧义不影响子实体
    let visited = target.visit_children(ctx, &mut |position, child| {
        walk(ctx, child, format!("{path}.{position}"), event, &mut *on_outcome)
    });
    match visited {
        Ok(flow) => flow,
        // 分析错误已随本实体的结果报告
        Err(HandlerError::Configuration(_)) if misconfigured => ControlFlow::Continue(()),
        Err(error) => on_outcome(EntityOutcome {
            path,
            entity,
            result: Err(error),
        }),
    }
}

/// 使用全局检查器与 `AbortOnError` 策略分发事件
pub fn dispatch(
    root: &mut dyn DispatchTarget,
    event: &EventMessage,
    chain: &Arc<ResolverChain>,
) -> HandlerResult<DispatchReport> {
    Dispatcher::new(Arc::clone(chain)).apply(root, event)
}
