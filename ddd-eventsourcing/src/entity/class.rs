use super::children::{ChildAccessor, ChildEntities};
use super::EventSourcedEntity;
use crate::error::ConfigurationError;
use crate::handler::{Handler, ParameterSlot};
use crate::inspector::{HandlerCall, HandlerSignature, erase_call};
use crate::payload::{PayloadKind, PayloadType};
use std::collections::{HashMap, HashSet};

/// 实体类的声明表，由 `EventSourcedEntity::describe` 填充
pub struct EntityClass<E> {
    entity: &'static str,
    handlers: Vec<HandlerDeclaration<E>>,
    children: Vec<ChildAccessor<E>>,
    ancestor: Option<Result<ClassTable<E>, ConfigurationError>>,
    ancestors_declared: usize,
}

/// 一个处理器方法的声明
pub struct HandlerDeclaration<E> {
    method: &'static str,
    payload: Option<PayloadType>,
    slots: Vec<ParameterSlot>,
    call: HandlerCall<E>,
}

impl<E> HandlerDeclaration<E> {
    /// 显式指定接收的载荷类型；此时首个参数不必是载荷
    pub fn payload<P: PayloadKind>(&mut self) -> &mut Self {
        self.payload = Some(P::kind());
        self
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn slots(&self) -> &[ParameterSlot] {
        &self.slots
    }
}

/// 校验并合并祖先后的类表
pub(crate) struct ClassTable<E> {
    pub(crate) handlers: Vec<HandlerSignature<E>>,
    pub(crate) children: Vec<ChildAccessor<E>>,
}

impl<E: EventSourcedEntity> EntityClass<E> {
    pub(crate) fn new() -> Self {
        Self {
            entity: E::entity_name(),
            handlers: Vec::new(),
            children: Vec::new(),
            ancestor: None,
            ancestors_declared: 0,
        }
    }

    pub fn entity_name(&self) -> &'static str {
        self.entity
    }

    /// 声明处理器方法；`method` 是方法名，用于覆盖判断与错误信息
    pub fn handler<Args, H>(&mut self, method: &'static str, handler: H) -> &mut HandlerDeclaration<E>
    where
        Args: 'static,
        H: Handler<E, Args>,
    {
        let index = self.handlers.len();
        self.handlers.push(HandlerDeclaration {
            method,
            payload: None,
            slots: H::slots(),
            call: erase_call(move |entity: &mut E, args| H::call(&handler, entity, args)),
        });
        &mut self.handlers[index]
    }

    /// 声明单个子实体字段
    pub fn child<T: EventSourcedEntity>(
        &mut self,
        name: &'static str,
        project: fn(&mut E) -> &mut T,
    ) -> &mut Self {
        self.children
            .push(ChildAccessor::single(name, self.entity, project));
        self
    }

    /// 声明子实体容器字段（`Option`、`Vec`、`VecDeque`、`BTreeMap`、`HashMap`）
    pub fn children<C: ChildEntities>(
        &mut self,
        name: &'static str,
        project: fn(&mut E) -> &mut C,
    ) -> &mut Self {
        self.children
            .push(ChildAccessor::collection(name, self.entity, project));
        self
    }

    /// 声明祖先：`project` 取出实体中嵌入的祖先部分
    ///
    /// 祖先的处理器层级深度加一；派生类型声明了同名方法时，祖先的该方法被覆盖。
    /// 覆盖只按方法名判断：即使派生方法接受的载荷类型不同，祖先的同名处理器也不再参与选择。
    /// 至多声明一个祖先。
    pub fn extends<B: EventSourcedEntity>(&mut self, project: fn(&mut E) -> &mut B) -> &mut Self {
        self.ancestors_declared += 1;
        if self.ancestor.is_some() {
            return self;
        }

        let mut base = EntityClass::<B>::new();
        B::describe(&mut base);
        let lifted = base.finish().map(|table| ClassTable {
            handlers: table
                .handlers
                .into_iter()
                .map(|handler| handler.lift(project))
                .collect(),
            children: table
                .children
                .into_iter()
                .map(|accessor| accessor.lift(project))
                .collect(),
        });
        self.ancestor = Some(lifted);
        self
    }

    /// 校验本类声明，并与（已校验的）祖先表合并
    pub(crate) fn finish(self) -> Result<ClassTable<E>, ConfigurationError> {
        let entity = self.entity;
        if self.ancestors_declared > 1 {
            return Err(ConfigurationError::MultipleAncestors { entity });
        }

        let mut methods = HashSet::new();
        let mut accepted: HashMap<PayloadType, &'static str> = HashMap::new();
        let mut handlers = Vec::with_capacity(self.handlers.len());

        for declaration in self.handlers {
            let method = declaration.method;
            if !methods.insert(method) {
                return Err(ConfigurationError::DuplicateMethod { entity, method });
            }

            let accepts = declaration
                .payload
                .or_else(|| declaration.slots.first().and_then(ParameterSlot::payload_type))
                .ok_or(ConfigurationError::MissingPayloadType { entity, method })?;

            if let Some(parameter) = declaration
                .slots
                .iter()
                .filter_map(ParameterSlot::payload_type)
                .find(|parameter| !parameter.is_assignable_from(&accepts))
            {
                return Err(ConfigurationError::IncompatiblePayloadParameter {
                    entity,
                    method,
                    accepts: accepts.name(),
                    parameter: parameter.name(),
                });
            }

            if let Some(first) = accepted.insert(accepts, method) {
                return Err(ConfigurationError::DuplicateHandler {
                    entity,
                    payload: accepts.name(),
                    first,
                    second: method,
                });
            }

            handlers.push(HandlerSignature::new(
                accepts,
                entity,
                0,
                method,
                declaration.slots,
                declaration.call,
            ));
        }

        let mut children = self.children;
        if let Some(ancestor) = self.ancestor {
            let inherited = ancestor?;
            handlers.extend(
                inherited
                    .handlers
                    .into_iter()
                    .filter(|handler| !methods.contains(handler.method())),
            );
            children.extend(inherited.children);
        }

        Ok(ClassTable { handlers, children })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{DynPayload, Payload, SequenceNumber};
    use crate::test_support::{LedgerEvent, Posted, Reversed};

    #[derive(Default)]
    struct Base {
        postings: u32,
    }

    impl Base {
        fn on_posted(&mut self, _event: Payload<Posted>) {
            self.postings += 1;
        }

        fn on_any(&mut self, _event: DynPayload) {}
    }

    impl EventSourcedEntity for Base {
        fn describe(class: &mut EntityClass<Self>) {
            class.handler("on_posted", Self::on_posted);
            class.handler("on_any", Self::on_any);
        }
    }

    #[derive(Default)]
    struct Derived {
        base: Base,
    }

    impl Derived {
        fn on_posted(&mut self, _event: Payload<Posted>) {}
    }

    impl EventSourcedEntity for Derived {
        fn describe(class: &mut EntityClass<Self>) {
            class.handler("on_posted", Self::on_posted);
            class.extends(|derived| &mut derived.base);
        }
    }

    fn table<E: EventSourcedEntity>() -> Result<ClassTable<E>, ConfigurationError> {
        let mut class = EntityClass::<E>::new();
        E::describe(&mut class);
        class.finish()
    }

    #[test]
    fn ancestor_handlers_are_lifted_one_level_deeper() {
        let table = table::<Derived>().unwrap();
        let summary: Vec<_> = table
            .handlers
            .iter()
            .map(|h| (h.method(), h.depth(), h.declared_by()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("on_posted", 0, Derived::entity_name()),
                ("on_any", 1, Base::entity_name()),
            ]
        );
    }

    struct Twice;

    impl Twice {
        fn first(&mut self, _event: Payload<Posted>) {}
        fn second(&mut self, _event: Payload<Posted>) {}
    }

    impl EventSourcedEntity for Twice {
        fn describe(class: &mut EntityClass<Self>) {
            class.handler("first", Self::first);
            class.handler("second", Self::second);
        }
    }

    #[test]
    fn same_payload_twice_on_one_class_is_rejected() {
        let err = table::<Twice>().err().unwrap();
        assert_eq!(
            err,
            ConfigurationError::DuplicateHandler {
                entity: Twice::entity_name(),
                payload: Posted::kind().name(),
                first: "first",
                second: "second",
            }
        );
    }

    struct Explicit;

    impl Explicit {
        fn on_sequence(&mut self, _seq: SequenceNumber) {}
    }

    impl EventSourcedEntity for Explicit {
        fn describe(class: &mut EntityClass<Self>) {
            class
                .handler("on_sequence", Self::on_sequence)
                .payload::<LedgerEvent>();
        }
    }

    struct Untyped;

    impl EventSourcedEntity for Untyped {
        fn describe(class: &mut EntityClass<Self>) {
            class.handler("untyped", |_: &mut Self, _seq: SequenceNumber| {});
        }
    }

    struct Narrowed;

    impl EventSourcedEntity for Narrowed {
        fn describe(class: &mut EntityClass<Self>) {
            class
                .handler("narrowed", |_: &mut Self, _event: Payload<Reversed>| {})
                .payload::<LedgerEvent>();
        }
    }

    #[test]
    fn payload_type_comes_from_declaration_or_first_parameter() {
        let explicit = table::<Explicit>().unwrap();
        assert_eq!(explicit.handlers[0].accepts(), LedgerEvent::kind());

        assert!(matches!(
            table::<Untyped>().err(),
            Some(ConfigurationError::MissingPayloadType { method: "untyped", .. })
        ));
        assert!(matches!(
            table::<Narrowed>().err(),
            Some(ConfigurationError::IncompatiblePayloadParameter { method: "narrowed", .. })
        ));
    }

    struct TwoParents {
        a: Base,
        b: Base,
    }

    impl EventSourcedEntity for TwoParents {
        fn describe(class: &mut EntityClass<Self>) {
            class.extends(|e| &mut e.a).extends(|e| &mut e.b);
        }
    }

    #[test]
    fn at_most_one_ancestor() {
        let _ = TwoParents {
            a: Base::default(),
            b: Base::default(),
        };
        assert!(matches!(
            table::<TwoParents>().err(),
            Some(ConfigurationError::MultipleAncestors { .. })
        ));
    }
}
