use chrono::{DateTime, TimeZone, Utc};
use ddd_eventsourcing::handler::{
    AggregateId, EventId, MetaValue, MetadataKey, OptionalMetaValue, Param, ParameterSlot, Payload,
    ResolvedValue, SequenceNumber, SlotKind, Timestamp,
};
use ddd_eventsourcing::{
    EventMessage, HandleOutcome, HandlerError, HandlerInvoker, HandlerResult, Metadata,
    ParameterResolver, ResolverChain, dispatch, inspect,
};
use ddd_eventsourcing_macros::{EventPayload, event_sourced};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, EventPayload)]
struct Greeted;

#[derive(Debug, EventPayload)]
struct Withdrawn {
    amount: i64,
}

/// 由自定义解析器提供的问候语
struct Greeting(&'static str);

impl Param for Greeting {
    fn slot() -> ParameterSlot {
        ParameterSlot::of::<&'static str>(SlotKind::Custom("greeting"))
    }

    fn from_resolved(value: ResolvedValue) -> HandlerResult<Self> {
        value
            .downcast::<&'static str>()
            .map(|greeting| Greeting(*greeting))
            .map_err(|_| HandlerError::resolution("greeting", "unexpected value"))
    }
}

struct Fixed {
    answer: &'static str,
    priority: i32,
}

impl Fixed {
    fn new(answer: &'static str) -> Self {
        Self {
            answer,
            priority: 0,
        }
    }
}

impl ParameterResolver for Fixed {
    fn name(&self) -> &str {
        self.answer
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn accepts(&self, slot: &ParameterSlot) -> bool {
        slot.kind() == SlotKind::Custom("greeting")
    }

    fn resolve(&self, _slot: &ParameterSlot, _event: &EventMessage) -> HandlerResult<ResolvedValue> {
        Ok(Box::new(self.answer))
    }
}

#[derive(Default)]
struct Greeter {
    heard: Vec<&'static str>,
}

#[event_sourced(name = "Greeter")]
impl Greeter {
    #[event_handler]
    fn on_greeted(&mut self, _event: Payload<Greeted>, greeting: Greeting) {
        self.heard.push(greeting.0);
    }
}

fn greet(chain: ResolverChain) -> Vec<&'static str> {
    let mut greeter = Greeter::default();
    dispatch(&mut greeter, &EventMessage::new(Greeted), &Arc::new(chain)).unwrap();
    greeter.heard
}

#[test]
fn earlier_resolvers_win() {
    let hello_first = ResolverChain::builder()
        .standard()
        .resolver(Fixed::new("hello"))
        .resolver(Fixed::new("hi"))
        .build();
    assert_eq!(greet(hello_first), vec!["hello"]);

    let hi_first = ResolverChain::builder()
        .standard()
        .resolver(Fixed::new("hi"))
        .resolver(Fixed::new("hello"))
        .build();
    assert_eq!(greet(hi_first), vec!["hi"]);
}

#[test]
fn discovered_resolvers_are_ordered_by_priority() {
    let low: Arc<dyn ParameterResolver> = Arc::new(Fixed {
        answer: "low",
        priority: 1,
    });
    let high: Arc<dyn ParameterResolver> = Arc::new(Fixed {
        answer: "high",
        priority: 10,
    });
    let chain = ResolverChain::builder()
        .standard()
        .discovered(vec![low, high])
        .fallback(Fixed::new("fallback"))
        .build();

    let names: Vec<_> = chain.resolvers().iter().map(|r| r.name()).collect();
    assert_eq!(
        names,
        vec!["payload", "metadata", "message-property", "high", "low", "fallback"]
    );
    assert_eq!(greet(chain), vec!["high"]);
}

#[test]
fn invoker_reports_the_selected_method() {
    let chain = Arc::new(
        ResolverChain::builder()
            .standard()
            .resolver(Fixed::new("hey"))
            .build(),
    );
    let invoker = HandlerInvoker::new(inspect::<Greeter>().unwrap(), chain);
    let mut greeter = Greeter::default();

    let outcome = invoker
        .invoke(&mut greeter, &EventMessage::new(Greeted))
        .unwrap();
    assert_eq!(outcome, HandleOutcome::Handled { method: "on_greeted" });

    let outcome = invoker
        .invoke(&mut greeter, &EventMessage::new(Withdrawn { amount: 1 }))
        .unwrap();
    assert!(!outcome.is_handled());
    assert_eq!(greeter.heard, vec!["hey"]);
}

// ---- 元数据与消息属性 ----

struct Tenant;

impl MetadataKey for Tenant {
    const KEY: &'static str = "tenant";
    type Value = String;
}

struct Actor;

impl MetadataKey for Actor {
    const KEY: &'static str = "actor";
    type Value = String;
}

#[derive(Default)]
struct Audit {
    tenant: Option<String>,
    actor: Option<String>,
    event_id: Option<String>,
    aggregate: Option<String>,
    sequence: Option<u64>,
    at: Option<DateTime<Utc>>,
    tags: usize,
}

#[event_sourced(name = "Audit")]
impl Audit {
    #[event_handler]
    #[allow(clippy::too_many_arguments)]
    fn on_withdrawn(
        &mut self,
        _event: Payload<Withdrawn>,
        tenant: MetaValue<Tenant>,
        actor: OptionalMetaValue<Actor>,
        event_id: EventId,
        aggregate: AggregateId,
        sequence: SequenceNumber,
    ) {
        self.tenant = Some(tenant.0);
        self.actor = actor.0;
        self.event_id = Some(event_id.0);
        self.aggregate = Some(aggregate.0);
        self.sequence = Some(sequence.0);
    }

    #[event_handler]
    fn on_greeted(&mut self, _event: Payload<Greeted>, metadata: Metadata, at: Timestamp) {
        self.tags = metadata.len();
        self.at = Some(at.0);
    }
}

#[test]
fn metadata_and_message_properties_are_resolved() {
    let chain = Arc::new(ResolverChain::standard());
    let mut audit = Audit::default();

    let withdrawn = EventMessage::new(Withdrawn { amount: 30 })
        .with_identifier("evt-9")
        .with_aggregate("acc-1", 4)
        .with_metadata(Metadata::new().with("tenant", "acme"));
    dispatch(&mut audit, &withdrawn, &chain).unwrap();

    assert_eq!(audit.tenant.as_deref(), Some("acme"));
    assert_eq!(audit.actor, None);
    assert_eq!(audit.event_id.as_deref(), Some("evt-9"));
    assert_eq!(audit.aggregate.as_deref(), Some("acc-1"));
    assert_eq!(audit.sequence, Some(4));

    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let greeted = EventMessage::new(Greeted)
        .with_timestamp(at)
        .with_metadata(Metadata::new().with("a", 1).with("b", 2));
    dispatch(&mut audit, &greeted, &chain).unwrap();
    assert_eq!(audit.tags, 2);
    assert_eq!(audit.at, Some(at));
}

#[test]
fn missing_required_metadata_fails_the_dispatch() {
    let chain = Arc::new(ResolverChain::standard());
    let mut audit = Audit::default();
    let event = EventMessage::new(Withdrawn { amount: 30 }).with_aggregate("acc-1", 1);

    let err = dispatch(&mut audit, &event, &chain).unwrap_err();
    assert!(matches!(err, HandlerError::MissingMetadata { key: "tenant" }));
    assert!(audit.tenant.is_none());
}

// ---- 处理器方法体的错误 ----

#[derive(Debug, Error, PartialEq)]
#[error("overdrawn by {0}")]
struct Overdrawn(i64);

struct Account {
    balance: i64,
}

#[event_sourced(name = "Account")]
impl Account {
    #[event_handler]
    fn on_withdrawn(&mut self, event: Payload<Withdrawn>) -> Result<(), Overdrawn> {
        if event.amount > self.balance {
            return Err(Overdrawn(event.amount - self.balance));
        }
        self.balance -= event.amount;
        Ok(())
    }
}

#[test]
fn handler_errors_are_propagated_as_is() {
    let chain = Arc::new(ResolverChain::standard());
    let mut account = Account { balance: 10 };

    dispatch(&mut account, &EventMessage::new(Withdrawn { amount: 4 }), &chain).unwrap();
    assert_eq!(account.balance, 6);

    let err = dispatch(&mut account, &EventMessage::new(Withdrawn { amount: 9 }), &chain)
        .unwrap_err();
    let source = err.handler_source().expect("handler error");
    assert_eq!(source.downcast_ref::<Overdrawn>(), Some(&Overdrawn(3)));
    assert_eq!(err.to_string(), "overdrawn by 3");
    assert_eq!(account.balance, 6);
}
