use anyhow::Result as AnyResult;
use ddd_eventsourcing::entity::InvokerSlot;
use ddd_eventsourcing::handler::{Dep, DynPayload, MetaValue, MetadataKey, Payload, SequenceNumber};
use ddd_eventsourcing::resolver::{ChainScope, DependencyResolver};
use ddd_eventsourcing::{
    DispatcherConfig, Dispatcher, EventMessage, Metadata, ResolverChain, TraversalPolicy,
};
use ddd_eventsourcing_macros::{EventPayload, event_sourced};
use std::sync::Arc;

// ---- 载荷 ----

#[derive(EventPayload)]
enum OrderEvent {}

#[derive(Debug, EventPayload)]
#[payload(extends(OrderEvent))]
struct OrderPlaced {
    lines: Vec<(String, u32)>,
}

#[derive(Debug, EventPayload)]
#[payload(extends(OrderEvent))]
struct LineShipped {
    sku: String,
}

#[derive(Debug, EventPayload)]
#[payload(extends(OrderEvent))]
struct AddressChanged {
    city: String,
}

#[derive(Debug, EventPayload)]
#[payload(extends(OrderEvent))]
struct OrderCancelled;

struct Operator;

impl MetadataKey for Operator {
    const KEY: &'static str = "operator";
    type Value = String;
}

/// 单价表，作为外部依赖注入
struct PriceList(Vec<(&'static str, i64)>);

impl PriceList {
    fn price_of(&self, sku: &str) -> i64 {
        self.0
            .iter()
            .find(|(candidate, _)| *candidate == sku)
            .map(|(_, price)| *price)
            .unwrap_or_default()
    }
}

// ---- 实体树 ----

#[derive(Debug)]
struct OrderLine {
    sku: String,
    quantity: u32,
    shipped: bool,
}

#[event_sourced(name = "OrderLine")]
impl OrderLine {
    #[event_handler]
    fn on_line_shipped(&mut self, event: Payload<LineShipped>) {
        if event.sku == self.sku {
            self.shipped = true;
        }
    }
}

#[derive(Debug, Default)]
struct Address {
    city: String,
}

#[event_sourced(name = "Address")]
impl Address {
    #[event_handler]
    fn on_address_changed(&mut self, event: Payload<AddressChanged>, operator: MetaValue<Operator>) {
        tracing::info!(from = %self.city, to = %event.city, operator = %*operator, "address changed");
        self.city = event.city.clone();
    }
}

#[derive(Debug, Default)]
struct Order {
    total: i64,
    cancelled: bool,
    last_sequence: u64,
    lines: Vec<OrderLine>,
    address: Address,
    invoker: InvokerSlot<Order>,
}

#[event_sourced(name = "Order", children = lines, child = address, cache = invoker)]
impl Order {
    #[event_handler]
    fn on_placed(&mut self, event: Payload<OrderPlaced>, prices: Dep<PriceList>) {
        self.lines = event
            .lines
            .iter()
            .map(|(sku, quantity)| OrderLine {
                sku: sku.clone(),
                quantity: *quantity,
                shipped: false,
            })
            .collect();
        self.total = self
            .lines
            .iter()
            .map(|line| prices.price_of(&line.sku) * i64::from(line.quantity))
            .sum();
    }

    #[event_handler]
    fn on_cancelled(&mut self, _event: Payload<OrderCancelled>) -> AnyResult<()> {
        if self.lines.iter().any(|line| line.shipped) {
            anyhow::bail!("order already partially shipped");
        }
        self.cancelled = true;
        Ok(())
    }

    // 其余订单事件只记录序号
    #[event_handler(payload = OrderEvent)]
    fn on_order_event(&mut self, event: DynPayload, sequence: SequenceNumber) {
        tracing::debug!(payload = %event.payload_type(), sequence = sequence.0, "order event");
        self.last_sequence = sequence.0;
    }
}

fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let prices = Arc::new(PriceList(vec![("apple", 3), ("pear", 5)]));
    let scope = ChainScope::with_chain(
        ResolverChain::builder()
            .standard()
            .fallback(DependencyResolver::builder().register(prices).build())
            .build(),
    );
    let dispatcher = Dispatcher::builder()
        .scope(&scope)
        .config(
            DispatcherConfig::builder()
                .policy(TraversalPolicy::ContinueOnError)
                .build(),
        )
        .build();

    let events = vec![
        EventMessage::new(OrderPlaced {
            lines: vec![("apple".into(), 2), ("pear".into(), 1)],
        })
        .with_aggregate("order-1", 1),
        EventMessage::new(AddressChanged {
            city: "Lisbon".into(),
        })
        .with_aggregate("order-1", 2)
        .with_metadata(Metadata::new().with("operator", "ops-7")),
        EventMessage::new(LineShipped {
            sku: "pear".into(),
        })
        .with_aggregate("order-1", 3),
    ];

    let mut order = Order::default();
    for report in dispatcher.apply_all(&mut order, &events)? {
        for handled in report.handled() {
            tracing::info!(path = %handled.path, method = handled.method, "handled");
        }
    }

    tracing::info!(
        total = order.total,
        city = %order.address.city,
        last_sequence = order.last_sequence,
        shipped = ?order.lines.iter().filter(|l| l.shipped).map(|l| (&l.sku, l.quantity)).collect::<Vec<_>>(),
        "order rebuilt"
    );

    // 已部分发货，取消失败
    let cancel = EventMessage::new(OrderCancelled).with_aggregate("order-1", 4);
    if let Err(error) = dispatcher.apply(&mut order, &cancel) {
        tracing::warn!(%error, cancelled = order.cancelled, "cancel rejected");
    }

    Ok(())
}
