use ddd_eventsourcing::entity::InvokerSlot;
use ddd_eventsourcing::handler::{Payload, SequenceNumber};
use ddd_eventsourcing::{EventMessage, ResolverChain, dispatch, inspect};
use ddd_eventsourcing_macros::{EventPayload, event_sourced};
use std::sync::Arc;

#[derive(EventPayload)]
enum OrderEvent {}

#[derive(Debug, EventPayload)]
#[payload(extends(OrderEvent))]
struct Shipped;

#[derive(Default)]
struct Line {
    shipped: bool,
}

#[event_sourced]
impl Line {
    #[event_handler]
    fn on_shipped(&mut self, _event: Payload<Shipped>) {
        self.shipped = true;
    }
}

#[derive(Default)]
struct Order {
    seen: Vec<u64>,
    lines: Vec<Line>,
    gift: Option<Line>,
    invoker: InvokerSlot<Order>,
}

#[event_sourced(name = "Order", children = lines, children = gift, cache = invoker)]
impl Order {
    #[event_handler(payload = OrderEvent)]
    fn on_order_event(&mut self, sequence: SequenceNumber) {
        self.seen.push(sequence.0);
    }

    fn shipped_lines(&self) -> usize {
        self.lines.iter().filter(|line| line.shipped).count()
    }
}

fn main() {
    let analysis = inspect::<Order>().unwrap();
    assert_eq!(analysis.entity_name(), "Order");
    assert_eq!(analysis.handlers().len(), 1);
    assert_eq!(analysis.children().len(), 2);

    let mut order = Order {
        lines: vec![Line::default(), Line::default()],
        ..Order::default()
    };
    let chain = Arc::new(ResolverChain::standard());
    let event = EventMessage::new(Shipped).with_aggregate("o-1", 3);
    let report = dispatch(&mut order, &event, &chain).unwrap();

    assert_eq!(order.seen, vec![3]);
    assert_eq!(order.shipped_lines(), 2);
    assert_eq!(report.visited(), 3);
    assert!(order.invoker.get().is_some());
}
