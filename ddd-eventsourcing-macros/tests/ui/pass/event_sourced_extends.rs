use ddd_eventsourcing::handler::Payload;
use ddd_eventsourcing::{EventMessage, ResolverChain, dispatch, inspect};
use ddd_eventsourcing_macros::{EventPayload, event_sourced};
use std::sync::Arc;

#[derive(Debug, EventPayload)]
struct Renamed {
    name: String,
}

#[derive(Debug, EventPayload)]
struct Archived;

#[derive(Default)]
struct Titled {
    name: String,
    archived: bool,
}

#[event_sourced]
impl Titled {
    #[event_handler]
    fn on_renamed(&mut self, event: Payload<Renamed>) {
        self.name = event.name.clone();
    }

    #[event_handler]
    fn on_archived(&mut self, _event: Payload<Archived>) {
        self.archived = true;
    }
}

#[derive(Default)]
struct Customer {
    base: Titled,
    renames: usize,
}

#[event_sourced(extends = base)]
impl Customer {
    // 覆盖祖先的同名方法
    #[event_handler]
    fn on_renamed(&mut self, event: Payload<Renamed>) -> anyhow::Result<()> {
        self.renames += 1;
        self.base.name = event.name.to_uppercase();
        Ok(())
    }
}

fn main() {
    let analysis = inspect::<Customer>().unwrap();
    let overriding = analysis.handler("on_renamed").unwrap();
    assert_eq!(overriding.depth(), 0);
    assert_eq!(analysis.handler("on_archived").unwrap().depth(), 1);

    let chain = Arc::new(ResolverChain::standard());
    let mut customer = Customer::default();
    dispatch(&mut customer, &EventMessage::new(Renamed { name: "ada".into() }), &chain).unwrap();
    dispatch(&mut customer, &EventMessage::new(Archived), &chain).unwrap();

    assert_eq!(customer.base.name, "ADA");
    assert_eq!(customer.renames, 1);
    assert!(customer.base.archived);
}
