use ddd_eventsourcing::payload::{EventPayload, PayloadKind};
use ddd_eventsourcing_macros::EventPayload;

#[derive(EventPayload)]
enum AccountEvent {}

#[derive(EventPayload)]
enum Audited {}

#[derive(Debug, EventPayload)]
#[payload(extends(AccountEvent, Audited))]
struct Deposited {
    amount: i64,
}

#[derive(Debug, EventPayload)]
#[payload(extends(AccountEvent))]
#[payload(extends(Audited))]
struct Withdrawn(i64);

fn main() {
    let deposited = Deposited::kind();
    assert!(AccountEvent::kind().is_assignable_from(&deposited));
    assert!(Audited::kind().is_assignable_from(&deposited));
    assert!(!deposited.is_assignable_from(&AccountEvent::kind()));
    assert_eq!(deposited.supertypes().len(), 2);

    let withdrawn = Withdrawn(5);
    assert_eq!(withdrawn.0, 5);
    assert_eq!(withdrawn.runtime_type(), Withdrawn::kind());
    assert_eq!(Withdrawn::kind().supertypes(), vec![AccountEvent::kind(), Audited::kind()]);
    assert_eq!(Deposited { amount: 1 }.amount, 1);
}
