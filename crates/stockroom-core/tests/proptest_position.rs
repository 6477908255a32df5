use proptest::prelude::*;
use stockroom_core::db::history::{count_for_item, list_by_item};
use stockroom_core::event::Destination;
use stockroom_core::{ItemPatch, NewItem, Store, StoreError};

/// One lifecycle step against a fixed pool of three locations and two users.
#[derive(Debug, Clone)]
enum Step {
    Track(usize),
    TrackToUser(usize),
    Update(String),
    Delete,
    Restore,
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0..3usize).prop_map(Step::Track),
        (0..2usize).prop_map(Step::TrackToUser),
        "[a-z]{1,6}".prop_map(Step::Update),
        Just(Step::Delete),
        Just(Step::Restore),
    ]
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(64))]

    #[test]
    fn resolve_matches_last_accepted_positional_step(steps in prop::collection::vec(arb_step(), 0..24)) {
        let mut store = Store::open_in_memory().expect("open store");
        let directory = store.directory();
        let actor = directory.add_user("Actor", "actor").expect("actor");
        let locations: Vec<_> = ["A", "B", "C"]
            .iter()
            .map(|name| directory.add_location(name, None).expect("location").id)
            .collect();
        let users: Vec<_> = ["u1", "u2"]
            .iter()
            .map(|name| directory.add_user(name, name).expect("user").id)
            .collect();

        let item = store
            .lifecycle()
            .create_item(
                actor.id,
                &NewItem {
                    identifier: None,
                    reference: "REF".into(),
                    group_key: "G".into(),
                    description: None,
                    location_id: locations[0],
                },
            )
            .expect("create");

        let mut expected = Destination::Location(locations[0]);
        let mut deleted = false;
        let mut log_len = 1_u64;

        for step in steps {
            let mut lifecycle = store.lifecycle();
            let outcome = match &step {
                Step::Track(i) => lifecycle.track_item(actor.id, item.id, locations[*i]).map(|_| ()),
                Step::TrackToUser(i) => lifecycle.track_item_to_user(actor.id, item.id, users[*i]).map(|_| ()),
                Step::Update(reference) => lifecycle
                    .update_item(
                        actor.id,
                        item.id,
                        &ItemPatch { reference: Some(reference.clone()), ..ItemPatch::default() },
                    )
                    .map(|_| ()),
                Step::Delete => lifecycle.delete_item(actor.id, item.id).map(|_| ()),
                Step::Restore => lifecycle.restore_item(actor.id, item.id).map(|_| ()),
            };

            match (&step, outcome) {
                (Step::Track(i), Ok(())) => expected = Destination::Location(locations[*i]),
                (Step::TrackToUser(i), Ok(())) => expected = Destination::User(users[*i]),
                (Step::Delete, Ok(())) => deleted = true,
                (Step::Restore, Ok(())) => deleted = false,
                (Step::Update(_), Ok(())) => {}
                (Step::Track(_) | Step::TrackToUser(_) | Step::Update(_) | Step::Delete, Err(err)) => {
                    prop_assert!(deleted, "step {:?} failed on active item: {}", step, err);
                    let is_item_deleted = matches!(err, StoreError::ItemDeleted { .. });
                    prop_assert!(is_item_deleted);
                }
                (Step::Restore, Err(err)) => {
                    prop_assert!(!deleted);
                    let is_not_deleted = matches!(err, StoreError::ItemNotDeleted { .. });
                    prop_assert!(is_not_deleted);
                }
            }

            let len = count_for_item(store.conn(), item.id).expect("count");
            prop_assert!(len >= log_len, "log shrank from {} to {}", log_len, len);
            log_len = len;
        }

        let position = store.resolver().resolve(item.id).expect("resolve");
        prop_assert_eq!(position.destination(), expected);

        let rows = list_by_item(store.conn(), item.id).expect("list");
        prop_assert_eq!(rows.iter().filter(|r| r.kind == "created").count(), 1);
        prop_assert_eq!(rows.last().map(|r| r.kind.as_str()), Some("created"));
    }
}
