//! Counter store with actions, a subscriber, and trace logging.
//!
//! Run with `cargo run --example counter`.

use snapstore::{shallow_state, Parts, Setter, Store, StoreOptions};
use std::sync::Arc;

shallow_state! {
    #[derive(Debug, Clone)]
    pub struct Counter => CounterPatch {
        pub counts: i64,
        pub history: Arc<Vec<i64>>,
    }
}

pub struct CounterActions {
    pub add: Box<dyn Fn(i64) -> snapstore::Result<bool> + Send + Sync>,
    pub reset: Box<dyn Fn() -> snapstore::Result<bool> + Send + Sync>,
}

fn main() -> snapstore::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let store = Store::create_with(
        StoreOptions::new().with_label("counter"),
        |set: Setter<Counter, CounterActions>, _get| {
            let reset_set = set.clone();
            Parts::with_actions(
                Counter {
                    counts: 0,
                    history: Arc::new(Vec::new()),
                },
                CounterActions {
                    add: Box::new(move |by: i64| {
                        set.update(|prev| {
                            let mut history = prev.history.as_ref().clone();
                            history.push(prev.counts);
                            CounterPatch::default()
                                .counts(prev.counts + by)
                                .history(Arc::new(history))
                        })
                    }),
                    reset: Box::new(move || reset_set.set(CounterPatch::default().counts(0))),
                },
            )
        },
    );

    let unsubscribe = store.subscribe(|next, prev| {
        println!(
            "v{}: counts {} -> {}",
            next.version(),
            prev.state().counts,
            next.state().counts
        );
    });

    let actions = Arc::clone(store.get_store().actions_arc());
    (actions.add)(2)?;
    (actions.add)(3)?;
    (actions.add)(0)?;
    (actions.reset)()?;
    (actions.reset)()?;

    unsubscribe.unsubscribe();
    println!("final: {:?}", store.get_state());
    Ok(())
}
