use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
};

use futures::executor::block_on;
use modi_di::{App, AppError, Consumer, ConsumerContext, Instance, MemoryHost, Module, Scope};

type Log = Arc<Mutex<Vec<(String, bool)>>>;

fn decorates(key: &'static str) -> Consumer {
    Consumer::installer(format!("decorate-{key}")).build(move |ctx: ConsumerContext| async move {
        ctx.scope.decorate(key, Instance::new(key))?;
        Ok::<_, AppError>(())
    })
}

/// Records whether `key` is visible while the consumer registers
fn observes(log: &Log, label: &'static str, key: &'static str) -> Consumer {
    let log = log.clone();
    Consumer::controller(label).build(move |ctx: ConsumerContext| {
        log.lock()
            .unwrap()
            .push((label.to_string(), ctx.scope.has_decoration(key)));
        async { Ok::<_, Infallible>(()) }
    })
}

fn seen(log: &Log) -> Vec<(String, bool)> {
    log.lock().unwrap().clone()
}

#[test]
fn encapsulated_siblings_are_isolated() {
    let log = Log::default();
    let root = Module::builder("root")
        .sub_module(Module::builder("a").consumer(decorates("service")).build())
        .sub_module(
            Module::builder("b")
                .consumer(observes(&log, "b", "service"))
                .build(),
        )
        .build();

    block_on(App::builder(root).build()).unwrap();

    assert_eq!(seen(&log), vec![("b".to_string(), false)]);
}

#[test]
fn transparent_module_leaks_to_later_siblings_only() {
    let log = Log::default();
    let host = MemoryHost::root();
    let root = Module::builder("root")
        .sub_module(
            Module::builder("early")
                .consumer(observes(&log, "early", "shared"))
                .build(),
        )
        .sub_module(
            Module::builder("plugin")
                .encapsulate(false)
                .consumer(decorates("shared"))
                .build(),
        )
        .sub_module(
            Module::builder("late")
                .consumer(observes(&log, "late", "shared"))
                .build(),
        )
        .build();

    block_on(App::builder(root).host(host.clone()).build()).unwrap();

    assert_eq!(
        seen(&log),
        vec![("early".to_string(), false), ("late".to_string(), true)]
    );
    // Stops at the nearest encapsulated ancestor
    assert!(!host.has_decoration("shared"));
}

#[test]
fn kept_scope_of_an_earlier_sibling_stays_blind_to_later_additions() {
    let kept: Arc<Mutex<Option<Scope>>> = Arc::default();
    let keeper = kept.clone();
    let root = Module::builder("root")
        .sub_module(
            Module::builder("early")
                .consumer(Consumer::controller("keep-scope").build(
                    move |ctx: ConsumerContext| {
                        *keeper.lock().unwrap() = Some(ctx.scope.clone());
                        async { Ok::<_, Infallible>(()) }
                    },
                ))
                .build(),
        )
        .sub_module(
            Module::builder("plugin")
                .encapsulate(false)
                .consumer(decorates("shared"))
                .build(),
        )
        .build();

    block_on(App::builder(root).build()).unwrap();

    let early = kept.lock().unwrap().clone().unwrap();
    assert_eq!(early.name(), "early");
    assert!(!early.has_decoration("shared"));
}

#[test]
fn encapsulated_module_inside_transparent_one_stays_isolated() {
    let log = Log::default();
    let root = Module::builder("root")
        .sub_module(
            Module::builder("outer")
                .encapsulate(false)
                .consumer(decorates("outer"))
                .sub_module(
                    Module::builder("inner")
                        .consumer(decorates("inner"))
                        .consumer(observes(&log, "inner sees outer", "outer"))
                        .build(),
                )
                .build(),
        )
        .sub_module(
            Module::builder("sibling")
                .consumer(observes(&log, "sibling sees outer", "outer"))
                .consumer(observes(&log, "sibling sees inner", "inner"))
                .build(),
        )
        .build();

    block_on(App::builder(root).build()).unwrap();

    assert_eq!(
        seen(&log),
        vec![
            ("inner sees outer".to_string(), true),
            ("sibling sees outer".to_string(), true),
            ("sibling sees inner".to_string(), false),
        ]
    );
}

#[test]
fn children_see_decorations_of_ancestors() {
    let log = Log::default();
    let root = Module::builder("root")
        .consumer(decorates("config"))
        .sub_module(
            Module::builder("child")
                .sub_module(
                    Module::builder("grandchild")
                        .consumer(observes(&log, "grandchild", "config"))
                        .build(),
                )
                .build(),
        )
        .build();

    block_on(App::builder(root).build()).unwrap();

    assert_eq!(seen(&log), vec![("grandchild".to_string(), true)]);
}

#[test]
fn reading_an_undeclared_decoration_fails() {
    let root = Module::builder("root")
        .consumer(
            Consumer::controller("reader").build(|ctx: ConsumerContext| async move {
                ctx.scope.decoration::<String>("missing")?;
                Ok::<_, AppError>(())
            }),
        )
        .build();

    let error = block_on(App::builder(root).build()).unwrap_err();
    let message = error.to_string();
    assert!(message.contains("reader"), "{message}");
    assert!(message.contains("missing"), "{message}");
}
