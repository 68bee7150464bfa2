use std::{
    convert::Infallible,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use futures::executor::block_on;
use modi_di::{
    App, AppError, Consumer, DepValues, DynError, ErrorHookContext, HookContext, Module,
    Provider, ProviderBuilder, ResolveError,
};

type Log = Arc<Mutex<Vec<String>>>;

fn with_hooks(builder: ProviderBuilder, log: &Log, label: &'static str) -> ProviderBuilder {
    let ready = log.clone();
    let close = log.clone();
    builder
        .on_ready(move |_: HookContext| {
            ready.lock().unwrap().push(format!("ready:{label}"));
            async { Ok::<_, DynError>(()) }
        })
        .on_close(move |_: HookContext| {
            close.lock().unwrap().push(format!("close:{label}"));
            async { Ok::<_, DynError>(()) }
        })
}

fn uses(name: &str, deps: &[(&str, &Provider)]) -> Consumer {
    deps.iter()
        .fold(Consumer::installer(name), |builder, (alias, provider)| {
            builder.dep(*alias, provider)
        })
        .build(|_| async { Ok::<_, Infallible>(()) })
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[test]
fn hooks_run_once_in_discovery_order() {
    let log = Log::default();
    let db = with_hooks(Provider::builder("db"), &log, "db")
        .factory(|_| async { Ok::<_, Infallible>(1_u32) })
        .unwrap();
    let cache = with_hooks(Provider::builder("cache"), &log, "cache")
        .factory(|_| async { Ok::<_, Infallible>(2_u32) })
        .unwrap();
    let repo = with_hooks(Provider::builder("repo"), &log, "repo")
        .dep("db", &db)
        .factory(|deps: DepValues| async move {
            Ok::<_, ResolveError>(*deps.get::<u32>("db")? + 10)
        })
        .unwrap();

    let root = Module::builder("root")
        .consumer(uses("users", &[("repo", &repo)]))
        .sub_module(
            Module::builder("child")
                .consumer(uses("cache", &[("cache", &cache), ("db", &db)]))
                .build(),
        )
        .build();

    let app = block_on(App::builder(root).build()).unwrap();
    assert!(entries(&log).is_empty());

    block_on(app.ready()).unwrap();
    block_on(app.ready()).unwrap();
    assert_eq!(entries(&log), vec!["ready:repo", "ready:db", "ready:cache"]);

    block_on(app.close()).unwrap();
    assert_eq!(
        entries(&log)[3..],
        ["close:repo", "close:db", "close:cache"]
    );
}

#[test]
fn close_twice_fails_and_ready_after_close_fails() {
    let app = block_on(App::builder(Module::builder("root").build()).build()).unwrap();

    block_on(app.close()).unwrap();
    assert!(matches!(block_on(app.close()), Err(AppError::AlreadyClosed)));
    assert!(matches!(block_on(app.ready()), Err(AppError::AlreadyClosed)));
}

#[test]
fn hook_receives_the_application_singleton() {
    let seen: Arc<Mutex<Vec<Arc<String>>>> = Arc::default();
    let recorder = seen.clone();
    let db = Provider::builder("db")
        .on_ready(move |ctx: HookContext| {
            let recorder = recorder.clone();
            async move {
                let value = ctx.value.downcast::<String>().map_err(|t| format!("got {t}"))?;
                recorder.lock().unwrap().push(value);
                Ok::<_, DynError>(())
            }
        })
        .factory(|_| async { Ok::<_, Infallible>(String::from("postgres")) })
        .unwrap();

    let root = Module::builder("root")
        .consumer(uses("users", &[("db", &db)]))
        .build();
    let app = block_on(App::builder(root).build()).unwrap();
    block_on(app.ready()).unwrap();

    let from_app = block_on(app.get_as::<String>(&db)).unwrap();
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(Arc::ptr_eq(&seen[0], &from_app));
}

#[test]
fn hooks_of_bindings_run_once_for_every_contract_use() {
    let log = Log::default();
    let contract = Provider::contract::<String>("MAILER");
    let smtp = with_hooks(Provider::builder("MAILER"), &log, "smtp")
        .factory(|_| async { Ok::<_, Infallible>(String::from("smtp")) })
        .unwrap();

    let root = Module::builder("root")
        .sub_module(
            Module::builder("a")
                .bind(&smtp)
                .consumer(uses("a", &[("mailer", &contract)]))
                .build(),
        )
        .sub_module(
            Module::builder("b")
                .bind(&smtp)
                .consumer(uses("b", &[("mailer", &contract)]))
                .build(),
        )
        .build();

    let app = block_on(App::builder(root).build()).unwrap();
    block_on(app.ready()).unwrap();
    block_on(app.close()).unwrap();

    assert_eq!(entries(&log), vec!["ready:smtp", "close:smtp"]);
}

#[test]
fn hooks_of_overrides_replace_the_original_ones() {
    let log = Log::default();
    let real = with_hooks(Provider::builder("db"), &log, "real")
        .factory(|_| async { Ok::<_, Infallible>(0_u8) })
        .unwrap();
    let fake = with_hooks(Provider::builder("db"), &log, "fake")
        .factory(|_| async { Ok::<_, Infallible>(1_u8) })
        .unwrap();

    let root = Module::builder("root")
        .consumer(uses("users", &[("db", &real)]))
        .build();

    let app = block_on(App::builder(root).override_with(fake).build()).unwrap();
    block_on(app.ready()).unwrap();

    assert_eq!(entries(&log), vec!["ready:fake"]);
}

#[test]
fn failing_hook_calls_on_error_then_fails() {
    let log = Log::default();
    let on_error_log = log.clone();
    let flaky = Provider::builder("flaky")
        .on_ready(|_: HookContext| async { Err::<(), DynError>("not reachable".into()) })
        .on_error(move |ctx: ErrorHookContext| {
            on_error_log
                .lock()
                .unwrap()
                .push(format!("on_error:{}", ctx.error));
            async { Ok::<_, DynError>(()) }
        })
        .factory(|_| async { Ok::<_, Infallible>(()) })
        .unwrap();

    let root = Module::builder("root")
        .consumer(uses("users", &[("flaky", &flaky)]))
        .build();
    let app = block_on(App::builder(root).build()).unwrap();

    match block_on(app.ready()) {
        Err(AppError::HookFailed {
            hook,
            provider,
            error,
        }) => {
            assert_eq!(hook, "onReady");
            assert_eq!(provider, "flaky");
            assert_eq!(error.to_string(), "not reachable");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(entries(&log), vec!["on_error:not reachable"]);
}

#[test]
fn ready_runs_again_after_a_failed_hook() {
    let log = Log::default();
    let failed_once = Arc::new(AtomicBool::new(false));
    let flaky = Provider::builder("flaky")
        .on_ready(move |_: HookContext| {
            let first = !failed_once.swap(true, Ordering::SeqCst);
            async move {
                if first {
                    Err::<(), DynError>("warming up".into())
                } else {
                    Ok(())
                }
            }
        })
        .factory(|_| async { Ok::<_, Infallible>(()) })
        .unwrap();
    let later = with_hooks(Provider::builder("later"), &log, "later")
        .factory(|_| async { Ok::<_, Infallible>(()) })
        .unwrap();

    let root = Module::builder("root")
        .consumer(uses("users", &[("a", &flaky), ("b", &later)]))
        .build();
    let app = block_on(App::builder(root).build()).unwrap();

    assert!(matches!(
        block_on(app.ready()),
        Err(AppError::HookFailed { provider, .. }) if provider == "flaky"
    ));
    assert!(entries(&log).is_empty());

    block_on(app.ready()).unwrap();
    block_on(app.ready()).unwrap();
    assert_eq!(entries(&log), vec!["ready:later"]);
}

#[test]
fn transient_providers_cannot_declare_hooks() {
    let log = Log::default();
    let error = with_hooks(Provider::builder("ticket").transient(), &log, "ticket")
        .factory(|_| async { Ok::<_, Infallible>(0_usize) })
        .unwrap_err();

    let message = error.to_string();
    assert!(message.contains("\"ticket\" is declared as transient"), "{message}");
    assert!(message.contains("onReady"), "{message}");
}
