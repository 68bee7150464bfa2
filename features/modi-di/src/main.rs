use std::{convert::Infallible, sync::Arc};

use modi_di::{
    Adapter, AdapterContext, App, AppError, Consumer, ConsumerContext, DepValues, DynError,
    Instance, Module, Provider, ResolveError,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = futures::executor::block_on(run()) {
        eprintln!("Application ended with error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let mailer = Provider::contract::<Mailer>("MAILER");
    let smtp = Provider::builder("MAILER")
        .on_ready(|ctx| async move {
            let mailer = ctx
                .value
                .downcast::<Mailer>()
                .map_err(|t| format!("not a mailer: {t}"))?;
            println!("{} ready", mailer.transport);
            Ok::<_, DynError>(())
        })
        .factory(|_| async {
            Ok::<_, Infallible>(Mailer {
                transport: "smtp".to_string(),
            })
        })?;

    let notifier = Provider::builder("notifier")
        .dep("mailer", &mailer)
        .factory(|deps: DepValues| async move {
            let mailer = deps.get::<Mailer>("mailer")?;
            Ok::<_, ResolveError>(Notifier { mailer })
        })?;

    let scope_name = Adapter::new("scope-name", |ctx: AdapterContext| {
        let name = ctx.scope.name().to_string();
        async move { Ok::<_, Infallible>(name) }
    });

    let notifications = Module::builder("notifications")
        .bind(&smtp)
        .consumer(
            Consumer::installer("expose-notifier")
                .dep("notifier", &notifier)
                .build(|ctx: ConsumerContext| async move {
                    let notifier = ctx.deps.instance("notifier")?.clone();
                    ctx.scope.decorate("notifier", notifier)?;
                    Ok::<_, AppError>(())
                }),
        )
        .consumer(
            Consumer::controller("welcome")
                .adapter("scope", &scope_name)
                .build(|ctx: ConsumerContext| async move {
                    let notifier = ctx.scope.decoration::<Notifier>("notifier")?;
                    let scope = ctx.adaps.get::<String>("scope")?;
                    println!("{}", notifier.send(&format!("welcome from {scope}")));
                    Ok::<_, ResolveError>(())
                }),
        )
        .build();

    let root = Module::builder("root")
        .consumer(Consumer::hook("banner").build(|ctx: ConsumerContext| async move {
            ctx.scope.decorate("started", Instance::new(true))?;
            Ok::<_, AppError>(())
        }))
        .sub_module(notifications)
        .build();

    let app = App::builder(root).build().await?;
    app.ready().await?;
    app.close().await?;
    Ok(())
}

struct Mailer {
    transport: String,
}

struct Notifier {
    mailer: Arc<Mailer>,
}

impl Notifier {
    fn send(&self, message: &str) -> String {
        format!("[{}] {message}", self.mailer.transport)
    }
}
